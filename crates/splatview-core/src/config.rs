//! Configuration loading
//!
//! All sections are optional in the TOML file; anything missing falls back
//! to the defaults below.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::f32::consts::FRAC_PI_2;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub loader: LoaderConfig,
    #[serde(default)]
    pub framing: FramingConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Vertical field of view in degrees
    #[serde(default = "default_fov")]
    pub fov_degrees: f32,
    #[serde(default = "default_near")]
    pub near: f32,
    #[serde(default = "default_far")]
    pub far: f32,
    #[serde(default = "default_radius")]
    pub initial_radius: f32,
    /// Azimuth around +Z, radians
    #[serde(default = "default_theta")]
    pub initial_theta: f32,
    /// Polar angle from +Z, radians
    #[serde(default = "default_phi")]
    pub initial_phi: f32,
    /// Radians per pixel of drag while orbiting
    #[serde(default = "default_drag_speed")]
    pub orbit_speed: f32,
    /// World units per pixel of drag while panning
    #[serde(default = "default_drag_speed")]
    pub pan_speed: f32,
    /// Fractional radius change per wheel notch
    #[serde(default = "default_zoom_step")]
    pub zoom_step: f32,
    /// Keeps the polar angle inside [margin, PI - margin]
    #[serde(default = "default_pole_margin")]
    pub pole_margin: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: default_fov(),
            near: default_near(),
            far: default_far(),
            initial_radius: default_radius(),
            initial_theta: default_theta(),
            initial_phi: default_phi(),
            orbit_speed: default_drag_speed(),
            pan_speed: default_drag_speed(),
            zoom_step: default_zoom_step(),
            pole_margin: default_pole_margin(),
        }
    }
}

fn default_fov() -> f32 {
    60.0
}

fn default_near() -> f32 {
    0.1
}

fn default_far() -> f32 {
    1000.0
}

fn default_radius() -> f32 {
    3.0
}

fn default_theta() -> f32 {
    -FRAC_PI_2
}

fn default_phi() -> f32 {
    FRAC_PI_2
}

fn default_drag_speed() -> f32 {
    0.01
}

fn default_zoom_step() -> f32 {
    0.1
}

fn default_pole_margin() -> f32 {
    0.1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Element cap for the streamed strategy
    #[serde(default = "default_max_packed")]
    pub max_packed_elements: usize,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_packed_timeout")]
    pub packed_timeout_secs: u64,
    /// Base directory for relative asset paths
    #[serde(default = "default_asset_root")]
    pub asset_root: PathBuf,
}

impl LoaderConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn packed_timeout(&self) -> Duration {
        Duration::from_secs(self.packed_timeout_secs)
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_packed_elements: default_max_packed(),
            poll_interval_ms: default_poll_interval(),
            packed_timeout_secs: default_packed_timeout(),
            asset_root: default_asset_root(),
        }
    }
}

fn default_max_packed() -> usize {
    100_000
}

fn default_poll_interval() -> u64 {
    100
}

fn default_packed_timeout() -> u64 {
    30
}

fn default_asset_root() -> PathBuf {
    PathBuf::from(".")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FramingConfig {
    /// Delay between inserting an asset and measuring its bounds
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,
    /// Camera distance as a multiple of the largest bounding box extent
    #[serde(default = "default_distance_factor")]
    pub distance_factor: f32,
}

impl FramingConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl Default for FramingConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay(),
            distance_factor: default_distance_factor(),
        }
    }
}

fn default_settle_delay() -> u64 {
    100
}

fn default_distance_factor() -> f32 {
    1.5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Target frames per second of the core frame loop
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
    /// Clear color, linear RGB in [0, 1]
    #[serde(default)]
    pub background: [f32; 3],
    /// Length of each axis of the axes helper
    #[serde(default = "default_axes_size")]
    pub axes_size: f32,
}

impl RenderConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.frame_rate.max(1)))
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            frame_rate: default_frame_rate(),
            background: [0.0, 0.0, 0.0],
            axes_size: default_axes_size(),
        }
    }
}

fn default_frame_rate() -> u32 {
    60
}

fn default_axes_size() -> f32 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Path to the scene catalog file
    #[serde(default = "default_catalog_path")]
    pub path: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: default_catalog_path(),
        }
    }
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("catalog.toml")
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}

/// Save default configuration to file
pub fn save_default_config(path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(&Config::default())?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_viewer_constants() {
        let config = Config::default();
        assert_eq!(config.loader.max_packed_elements, 100_000);
        assert_eq!(config.loader.poll_interval(), Duration::from_millis(100));
        assert_eq!(config.loader.packed_timeout(), Duration::from_secs(30));
        assert_eq!(config.framing.settle_delay(), Duration::from_millis(100));
        assert_eq!(config.framing.distance_factor, 1.5);
        assert_eq!(config.camera.orbit_speed, 0.01);
        assert_eq!(config.camera.zoom_step, 0.1);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [loader]
            packed_timeout_secs = 5

            [camera]
            fov_degrees = 45.0
            "#,
        )
        .unwrap();

        assert_eq!(config.loader.packed_timeout_secs, 5);
        assert_eq!(config.loader.max_packed_elements, 100_000);
        assert_eq!(config.camera.fov_degrees, 45.0);
        assert_eq!(config.camera.near, 0.1);
        assert_eq!(config.render.frame_rate, 60);
    }

    #[test]
    fn test_frame_interval_follows_frame_rate() {
        let mut render = RenderConfig::default();
        assert_eq!(render.frame_interval(), Duration::from_secs_f64(1.0 / 60.0));

        render.frame_rate = 10;
        assert_eq!(render.frame_interval(), Duration::from_millis(100));

        render.frame_rate = 0;
        assert_eq!(render.frame_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = load_config(&temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.catalog.path, PathBuf::from("catalog.toml"));
    }

    #[test]
    fn test_save_and_reload_default() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("conf").join("splatview.toml");
        save_default_config(&path).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.render.axes_size, 1.0);
        assert_eq!(config.framing.settle_delay_ms, 100);
    }
}
