//! Splatview - native splat viewer entry point

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use splatview_core::catalog::load_catalog;
use splatview_core::{load_config, SceneRequest};
use splatview_viewer::{run, InitialLoad, ViewerOptions};

#[derive(Parser, Debug)]
#[command(name = "splatview")]
#[command(about = "Interactive viewer for 3D splat assets")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "splatview.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Asset to show on startup, relative to the asset root
    #[arg(short, long, conflicts_with = "scene")]
    asset: Option<String>,

    /// Catalog scene to generate on startup
    #[arg(short, long, requires = "objects")]
    scene: Option<String>,

    /// Comma separated objects for --scene, e.g. "motor,car_benz"
    #[arg(short, long)]
    objects: Option<String>,
}

impl Args {
    fn initial_load(&self) -> Option<InitialLoad> {
        if let Some(asset) = &self.asset {
            return Some(InitialLoad::Asset(asset.clone()));
        }
        let scene = self.scene.as_ref()?;
        let objects = self.objects.as_deref().unwrap_or_default();
        Some(InitialLoad::Scene(SceneRequest::parse(scene.clone(), objects)))
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Splatview v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args.config)?;
    let catalog = load_catalog(&config.catalog.path)?;

    info!(
        asset_root = %config.loader.asset_root.display(),
        scenes = catalog.scenes.len(),
        "Configuration loaded"
    );

    let initial = args.initial_load();
    run(ViewerOptions {
        config,
        catalog,
        initial,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_flag_loads_asset() {
        let args = Args::parse_from(["splatview", "--asset", "spz/motor.splat"]);
        assert!(matches!(
            args.initial_load(),
            Some(InitialLoad::Asset(path)) if path == "spz/motor.splat"
        ));
    }

    #[test]
    fn test_scene_flag_builds_request() {
        let args = Args::parse_from([
            "splatview",
            "--scene",
            "scene_01",
            "--objects",
            "motor, car_benz",
        ]);
        let Some(InitialLoad::Scene(request)) = args.initial_load() else {
            panic!("expected a scene request");
        };
        assert_eq!(request.scene, "scene_01");
        assert_eq!(request.object_key(), "car_benz,motor");
    }

    #[test]
    fn test_scene_requires_objects() {
        assert!(Args::try_parse_from(["splatview", "--scene", "scene_01"]).is_err());
        assert!(Args::parse_from(["splatview"]).initial_load().is_none());
    }
}
