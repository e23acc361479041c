//! Test doubles: a scripted splat source and a recording renderer

use futures_util::future::BoxFuture;
use glam::Vec3;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::asset::SplatCloud;
use crate::camera::Camera;
use crate::error::{RenderError, SourceError};
use crate::format::SplatPoint;
use crate::input::SurfaceSize;
use crate::scene::SceneGraph;
use crate::scheduler::{Overlay, Renderer};
use crate::source::SplatSource;

/// `n` points along +X, from 0 to n - 1
pub(crate) fn points(n: usize) -> Vec<SplatPoint> {
    (0..n)
        .map(|i| SplatPoint::new(Vec3::new(i as f32, 0.0, 0.0), [200, 200, 200, 255]))
        .collect()
}

#[derive(Debug, Clone)]
pub(crate) enum Packed {
    Points(Vec<SplatPoint>),
    Delayed(Duration, Vec<SplatPoint>),
    Fail,
    Empty,
    Stall,
}

#[derive(Debug, Clone)]
pub(crate) enum Direct {
    Points(Vec<SplatPoint>),
    Fail,
}

#[derive(Default)]
pub(crate) struct ScriptedSource {
    scripts: Mutex<HashMap<String, (Packed, Direct)>>,
    calls: Mutex<HashMap<String, (usize, usize)>>,
}

impl ScriptedSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn script(&self, path: &str, packed: Packed, direct: Direct) {
        self.scripts
            .lock()
            .unwrap()
            .insert(path.to_string(), (packed, direct));
    }

    pub(crate) fn packed_calls(&self, path: &str) -> usize {
        self.calls.lock().unwrap().get(path).map_or(0, |c| c.0)
    }

    pub(crate) fn direct_calls(&self, path: &str) -> usize {
        self.calls.lock().unwrap().get(path).map_or(0, |c| c.1)
    }

    fn lookup(&self, path: &str) -> Option<(Packed, Direct)> {
        self.scripts.lock().unwrap().get(path).cloned()
    }
}

fn scripted_failure(path: &str) -> SourceError {
    SourceError::Decode(format!("scripted failure for {path}"))
}

impl SplatSource for ScriptedSource {
    fn stream_into(
        &self,
        path: &str,
        cloud: Arc<SplatCloud>,
    ) -> BoxFuture<'static, Result<(), SourceError>> {
        self.calls
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .0 += 1;
        let script = self.lookup(path).map(|s| s.0);
        let path = path.to_string();
        Box::pin(async move {
            match script {
                Some(Packed::Points(points)) => {
                    cloud.extend(points);
                    Ok(())
                }
                Some(Packed::Delayed(delay, points)) => {
                    tokio::time::sleep(delay).await;
                    cloud.extend(points);
                    Ok(())
                }
                Some(Packed::Empty) => Ok(()),
                Some(Packed::Stall) => std::future::pending().await,
                Some(Packed::Fail) | None => Err(scripted_failure(&path)),
            }
        })
    }

    fn load_direct(&self, path: &str) -> BoxFuture<'static, Result<SplatCloud, SourceError>> {
        self.calls
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .1 += 1;
        let script = self.lookup(path).map(|s| s.1);
        let path = path.to_string();
        Box::pin(async move {
            match script {
                Some(Direct::Points(points)) => Ok(SplatCloud::from_points(points)),
                Some(Direct::Fail) | None => Err(scripted_failure(&path)),
            }
        })
    }
}

#[derive(Debug, Default)]
pub(crate) struct RenderLog {
    pub frames: u64,
    /// Number of upcoming frames that should fail
    pub fail_next: u32,
    pub disposed: u32,
    pub overlays: Vec<Overlay>,
    pub resizes: Vec<SurfaceSize>,
    /// Asset path shown in each rendered frame
    pub shown: Vec<Option<String>>,
    /// Asset node count seen in each rendered frame
    pub asset_counts: Vec<usize>,
    pub last_eye: Option<Vec3>,
}

pub(crate) struct RecordingRenderer {
    surface: Option<SurfaceSize>,
    log: Arc<Mutex<RenderLog>>,
}

impl RecordingRenderer {
    pub(crate) fn new(surface: Option<SurfaceSize>) -> Self {
        Self {
            surface,
            log: Arc::new(Mutex::new(RenderLog::default())),
        }
    }

    pub(crate) fn log(&self) -> Arc<Mutex<RenderLog>> {
        self.log.clone()
    }
}

impl Renderer for RecordingRenderer {
    fn surface(&self) -> Option<SurfaceSize> {
        self.surface
    }

    fn resize(&mut self, size: SurfaceSize) {
        self.surface = Some(size);
        self.log.lock().unwrap().resizes.push(size);
    }

    fn render(&mut self, scene: &SceneGraph, camera: &Camera) -> Result<(), RenderError> {
        let mut log = self.log.lock().unwrap();
        if log.fail_next > 0 {
            log.fail_next -= 1;
            return Err(RenderError::Backend("scripted failure".to_string()));
        }
        log.frames += 1;
        log.asset_counts.push(scene.asset_count());
        log.shown.push(
            scene
                .asset_node()
                .and_then(|n| n.asset())
                .map(|h| h.path().to_string()),
        );
        log.last_eye = Some(camera.position());
        Ok(())
    }

    fn set_overlay(&mut self, overlay: &Overlay) {
        self.log.lock().unwrap().overlays.push(overlay.clone());
    }

    fn dispose(&mut self) {
        self.log.lock().unwrap().disposed += 1;
    }
}
