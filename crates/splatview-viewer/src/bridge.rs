//! Core renderer backed by the Bevy world
//!
//! The core viewer renders into a [`FrameMailbox`]: each frame it leaves the
//! camera, the asset node and the overlay there, and the ECS side applies the
//! latest snapshot to entities once per Bevy frame.

use bevy::math::{Quat, Vec3};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use splatview_core::{
    Camera, Overlay, RenderError, Renderer, SceneGraph, SplatCloud, SurfaceSize,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSnapshot {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    pub aspect: f32,
}

impl From<&Camera> for CameraSnapshot {
    fn from(camera: &Camera) -> Self {
        Self {
            eye: camera.position(),
            target: camera.target(),
            up: camera.up(),
            fov_y: camera.fov_y,
            near: camera.near,
            far: camera.far,
            aspect: camera.aspect,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AssetSnapshot {
    pub path: String,
    pub cloud: Arc<SplatCloud>,
    pub translation: Vec3,
    pub rotation: Quat,
}

/// Latest state handed over by the core
#[derive(Debug, Default)]
pub struct FrameSnapshot {
    /// Number of frames rendered so far
    pub frame: u64,
    pub camera: Option<CameraSnapshot>,
    pub asset: Option<AssetSnapshot>,
    pub overlay: Overlay,
    pub background: [f32; 3],
    pub surface: Option<SurfaceSize>,
    pub disposed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct FrameMailbox(Arc<Mutex<FrameSnapshot>>);

impl FrameMailbox {
    pub fn lock(&self) -> MutexGuard<'_, FrameSnapshot> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct BevyRenderer {
    surface: Option<SurfaceSize>,
    mailbox: FrameMailbox,
}

impl BevyRenderer {
    pub fn new(surface: Option<SurfaceSize>, mailbox: FrameMailbox) -> Self {
        mailbox.lock().surface = surface;
        Self { surface, mailbox }
    }
}

impl Renderer for BevyRenderer {
    fn surface(&self) -> Option<SurfaceSize> {
        self.surface
    }

    fn resize(&mut self, size: SurfaceSize) {
        self.surface = Some(size);
        self.mailbox.lock().surface = Some(size);
    }

    fn render(&mut self, scene: &SceneGraph, camera: &Camera) -> Result<(), RenderError> {
        let mut snapshot = self.mailbox.lock();
        if snapshot.disposed {
            return Err(RenderError::Disposed);
        }
        snapshot.frame += 1;
        snapshot.camera = Some(CameraSnapshot::from(camera));
        snapshot.background = scene.background();
        snapshot.asset = scene.asset_node().and_then(|node| {
            node.asset().map(|handle| AssetSnapshot {
                path: handle.path().to_string(),
                cloud: handle.representation().clone(),
                translation: node.pose.translation,
                rotation: node.pose.rotation,
            })
        });
        Ok(())
    }

    fn set_overlay(&mut self, overlay: &Overlay) {
        self.mailbox.lock().overlay = overlay.clone();
    }

    fn dispose(&mut self) {
        let mut snapshot = self.mailbox.lock();
        snapshot.disposed = true;
        snapshot.asset = None;
        snapshot.overlay = Overlay::None;
    }
}
