//! Per-frame rendering through a pluggable backend

use tracing::{debug, warn};

use crate::camera::Camera;
use crate::error::RenderError;
use crate::input::SurfaceSize;
use crate::scene::SceneGraph;

/// What the container shows on top of (or instead of) the 3D view
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Overlay {
    #[default]
    None,
    Loading { path: String },
    Placeholder { message: String },
}

/// Rendering backend driven by the scheduler
pub trait Renderer: Send {
    /// Size of the render container, `None` if there is no container
    fn surface(&self) -> Option<SurfaceSize>;

    fn resize(&mut self, size: SurfaceSize);

    fn render(&mut self, scene: &SceneGraph, camera: &Camera) -> Result<(), RenderError>;

    fn set_overlay(&mut self, overlay: &Overlay);

    /// Release the underlying rendering context
    fn dispose(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Rendered,
    Skipped,
    /// The scheduler was torn down; no further frames will run
    Stopped,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub rendered: u64,
    pub skipped: u64,
}

/// Runs one frame per tick until stopped
pub struct RenderScheduler<R> {
    renderer: Option<R>,
    stats: FrameStats,
}

impl<R: Renderer> RenderScheduler<R> {
    pub fn new(renderer: R) -> Self {
        Self {
            renderer: Some(renderer),
            stats: FrameStats::default(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.renderer.is_some()
    }

    pub fn renderer(&self) -> Option<&R> {
        self.renderer.as_ref()
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Render one frame if everything needed is present. Renderer errors are
    /// logged and the frame is counted as skipped.
    pub fn frame(&mut self, scene: Option<&SceneGraph>, camera: Option<&Camera>) -> FrameOutcome {
        let Some(renderer) = self.renderer.as_mut() else {
            return FrameOutcome::Stopped;
        };
        let (Some(scene), Some(camera)) = (scene, camera) else {
            self.stats.skipped += 1;
            return FrameOutcome::Skipped;
        };

        match renderer.render(scene, camera) {
            Ok(()) => {
                self.stats.rendered += 1;
                FrameOutcome::Rendered
            }
            Err(e) => {
                warn!(error = %e, "Frame skipped");
                self.stats.skipped += 1;
                FrameOutcome::Skipped
            }
        }
    }

    pub fn resize(&mut self, size: SurfaceSize) {
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.resize(size);
        }
    }

    pub fn set_overlay(&mut self, overlay: &Overlay) {
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.set_overlay(overlay);
        }
    }

    /// Dispose the renderer and stop scheduling frames
    pub fn stop(&mut self) {
        if let Some(mut renderer) = self.renderer.take() {
            renderer.dispose();
            debug!(
                rendered = self.stats.rendered,
                skipped = self.stats.skipped,
                "Render scheduler stopped"
            );
        }
    }
}
