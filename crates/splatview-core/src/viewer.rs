//! Viewer facade: owns the camera, scene graph and render scheduler and
//! sequences asset loads into the scene.
//!
//! A load is split in two halves so that a host can keep rendering while it
//! is in flight. [`Viewer::begin_load`] clears the asset slot and hands back a
//! [`LoadTicket`]; [`Viewer::finish_load`] applies the loader's result. Every
//! ticket carries a sequence number and only the most recent one may touch
//! the scene, so a slow load that resolves late never replaces a newer one.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::asset::AssetHandle;
use crate::camera::{Camera, CameraController};
use crate::config::{Config, FramingConfig};
use crate::error::{LoadError, ViewerError};
use crate::input::{PointerButton, PointerEvent, SurfaceSize, WheelEvent};
use crate::loader::{AssetLoader, Loaded};
use crate::scene::{NodeId, Pose, SceneGraph};
use crate::scheduler::{FrameOutcome, Overlay, RenderScheduler, Renderer};

/// Text shown in place of the 3D view when a load fails
pub const LOAD_FAILED_MESSAGE: &str = "Failed to load 3D model";

/// Hooks fired around every load
pub trait LoadObserver: Send + Sync {
    fn loading_started(&self, _path: &str) {}

    fn loading_finished(&self, _path: &str, _success: bool) {}
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl LoadObserver for NoopObserver {}

/// Identifies one `load` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    seq: u64,
    path: String,
}

impl LoadTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

#[derive(Debug, Clone)]
pub enum LoadOutcome {
    /// The asset is now the scene's asset node
    Displayed {
        node: NodeId,
        handle: Arc<AssetHandle>,
        from_cache: bool,
    },
    /// A newer load was started before this one settled; its result was dropped
    Superseded { path: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ViewerStatus {
    #[default]
    Idle,
    Loading {
        path: String,
    },
    Showing {
        path: String,
    },
    Failed {
        path: String,
    },
    Destroyed,
}

#[derive(Debug, Clone, Copy)]
struct PendingFraming {
    due: Instant,
    seq: u64,
}

pub struct Viewer<R> {
    camera: CameraController,
    scene: SceneGraph,
    scheduler: RenderScheduler<R>,
    loader: AssetLoader,
    framing: FramingConfig,
    observer: Arc<dyn LoadObserver>,
    latest: u64,
    pending_framing: Option<PendingFraming>,
    status: ViewerStatus,
    overlay: Overlay,
    resize_attached: bool,
}

impl<R: Renderer> Viewer<R> {
    /// Build the viewer around a renderer. Fails if the renderer has no
    /// container to draw into.
    pub fn new(
        config: &Config,
        renderer: R,
        loader: AssetLoader,
        observer: Arc<dyn LoadObserver>,
    ) -> Result<Self, ViewerError> {
        let Some(surface) = renderer.surface() else {
            error!("Render container is missing, viewer not created");
            return Err(ViewerError::ContainerMissing);
        };

        info!(
            width = surface.width,
            height = surface.height,
            "Viewer created"
        );

        Ok(Self {
            camera: CameraController::new(&config.camera, surface),
            scene: SceneGraph::with_helpers(&config.render),
            scheduler: RenderScheduler::new(renderer),
            loader,
            framing: config.framing.clone(),
            observer,
            latest: 0,
            pending_framing: None,
            status: ViewerStatus::Idle,
            overlay: Overlay::None,
            resize_attached: true,
        })
    }

    pub fn camera(&self) -> &Camera {
        self.camera.camera()
    }

    pub fn controller(&self) -> &CameraController {
        &self.camera
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn loader(&self) -> &AssetLoader {
        &self.loader
    }

    pub fn renderer(&self) -> Option<&R> {
        self.scheduler.renderer()
    }

    pub fn status(&self) -> &ViewerStatus {
        &self.status
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    /// When the pending auto-framing will run, if one is scheduled
    pub fn framing_due(&self) -> Option<Instant> {
        self.pending_framing.map(|p| p.due)
    }

    /// Load `path` and show it. Holds `&mut self` across the await; hosts
    /// that render while loading use [`load_shared`] instead.
    pub async fn load(&mut self, path: &str) -> Result<LoadOutcome, ViewerError> {
        let ticket = self.begin_load(path);
        let result = self.loader.load(path).await;
        self.finish_load(ticket, result, Instant::now())
    }

    /// First half of a load: drop the current asset node and show the
    /// loading overlay
    pub fn begin_load(&mut self, path: &str) -> LoadTicket {
        self.latest += 1;
        if let Some(previous) = self.scene.remove_asset() {
            debug!(node = ?previous.id, "Removed previous asset node");
        }
        self.pending_framing = None;
        self.set_status(ViewerStatus::Loading {
            path: path.to_string(),
        });
        self.set_overlay(Overlay::Loading {
            path: path.to_string(),
        });
        self.observer.loading_started(path);
        info!(path = %path, seq = self.latest, "Load started");

        LoadTicket {
            seq: self.latest,
            path: path.to_string(),
        }
    }

    /// Second half of a load: apply the loader result if `ticket` is still
    /// the latest one
    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<Loaded, LoadError>,
        now: Instant,
    ) -> Result<LoadOutcome, ViewerError> {
        self.observer
            .loading_finished(&ticket.path, result.is_ok());

        if ticket.seq != self.latest {
            info!(
                path = %ticket.path,
                seq = ticket.seq,
                latest = self.latest,
                "Discarding result of superseded load"
            );
            return Ok(LoadOutcome::Superseded { path: ticket.path });
        }

        match result {
            Ok(loaded) => {
                let node = self
                    .scene
                    .set_asset(loaded.handle.clone(), Pose::canonical_asset());
                self.pending_framing = Some(PendingFraming {
                    due: now + self.framing.settle_delay(),
                    seq: ticket.seq,
                });
                self.set_status(ViewerStatus::Showing {
                    path: ticket.path.clone(),
                });
                self.set_overlay(Overlay::None);
                info!(
                    path = %ticket.path,
                    from_cache = loaded.from_cache,
                    elements = loaded.handle.representation().len(),
                    "Asset displayed"
                );
                Ok(LoadOutcome::Displayed {
                    node,
                    handle: loaded.handle,
                    from_cache: loaded.from_cache,
                })
            }
            Err(e) => {
                warn!(path = %ticket.path, error = %e, "Asset load failed");
                self.set_status(ViewerStatus::Failed { path: ticket.path });
                self.set_overlay(Overlay::Placeholder {
                    message: LOAD_FAILED_MESSAGE.to_string(),
                });
                Err(ViewerError::LoadFailed(e))
            }
        }
    }

    /// One scheduler iteration: run a due auto-framing, then render
    pub fn tick(&mut self, now: Instant) -> FrameOutcome {
        if let Some(pending) = self.pending_framing {
            if now >= pending.due {
                self.pending_framing = None;
                if pending.seq == self.latest {
                    self.auto_frame();
                }
            }
        }
        self.scheduler
            .frame(Some(&self.scene), Some(self.camera.camera()))
    }

    /// Fit the camera to the asset's bounds. Returns the new radius.
    pub fn auto_frame(&mut self) -> Option<f32> {
        let Some(bounds) = self.scene.asset_bounds() else {
            debug!("No asset bounds to frame");
            return None;
        };
        let radius = bounds.max_extent() * self.framing.distance_factor;
        if !radius.is_finite() || radius <= 0.0 {
            warn!(radius, "Asset bounds are degenerate, keeping camera");
            return None;
        }
        self.camera.frame_at(radius);
        debug!(radius, "Camera framed to asset");
        Some(radius)
    }

    pub fn pointer_down(&mut self, event: PointerEvent) {
        self.camera.pointer_down(event);
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        self.camera.pointer_move(x, y);
    }

    pub fn pointer_up(&mut self, button: PointerButton) {
        self.camera.pointer_up(button);
    }

    pub fn pointer_enter(&mut self) {
        self.camera.pointer_enter();
    }

    pub fn pointer_leave(&mut self) {
        self.camera.pointer_leave();
    }

    pub fn wheel(&mut self, event: WheelEvent) {
        self.camera.wheel(event);
    }

    /// Container resized. Ignored once the viewer is destroyed.
    pub fn resize(&mut self, size: SurfaceSize) -> bool {
        if !self.resize_attached {
            return false;
        }
        if !self.camera.resize(size) {
            debug!(width = size.width, height = size.height, "Ignoring collapsed container");
            return false;
        }
        self.scheduler.resize(size);
        true
    }

    /// Stop rendering and detach from resize events. The asset cache is
    /// left alone.
    pub fn destroy(&mut self) {
        if !self.scheduler.is_running() && !self.resize_attached {
            return;
        }
        self.scheduler.stop();
        self.resize_attached = false;
        self.pending_framing = None;
        self.status = ViewerStatus::Destroyed;
        info!(cached = self.loader.cache().len(), "Viewer destroyed");
    }

    /// A destroyed viewer stays destroyed; late loads only fill the cache
    fn set_status(&mut self, status: ViewerStatus) {
        if self.status != ViewerStatus::Destroyed {
            self.status = status;
        }
    }

    fn set_overlay(&mut self, overlay: Overlay) {
        self.scheduler.set_overlay(&overlay);
        self.overlay = overlay;
    }
}

/// Viewer shared between a frame loop, input handlers and loads
pub type SharedViewer<R> = Arc<Mutex<Viewer<R>>>;

pub fn share<R>(viewer: Viewer<R>) -> SharedViewer<R> {
    Arc::new(Mutex::new(viewer))
}

pub fn lock_viewer<R>(viewer: &SharedViewer<R>) -> MutexGuard<'_, Viewer<R>> {
    viewer.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Load through a shared viewer. The lock is only held to begin and to
/// finish, never across the await.
pub async fn load_shared<R: Renderer>(
    viewer: &SharedViewer<R>,
    path: &str,
) -> Result<LoadOutcome, ViewerError> {
    let (ticket, loader) = {
        let mut guard = lock_viewer(viewer);
        (guard.begin_load(path), guard.loader().clone())
    };
    let result = loader.load(path).await;
    lock_viewer(viewer).finish_load(ticket, result, Instant::now())
}

/// Tick the viewer every `interval` until it is destroyed. Resolves to the
/// number of rendered frames.
pub fn spawn_frame_loop<R: Renderer + 'static>(
    viewer: SharedViewer<R>,
    interval: Duration,
) -> JoinHandle<u64> {
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut rendered = 0u64;

        loop {
            ticker.tick().await;
            let outcome = lock_viewer(&viewer).tick(Instant::now());
            match outcome {
                FrameOutcome::Rendered => rendered += 1,
                FrameOutcome::Skipped => {}
                FrameOutcome::Stopped => break,
            }
        }

        debug!(rendered, "Frame loop ended");
        rendered
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::LoadStrategy;
    use crate::camera::Interaction;
    use crate::testing::{points, Direct, Packed, RecordingRenderer, ScriptedSource};
    use crate::config::RenderConfig;
    use glam::Vec3;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn surface() -> Option<SurfaceSize> {
        Some(SurfaceSize::new(800, 600))
    }

    fn viewer_with(source: &Arc<ScriptedSource>) -> Viewer<RecordingRenderer> {
        let config = Config::default();
        let loader = AssetLoader::new(source.clone(), config.loader.clone());
        Viewer::new(
            &config,
            RecordingRenderer::new(surface()),
            loader,
            Arc::new(NoopObserver),
        )
        .unwrap()
    }

    fn shown_path(viewer: &Viewer<RecordingRenderer>) -> Option<String> {
        viewer
            .scene()
            .asset_node()
            .and_then(|n| n.asset())
            .map(|h| h.path().to_string())
    }

    #[derive(Default)]
    struct CountingObserver {
        started: AtomicUsize,
        ok: AtomicUsize,
        failed: AtomicUsize,
    }

    impl LoadObserver for CountingObserver {
        fn loading_started(&self, _path: &str) {
            self.started.fetch_add(1, Ordering::SeqCst);
        }

        fn loading_finished(&self, _path: &str, success: bool) {
            if success {
                self.ok.fetch_add(1, Ordering::SeqCst);
            } else {
                self.failed.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[test]
    fn test_missing_container_is_fatal() {
        let source = Arc::new(ScriptedSource::new());
        let config = Config::default();
        let result = Viewer::new(
            &config,
            RecordingRenderer::new(None),
            AssetLoader::new(source, config.loader.clone()),
            Arc::new(NoopObserver),
        );
        assert!(matches!(result, Err(ViewerError::ContainerMissing)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_a_b_a_hits_cache_and_keeps_single_asset() {
        let source = Arc::new(ScriptedSource::new());
        source.script("a.splat", Packed::Points(points(4)), Direct::Fail);
        source.script("b.splat", Packed::Points(points(6)), Direct::Fail);
        let mut viewer = viewer_with(&source);

        let first = viewer.load("a.splat").await.unwrap();
        viewer.load("b.splat").await.unwrap();
        let third = viewer.load("a.splat").await.unwrap();

        let (LoadOutcome::Displayed { handle: h1, .. }, LoadOutcome::Displayed { handle: h3, from_cache, .. }) =
            (first, third)
        else {
            panic!("expected displayed outcomes");
        };
        assert!(from_cache);
        assert!(Arc::ptr_eq(&h1, &h3));
        assert_eq!(source.packed_calls("a.splat"), 1);
        assert_eq!(viewer.scene().asset_count(), 1);
        assert_eq!(shown_path(&viewer).as_deref(), Some("a.splat"));
        assert_eq!(
            viewer.status(),
            &ViewerStatus::Showing {
                path: "a.splat".to_string()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_asset_gets_canonical_pose() {
        let source = Arc::new(ScriptedSource::new());
        source.script("a.splat", Packed::Points(points(3)), Direct::Fail);
        let mut viewer = viewer_with(&source);

        viewer.load("a.splat").await.unwrap();

        let node = viewer.scene().asset_node().unwrap();
        assert_eq!(node.pose, Pose::canonical_asset());
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_frame_after_settle_delay() {
        let source = Arc::new(ScriptedSource::new());
        // Extent along X is 9
        source.script("a.splat", Packed::Points(points(10)), Direct::Fail);
        let mut viewer = viewer_with(&source);
        let before = viewer.camera().position();

        viewer.load("a.splat").await.unwrap();
        let due = viewer.framing_due().unwrap();

        viewer.tick(due - Duration::from_millis(1));
        assert_eq!(viewer.camera().position(), before);

        viewer.tick(due);
        let radius = 9.0 * 1.5;
        assert!((viewer.controller().viewport().radius() - radius).abs() < 1e-4);
        assert!((viewer.camera().position() - Vec3::new(0.0, -radius, 0.0)).length() < 1e-3);
        assert!(viewer.framing_due().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_frame_runs_on_cache_hit() {
        let source = Arc::new(ScriptedSource::new());
        source.script("a.splat", Packed::Points(points(5)), Direct::Fail);
        let mut viewer = viewer_with(&source);

        viewer.load("a.splat").await.unwrap();
        viewer.tick(viewer.framing_due().unwrap());
        viewer.wheel(WheelEvent { delta_y: 1.0 });
        viewer.wheel(WheelEvent { delta_y: 1.0 });

        viewer.load("a.splat").await.unwrap();
        viewer.tick(viewer.framing_due().unwrap());
        assert!((viewer.controller().viewport().radius() - 6.0).abs() < 1e-4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_shows_placeholder_and_is_not_cached() {
        let source = Arc::new(ScriptedSource::new());
        source.script("a.splat", Packed::Points(points(4)), Direct::Fail);
        source.script("bad.splat", Packed::Fail, Direct::Fail);
        let mut viewer = viewer_with(&source);
        let log = viewer.renderer().unwrap().log();

        viewer.load("a.splat").await.unwrap();
        let err = viewer.load("bad.splat").await.unwrap_err();

        assert!(matches!(err, ViewerError::LoadFailed(_)));
        assert_eq!(
            viewer.overlay(),
            &Overlay::Placeholder {
                message: LOAD_FAILED_MESSAGE.to_string()
            }
        );
        assert_eq!(viewer.scene().asset_count(), 0);
        assert!(!viewer.loader().cache().contains("bad.splat"));
        assert_eq!(source.direct_calls("bad.splat"), 1);

        // Controls and frames keep working
        viewer.pointer_down(PointerEvent::new(PointerButton::Primary, 0.0, 0.0));
        viewer.pointer_move(100.0, 0.0);
        assert_eq!(viewer.tick(Instant::now()), FrameOutcome::Rendered);
        assert_eq!(log.lock().unwrap().frames, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlay_sequence_for_successful_load() {
        let source = Arc::new(ScriptedSource::new());
        source.script("a.splat", Packed::Points(points(2)), Direct::Fail);
        let mut viewer = viewer_with(&source);
        let log = viewer.renderer().unwrap().log();

        viewer.load("a.splat").await.unwrap();

        assert_eq!(
            log.lock().unwrap().overlays,
            vec![
                Overlay::Loading {
                    path: "a.splat".to_string()
                },
                Overlay::None
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_result_is_discarded() {
        let source = Arc::new(ScriptedSource::new());
        source.script(
            "slow.splat",
            Packed::Delayed(Duration::from_secs(5), points(3)),
            Direct::Fail,
        );
        source.script(
            "fast.splat",
            Packed::Delayed(Duration::from_secs(1), points(4)),
            Direct::Fail,
        );
        let viewer = share(viewer_with(&source));

        let slow = load_shared(&viewer, "slow.splat");
        let fast = async {
            // Issued after the slow load has begun
            time::sleep(Duration::from_millis(10)).await;
            load_shared(&viewer, "fast.splat").await
        };
        let (slow, fast) = tokio::join!(slow, fast);

        assert!(matches!(slow.unwrap(), LoadOutcome::Superseded { .. }));
        assert!(matches!(fast.unwrap(), LoadOutcome::Displayed { .. }));
        let guard = lock_viewer(&viewer);
        assert_eq!(shown_path(&guard).as_deref(), Some("fast.splat"));
        assert_eq!(guard.scene().asset_count(), 1);
        // The superseded result still lands in the cache
        assert!(guard.loader().cache().contains("slow.splat"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_frames_continue_during_stalled_load() {
        let source = Arc::new(ScriptedSource::new());
        source.script("stall.splat", Packed::Stall, Direct::Points(points(3)));
        let viewer = share(viewer_with(&source));
        let log = lock_viewer(&viewer).renderer().unwrap().log();

        let render = RenderConfig {
            frame_rate: 10,
            ..RenderConfig::default()
        };
        let frames = spawn_frame_loop(viewer.clone(), render.frame_interval());
        let loaded = load_shared(&viewer, "stall.splat").await.unwrap();

        let LoadOutcome::Displayed { handle, .. } = loaded else {
            panic!("expected displayed outcome");
        };
        assert_eq!(handle.strategy(), LoadStrategy::Direct);
        {
            let log = log.lock().unwrap();
            // 30 s of 100 ms ticks while strategy A waited
            assert!(log.frames >= 290);
            assert!(log.asset_counts.iter().all(|&n| n <= 1));
        }

        lock_viewer(&viewer).destroy();
        let rendered = frames.await.unwrap();
        assert!(rendered >= 290);
    }

    #[tokio::test(start_paused = true)]
    async fn test_destroy_stops_frames_and_keeps_cache() {
        let source = Arc::new(ScriptedSource::new());
        source.script("a.splat", Packed::Points(points(4)), Direct::Fail);
        let mut viewer = viewer_with(&source);
        let log = viewer.renderer().unwrap().log();

        viewer.load("a.splat").await.unwrap();
        viewer.destroy();
        viewer.destroy();

        assert_eq!(log.lock().unwrap().disposed, 1);
        assert_eq!(viewer.tick(Instant::now()), FrameOutcome::Stopped);
        assert!(!viewer.resize(SurfaceSize::new(1024, 768)));
        assert!(viewer.loader().cache().contains("a.splat"));
        assert_eq!(viewer.status(), &ViewerStatus::Destroyed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_after_destroy_only_fills_cache() {
        let source = Arc::new(ScriptedSource::new());
        source.script("b.splat", Packed::Points(points(2)), Direct::Fail);
        let mut viewer = viewer_with(&source);
        let log = viewer.renderer().unwrap().log();

        viewer.destroy();
        viewer.load("b.splat").await.unwrap();

        assert_eq!(viewer.status(), &ViewerStatus::Destroyed);
        assert!(viewer.loader().cache().contains("b.splat"));
        assert_eq!(viewer.tick(Instant::now()), FrameOutcome::Stopped);
        assert_eq!(log.lock().unwrap().frames, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resize_updates_camera_and_renderer() {
        let source = Arc::new(ScriptedSource::new());
        let mut viewer = viewer_with(&source);
        let log = viewer.renderer().unwrap().log();

        assert!(viewer.resize(SurfaceSize::new(1000, 500)));
        assert!(!viewer.resize(SurfaceSize::new(1000, 0)));

        assert!((viewer.camera().aspect - 2.0).abs() < 1e-6);
        assert_eq!(log.lock().unwrap().resizes, vec![SurfaceSize::new(1000, 500)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pointer_forwarding() {
        let source = Arc::new(ScriptedSource::new());
        let mut viewer = viewer_with(&source);
        let theta = viewer.controller().viewport().theta();

        viewer.pointer_down(PointerEvent::new(PointerButton::Primary, 10.0, 10.0));
        assert_eq!(viewer.controller().interaction(), Interaction::Orbiting);
        viewer.pointer_move(110.0, 10.0);
        assert!((viewer.controller().viewport().theta() - (theta - 1.0)).abs() < 1e-5);

        viewer.pointer_leave();
        assert_eq!(viewer.controller().interaction(), Interaction::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_observer_hooks_fire_for_every_load() {
        let source = Arc::new(ScriptedSource::new());
        source.script("a.splat", Packed::Points(points(2)), Direct::Fail);
        source.script("bad.splat", Packed::Fail, Direct::Fail);
        let observer = Arc::new(CountingObserver::default());
        let config = Config::default();
        let mut viewer = Viewer::new(
            &config,
            RecordingRenderer::new(surface()),
            AssetLoader::new(source.clone(), config.loader.clone()),
            observer.clone(),
        )
        .unwrap();

        viewer.load("a.splat").await.unwrap();
        viewer.load("a.splat").await.unwrap();
        let _ = viewer.load("bad.splat").await;

        assert_eq!(observer.started.load(Ordering::SeqCst), 3);
        assert_eq!(observer.ok.load(Ordering::SeqCst), 2);
        assert_eq!(observer.failed.load(Ordering::SeqCst), 1);
    }
}
