//! Session: the root object tying the catalog, the viewer and the companion
//! view player together

use std::sync::Arc;
use tracing::{info, warn};

use crate::catalog::{CompanionView, SceneCatalog, SceneRequest};
use crate::error::ViewerError;
use crate::scheduler::Renderer;
use crate::viewer::{load_shared, lock_viewer, LoadOutcome, SharedViewer};

/// Number of companion views a selection needs before they are played
pub const REQUIRED_VIEWS: usize = 3;

/// Plays the companion views of a scene. Playback itself lives outside the
/// core.
pub trait ViewSink: Send + Sync {
    fn show_views(&self, views: &[CompanionView]);

    fn reset(&self) {}
}

/// What a scene generation did
#[derive(Debug, Clone)]
pub struct Generated {
    /// `None` if the catalog has no asset for the selection
    pub load: Option<LoadOutcome>,
    pub views_shown: bool,
}

pub struct Session<R> {
    catalog: SceneCatalog,
    viewer: SharedViewer<R>,
    views: Arc<dyn ViewSink>,
}

impl<R: Renderer> Session<R> {
    pub fn new(catalog: SceneCatalog, viewer: SharedViewer<R>, views: Arc<dyn ViewSink>) -> Self {
        Self {
            catalog,
            viewer,
            views,
        }
    }

    pub fn catalog(&self) -> &SceneCatalog {
        &self.catalog
    }

    pub fn viewer(&self) -> &SharedViewer<R> {
        &self.viewer
    }

    /// Handle a scene generation request: load the asset, then hand over the
    /// companion views. Views are handed over even when the load fails; the
    /// load error is returned afterwards.
    pub async fn generate(&self, request: &SceneRequest) -> Result<Generated, ViewerError> {
        let key = request.object_key();
        info!(scene = %request.scene, objects = %key, "Generating scene");

        let load = match self.catalog.asset_path(request) {
            Some(path) => Some(load_shared(&self.viewer, path).await),
            None => {
                warn!(scene = %request.scene, objects = %key, "No asset for selection");
                None
            }
        };

        let views_shown = match self.catalog.views(request) {
            Some(views) => self.hand_views(views),
            None => {
                warn!(scene = %request.scene, objects = %key, "No companion views for selection");
                false
            }
        };

        let load = load.transpose()?;
        Ok(Generated { load, views_shown })
    }

    /// Tear down the viewer and stop view playback. Cached assets stay.
    pub fn shutdown(&self) {
        lock_viewer(&self.viewer).destroy();
        self.views.reset();
        info!("Session shut down");
    }

    fn hand_views(&self, views: &[CompanionView]) -> bool {
        if views.len() < REQUIRED_VIEWS {
            let e = ViewerError::IncompleteAssetData {
                expected: REQUIRED_VIEWS,
                found: views.len(),
            };
            warn!(error = %e, "Companion views skipped");
            return false;
        }
        self.views.show_views(&views[..REQUIRED_VIEWS]);
        true
    }
}
