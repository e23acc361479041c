//! Asset loads and scene generation on a background tokio runtime
//!
//! Requests arrive as Bevy messages. Each one runs as a task on the
//! [`LoadRuntime`]; results come back through the shared pending queue and
//! are drained into [`LoadFeedback`] once per frame.

use bevy::prelude::*;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};

use splatview_core::{
    load_shared, CompanionView, LoadObserver, LoadOutcome, SceneRequest, ViewSink,
};

use crate::app::CoreViewer;

pub struct LoadingPlugin;

impl Plugin for LoadingPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PendingReports>()
            .init_resource::<LoadFeedback>()
            .init_resource::<CompanionViews>()
            .add_message::<GenerateScene>()
            .add_message::<LoadAsset>()
            .add_systems(Update, (dispatch_requests, drain_reports).chain());
    }
}

/// Runtime the loads run on
#[derive(Resource)]
pub struct LoadRuntime(pub tokio::runtime::Runtime);

/// "Scene generation requested"
#[derive(Message, Debug, Clone)]
pub struct GenerateScene(pub SceneRequest);

/// Load a single asset path, bypassing the catalog
#[derive(Message, Debug, Clone)]
pub struct LoadAsset(pub String);

/// Outcome of one finished request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub label: String,
    pub result: Result<String, String>,
}

/// Results handed back from the runtime
#[derive(Resource, Default)]
pub struct PendingReports(pub Arc<Mutex<Vec<LoadReport>>>);

/// Load activity as seen by the UI
#[derive(Resource, Default)]
pub struct LoadFeedback {
    /// Paths currently loading, maintained by the observer hooks
    active: Arc<Mutex<Vec<String>>>,
    pub last: Option<LoadReport>,
}

impl LoadFeedback {
    pub fn observer(&self) -> Arc<dyn LoadObserver> {
        Arc::new(ActiveLoads(self.active.clone()))
    }

    pub fn active(&self) -> Vec<String> {
        lock(&self.active).clone()
    }
}

struct ActiveLoads(Arc<Mutex<Vec<String>>>);

impl LoadObserver for ActiveLoads {
    fn loading_started(&self, path: &str) {
        lock(&self.0).push(path.to_string());
    }

    fn loading_finished(&self, path: &str, _success: bool) {
        let mut active = lock(&self.0);
        if let Some(index) = active.iter().position(|p| p == path) {
            active.remove(index);
        }
    }
}

/// Companion views of the last generated scene
#[derive(Resource, Default)]
pub struct CompanionViews(Arc<Mutex<Vec<CompanionView>>>);

impl CompanionViews {
    pub fn sink(&self) -> Arc<dyn ViewSink> {
        Arc::new(ViewList(self.0.clone()))
    }

    pub fn current(&self) -> Vec<CompanionView> {
        lock(&self.0).clone()
    }
}

struct ViewList(Arc<Mutex<Vec<CompanionView>>>);

impl ViewSink for ViewList {
    fn show_views(&self, views: &[CompanionView]) {
        *lock(&self.0) = views.to_vec();
    }

    fn reset(&self) {
        lock(&self.0).clear();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn describe(outcome: &LoadOutcome) -> String {
    match outcome {
        LoadOutcome::Displayed {
            handle, from_cache, ..
        } => {
            let origin = if *from_cache { "cache" } else { "source" };
            format!(
                "{} ({} splats, from {})",
                handle.path(),
                handle.representation().len(),
                origin
            )
        }
        LoadOutcome::Superseded { path } => format!("{path} (superseded)"),
    }
}

fn dispatch_requests(
    mut scenes: MessageReader<GenerateScene>,
    mut assets: MessageReader<LoadAsset>,
    core: Option<Res<CoreViewer>>,
    runtime: Res<LoadRuntime>,
    pending: Res<PendingReports>,
) {
    let Some(core) = core else {
        scenes.clear();
        assets.clear();
        return;
    };

    for GenerateScene(request) in scenes.read() {
        let session = core.session.clone();
        let pending = pending.0.clone();
        let request = request.clone();

        runtime.0.spawn(async move {
            let label = format!("{} [{}]", request.scene, request.object_key());
            let result = match session.generate(&request).await {
                Ok(generated) => Ok(generated
                    .load
                    .as_ref()
                    .map(describe)
                    .unwrap_or_else(|| "no asset for selection".to_string())),
                Err(e) => Err(e.to_string()),
            };
            lock(&pending).push(LoadReport { label, result });
        });
    }

    for LoadAsset(path) in assets.read() {
        let viewer = core.viewer.clone();
        let pending = pending.0.clone();
        let path = path.clone();

        runtime.0.spawn(async move {
            let result = load_shared(&viewer, &path)
                .await
                .map(|outcome| describe(&outcome))
                .map_err(|e| e.to_string());
            lock(&pending).push(LoadReport {
                label: path,
                result,
            });
        });
    }
}

fn drain_reports(pending: Res<PendingReports>, mut feedback: ResMut<LoadFeedback>) {
    let reports: Vec<LoadReport> = match pending.0.try_lock() {
        Ok(mut queue) => queue.drain(..).collect(),
        Err(_) => return,
    };

    for report in reports {
        match &report.result {
            Ok(summary) => info!(request = %report.label, "Request finished: {}", summary),
            Err(e) => warn!(request = %report.label, "Request failed: {}", e),
        }
        feedback.last = Some(report);
    }
}
