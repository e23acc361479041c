//! Bevy application setup

use anyhow::{anyhow, Result};
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use bevy_egui::EguiPlugin;
use bevy_picking::DefaultPickingPlugins;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use splatview_core::{
    lock_viewer, share, AssetLoader, Config, LoadObserver, SceneCatalog, SceneRequest, Session,
    SharedViewer, StorageSource, SurfaceSize, ViewSink, Viewer, ViewerError,
};

use crate::bridge::{BevyRenderer, FrameMailbox};
use crate::input::InputPlugin;
use crate::loading::{
    CompanionViews, GenerateScene, LoadAsset, LoadFeedback, LoadRuntime, LoadingPlugin,
};
use crate::scene::ScenePlugin;
use crate::ui::UiPlugin;

/// What to show right after startup
#[derive(Debug, Clone)]
pub enum InitialLoad {
    Asset(String),
    Scene(SceneRequest),
}

#[derive(Debug, Clone)]
pub struct ViewerOptions {
    pub config: Config,
    pub catalog: SceneCatalog,
    pub initial: Option<InitialLoad>,
}

/// Startup inputs, kept as a resource until the core viewer is built
#[derive(Resource)]
pub struct ViewerSettings(pub ViewerOptions);

/// The core viewer and the session around it
#[derive(Resource, Clone)]
pub struct CoreViewer {
    pub viewer: SharedViewer<BevyRenderer>,
    pub session: Arc<Session<BevyRenderer>>,
    pub mailbox: FrameMailbox,
}

impl CoreViewer {
    /// Core viewer, renderer mailbox and session for a window of `surface`
    pub fn build(
        options: &ViewerOptions,
        surface: Option<SurfaceSize>,
        observer: Arc<dyn LoadObserver>,
        views: Arc<dyn ViewSink>,
    ) -> Result<Self, ViewerError> {
        let mailbox = FrameMailbox::default();
        let source = Arc::new(StorageSource::new(options.config.loader.asset_root.clone()));
        let loader = AssetLoader::new(source, options.config.loader.clone());
        let renderer = BevyRenderer::new(surface, mailbox.clone());

        let viewer = share(Viewer::new(&options.config, renderer, loader, observer)?);
        let session = Session::new(options.catalog.clone(), viewer.clone(), views);
        Ok(Self {
            viewer,
            session: Arc::new(session),
            mailbox,
        })
    }
}

/// Paces core frames to the configured frame rate, independent of how
/// often Bevy updates
#[derive(Resource, Debug)]
pub struct FramePacer {
    interval: Duration,
    since_last: Duration,
}

impl FramePacer {
    pub fn new(interval: Duration) -> Self {
        // The first update renders right away
        Self {
            interval,
            since_last: interval,
        }
    }

    /// Account for `delta` of wall time; true when a core frame is due
    pub fn advance(&mut self, delta: Duration) -> bool {
        self.since_last += delta;
        if self.since_last < self.interval {
            return false;
        }
        // Keep the remainder but never build up a backlog of frames
        self.since_last = (self.since_last - self.interval).min(self.interval);
        true
    }
}

/// Per-frame ordering of the viewer systems
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewerSet {
    Input,
    Tick,
    Apply,
}

/// Run the Bevy application
pub fn run(options: ViewerOptions) -> Result<()> {
    let background = options.config.render.background;
    let pacer = FramePacer::new(options.config.render.frame_interval());
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("splatview-loader")
        .enable_all()
        .build()?;

    let exit = App::new()
        .insert_resource(ClearColor(Color::linear_rgb(
            background[0],
            background[1],
            background[2],
        )))
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Splat Viewer".to_string(),
                ..default()
            }),
            ..default()
        }))
        // Must come before EguiPlugin so it can detect PickingPlugin
        .add_plugins(DefaultPickingPlugins)
        .add_plugins(EguiPlugin::default())
        .insert_resource(ViewerSettings(options))
        .insert_resource(LoadRuntime(runtime))
        .insert_resource(pacer)
        .configure_sets(
            Update,
            (ViewerSet::Input, ViewerSet::Tick, ViewerSet::Apply).chain(),
        )
        .add_systems(Startup, (init_viewer, queue_initial_load).chain())
        .add_plugins(LoadingPlugin)
        .add_plugins(InputPlugin)
        .add_plugins(ScenePlugin)
        .add_plugins(UiPlugin)
        .add_systems(Update, tick_viewer.in_set(ViewerSet::Tick))
        .add_systems(Last, shutdown_on_exit)
        .run();

    match exit {
        AppExit::Success => Ok(()),
        AppExit::Error(code) => Err(anyhow!("viewer exited with code {code}")),
    }
}

/// Build the core viewer around the primary window
pub fn init_viewer(
    mut commands: Commands,
    settings: Res<ViewerSettings>,
    windows: Query<&Window, With<PrimaryWindow>>,
    views: Res<CompanionViews>,
    feedback: Res<LoadFeedback>,
    mut exit: MessageWriter<AppExit>,
) {
    let options = &settings.0;
    let surface = windows
        .single()
        .ok()
        .map(|w| SurfaceSize::new(w.physical_width(), w.physical_height()));

    match CoreViewer::build(options, surface, feedback.observer(), views.sink()) {
        Ok(core) => {
            info!(scenes = options.catalog.scenes.len(), "Viewer ready");
            commands.insert_resource(core);
        }
        Err(e) => {
            error!("Viewer initialization failed: {}", e);
            exit.write(AppExit::error());
        }
    }
}

fn queue_initial_load(
    settings: Res<ViewerSettings>,
    core: Option<Res<CoreViewer>>,
    mut assets: MessageWriter<LoadAsset>,
    mut scenes: MessageWriter<GenerateScene>,
) {
    if core.is_none() {
        return;
    }
    match &settings.0.initial {
        Some(InitialLoad::Asset(path)) => {
            assets.write(LoadAsset(path.clone()));
        }
        Some(InitialLoad::Scene(request)) => {
            scenes.write(GenerateScene(request.clone()));
        }
        None => {}
    }
}

/// One core scheduler iteration whenever the pacer says a frame is due
fn tick_viewer(core: Option<Res<CoreViewer>>, time: Res<Time>, mut pacer: ResMut<FramePacer>) {
    let Some(core) = core else { return };
    if pacer.advance(time.delta()) {
        lock_viewer(&core.viewer).tick(tokio::time::Instant::now());
    }
}

/// Tear the core down once the app is exiting: stops the frame loop,
/// disposes the renderer and resets companion view playback
fn shutdown_on_exit(core: Option<Res<CoreViewer>>, mut exits: MessageReader<AppExit>) {
    let Some(exit) = exits.read().last() else { return };
    let Some(core) = core else { return };
    info!(?exit, "Shutting down viewer");
    core.session.shutdown();
}
