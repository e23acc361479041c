//! Splatview Core - Camera control, asset loading and frame scheduling
//!
//! This crate provides the windowing-independent half of the splat viewer:
//! - Asset cache and loader with a streamed strategy and a direct fallback
//! - Spherical orbit camera driven by normalized pointer and wheel records
//! - Render scheduler over a pluggable [`Renderer`] backend
//! - Viewer facade that sequences loads into the scene and auto-frames them
//! - Scene catalog and the session root object that ties them together

pub mod asset;
pub mod camera;
pub mod catalog;
pub mod config;
pub mod error;
pub mod format;
pub mod input;
pub mod loader;
pub mod scene;
pub mod scheduler;
pub mod session;
pub mod source;
pub mod viewer;

#[cfg(test)]
mod testing;

pub use asset::{Aabb, AssetCache, AssetHandle, LoadState, LoadStrategy, SplatCloud};
pub use camera::{Camera, CameraController, Interaction, PointerState, Viewport};
pub use catalog::{CatalogObject, CompanionView, SceneCatalog, SceneEntry, SceneRequest};
pub use config::{load_config, Config};
pub use error::{CatalogError, LoadError, PackedError, RenderError, SourceError, ViewerError};
pub use format::SplatPoint;
pub use input::{PointerButton, PointerEvent, SurfaceSize, WheelEvent};
pub use loader::{AssetLoader, Loaded};
pub use scene::{Axis, NodeId, NodeKind, Pose, SceneGraph, SceneNode};
pub use scheduler::{FrameOutcome, FrameStats, Overlay, RenderScheduler, Renderer};
pub use session::{Generated, Session, ViewSink};
pub use source::{SplatSource, StorageSource};
pub use viewer::{
    load_shared, lock_viewer, share, spawn_frame_loop, LoadObserver, LoadOutcome, LoadTicket,
    NoopObserver, SharedViewer, Viewer, ViewerStatus,
};
