//! Splatview Viewer - Bevy front end for the splat viewer core
//!
//! The core viewer owns the camera, the asset cache and the frame loop. This
//! crate gives it a window: input is forwarded from Bevy messages, each core
//! frame is mirrored onto ECS entities, and egui draws the catalog picker and
//! the loading overlay.

mod app;
mod bridge;
mod input;
mod loading;
mod scene;
mod ui;

pub use app::{run, InitialLoad, ViewerOptions};
