//! Error types shared across the viewer core

use std::time::Duration;
use thiserror::Error;

/// Errors raised by an asset source while fetching or decoding splat data
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },
    #[error("Malformed splat data: {0}")]
    Decode(String),
    #[error("Asset contains no elements")]
    Empty,
}

/// Failure of the streamed (packed) loading strategy
#[derive(Error, Debug)]
pub enum PackedError {
    #[error("no elements arrived within {0:?}")]
    Timeout(Duration),
    #[error("stream ended without elements")]
    Empty,
    #[error("stream failed: {0}")]
    Source(#[from] SourceError),
    #[error("stream task aborted: {0}")]
    Aborted(String),
}

/// Final outcome of a load once both strategies have been tried
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to load {path}: packed ({packed}), direct ({direct})")]
    Failed {
        path: String,
        packed: PackedError,
        direct: SourceError,
    },
}

impl LoadError {
    pub fn path(&self) -> &str {
        match self {
            LoadError::Failed { path, .. } => path,
        }
    }
}

/// Errors surfaced by a renderer backend for a single frame
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("renderer has been disposed")]
    Disposed,
    #[error("render backend error: {0}")]
    Backend(String),
}

/// Errors from the scene catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Errors surfaced by the viewer facade
#[derive(Error, Debug)]
pub enum ViewerError {
    #[error("render container is missing")]
    ContainerMissing,
    #[error("load failed: {0}")]
    LoadFailed(#[from] LoadError),
    #[error("incomplete asset data: expected {expected} elements, found {found}")]
    IncompleteAssetData { expected: usize, found: usize },
}
