//! Where splat bytes come from
//!
//! The loader talks to a [`SplatSource`] through two entry points, one per
//! loading strategy. [`StorageSource`] serves local files and HTTP(S) URLs.

use futures_util::future::BoxFuture;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::{debug, trace};

use crate::asset::SplatCloud;
use crate::error::SourceError;
use crate::format::{decode_all, RecordAssembler};

const READ_CHUNK: usize = 64 * 1024;

/// Provider of splat data for a path
pub trait SplatSource: Send + Sync {
    /// Stream elements into `cloud` as they are decoded. The returned future
    /// resolves when the body is exhausted or the cloud is full.
    fn stream_into(
        &self,
        path: &str,
        cloud: Arc<SplatCloud>,
    ) -> BoxFuture<'static, Result<(), SourceError>>;

    /// Fetch and decode the complete body in one request
    fn load_direct(&self, path: &str) -> BoxFuture<'static, Result<SplatCloud, SourceError>>;
}

/// Where a path resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    File(PathBuf),
    Url(String),
}

/// Local filesystem and HTTP(S) source
#[derive(Debug, Clone)]
pub struct StorageSource {
    root: PathBuf,
    http: reqwest::Client,
}

impl StorageSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            http: reqwest::Client::new(),
        }
    }

    pub fn locate(&self, path: &str) -> Location {
        if path.starts_with("http://") || path.starts_with("https://") {
            Location::Url(path.to_string())
        } else {
            Location::File(self.root.join(path))
        }
    }
}

impl SplatSource for StorageSource {
    fn stream_into(
        &self,
        path: &str,
        cloud: Arc<SplatCloud>,
    ) -> BoxFuture<'static, Result<(), SourceError>> {
        let location = self.locate(path);
        let http = self.http.clone();
        Box::pin(async move {
            match location {
                Location::File(file) => stream_file(file, cloud).await,
                Location::Url(url) => stream_url(http, url, cloud).await,
            }
        })
    }

    fn load_direct(&self, path: &str) -> BoxFuture<'static, Result<SplatCloud, SourceError>> {
        let location = self.locate(path);
        let http = self.http.clone();
        Box::pin(async move {
            let bytes = match location {
                Location::File(file) => tokio::fs::read(&file).await?,
                Location::Url(url) => fetch(&http, &url).await?.bytes().await?.to_vec(),
            };
            let points = decode_all(&bytes)?;
            if points.is_empty() {
                return Err(SourceError::Empty);
            }
            debug!(elements = points.len(), "Decoded splat body");
            Ok(SplatCloud::from_points(points))
        })
    }
}

async fn stream_file(file: PathBuf, cloud: Arc<SplatCloud>) -> Result<(), SourceError> {
    let mut reader = tokio::fs::File::open(&file).await?;
    let mut assembler = RecordAssembler::default();
    let mut buf = vec![0u8; READ_CHUNK];

    loop {
        let read = reader.read(&mut buf).await?;
        if read == 0 {
            break;
        }
        cloud.extend(assembler.push(&buf[..read]));
        trace!(path = %file.display(), elements = cloud.len(), "Streamed chunk");
        if cloud.is_full() {
            return Ok(());
        }
    }
    assembler.finish()
}

async fn stream_url(
    http: reqwest::Client,
    url: String,
    cloud: Arc<SplatCloud>,
) -> Result<(), SourceError> {
    let mut response = fetch(&http, &url).await?;
    let mut assembler = RecordAssembler::default();

    while let Some(chunk) = response.chunk().await? {
        cloud.extend(assembler.push(&chunk));
        if cloud.is_full() {
            return Ok(());
        }
    }
    assembler.finish()
}

async fn fetch(http: &reqwest::Client, url: &str) -> Result<reqwest::Response, SourceError> {
    let response = http.get(url).send().await?;
    if !response.status().is_success() {
        return Err(SourceError::Status {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }
    Ok(response)
}
