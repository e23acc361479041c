//! Asset loading with cache, streamed strategy and direct fallback
//!
//! `load(path)` checks the cache, then tries the streamed (packed) strategy
//! until the first element arrives or the timeout passes, then falls back to
//! a direct load. Only successful loads are cached.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::asset::{AssetCache, AssetHandle, LoadState, LoadStrategy, SplatCloud};
use crate::config::LoaderConfig;
use crate::error::{LoadError, PackedError, SourceError};
use crate::source::SplatSource;

/// A successful load and where it came from
#[derive(Debug, Clone)]
pub struct Loaded {
    pub handle: Arc<AssetHandle>,
    pub from_cache: bool,
}

/// Cloneable handle to the shared loader
#[derive(Clone)]
pub struct AssetLoader {
    inner: Arc<LoaderInner>,
}

struct LoaderInner {
    source: Arc<dyn SplatSource>,
    cache: AssetCache,
    config: LoaderConfig,
    /// In-flight and failed paths; ready paths live in the cache
    status: Mutex<HashMap<String, LoadState>>,
}

impl AssetLoader {
    pub fn new(source: Arc<dyn SplatSource>, config: LoaderConfig) -> Self {
        Self {
            inner: Arc::new(LoaderInner {
                source,
                cache: AssetCache::new(),
                config,
                status: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn cache(&self) -> &AssetCache {
        &self.inner.cache
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.inner.config
    }

    /// Current state for a path, `None` if it was never requested
    pub fn status(&self, path: &str) -> Option<LoadState> {
        if self.inner.cache.contains(path) {
            return Some(LoadState::Ready);
        }
        self.lock_status().get(path).copied()
    }

    pub async fn load(&self, path: &str) -> Result<Loaded, LoadError> {
        if let Some(handle) = self.inner.cache.get(path) {
            debug!(path = %path, "Asset served from cache");
            return Ok(Loaded {
                handle,
                from_cache: true,
            });
        }

        self.set_status(path, LoadState::Loading);

        let (representation, strategy) = match self.load_packed(path).await {
            Ok(cloud) => {
                info!(path = %path, elements = cloud.len(), "Packed load succeeded");
                (cloud, LoadStrategy::Packed)
            }
            Err(packed) => {
                warn!(path = %path, error = %packed, "Packed load failed, falling back to direct load");
                match self.inner.source.load_direct(path).await {
                    Ok(cloud) => {
                        info!(path = %path, elements = cloud.len(), "Direct load succeeded");
                        (Arc::new(cloud), LoadStrategy::Direct)
                    }
                    Err(direct) => {
                        self.set_status(path, LoadState::Failed);
                        return Err(LoadError::Failed {
                            path: path.to_string(),
                            packed,
                            direct,
                        });
                    }
                }
            }
        };

        let handle = self
            .inner
            .cache
            .insert(AssetHandle::ready(path, representation, strategy));
        self.lock_status().remove(path);

        Ok(Loaded {
            handle,
            from_cache: false,
        })
    }

    async fn load_packed(&self, path: &str) -> Result<Arc<SplatCloud>, PackedError> {
        let config = &self.inner.config;
        let cloud = Arc::new(SplatCloud::with_limit(config.max_packed_elements));
        let stream = self.inner.source.stream_into(path, cloud.clone());

        let stream_path = path.to_string();
        let mut task: JoinHandle<Result<(), SourceError>> = tokio::spawn(async move {
            let result = stream.await;
            if let Err(e) = &result {
                debug!(path = %stream_path, error = %e, "Packed stream ended with error");
            }
            result
        });

        let mut ticker = time::interval(config.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let wait = async {
            loop {
                if !cloud.is_empty() {
                    return Ok(());
                }
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = cloud.progressed() => {}
                    joined = &mut task => {
                        return match joined {
                            Ok(Ok(())) if !cloud.is_empty() => Ok(()),
                            Ok(Ok(())) => Err(PackedError::Empty),
                            Ok(Err(e)) => Err(PackedError::Source(e)),
                            Err(e) => Err(PackedError::Aborted(e.to_string())),
                        };
                    }
                }
            }
        };

        let timeout = config.packed_timeout();
        let outcome = time::timeout(timeout, wait).await;
        match outcome {
            // The stream keeps filling the cloud in the background.
            Ok(Ok(())) => Ok(cloud),
            Ok(Err(e)) => Err(e),
            Err(_) => {
                task.abort();
                Err(PackedError::Timeout(timeout))
            }
        }
    }

    fn set_status(&self, path: &str, state: LoadState) {
        self.lock_status().insert(path.to_string(), state);
    }

    fn lock_status(&self) -> std::sync::MutexGuard<'_, HashMap<String, LoadState>> {
        self.inner
            .status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
