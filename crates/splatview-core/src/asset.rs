//! Loaded asset representation and the process-wide asset cache

use glam::{Quat, Vec3};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::sync::Notify;

use crate::format::SplatPoint;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut aabb = Aabb {
            min: first,
            max: first,
        };
        for point in iter {
            aabb.min = aabb.min.min(point);
            aabb.max = aabb.max.max(point);
        }
        Some(aabb)
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn max_extent(&self) -> f32 {
        self.size().max_element()
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }

    /// Bounds of this box after rotation and translation
    pub fn transformed(&self, rotation: Quat, translation: Vec3) -> Aabb {
        let corners = self.corners().map(|c| rotation * c + translation);
        Aabb::from_points(corners).unwrap_or(*self)
    }
}

/// Append-only splat buffer shared between a loading stream and the scene.
///
/// A streamed load hands an `Arc<SplatCloud>` to the source and keeps
/// reading from it while elements arrive; the same `Arc` is what the cache
/// stores and the scene displays.
#[derive(Debug)]
pub struct SplatCloud {
    points: RwLock<Vec<SplatPoint>>,
    len: AtomicUsize,
    limit: Option<usize>,
    progress: Notify,
}

impl SplatCloud {
    pub fn new() -> Self {
        Self::build(None, Vec::new())
    }

    /// Cloud that silently drops elements beyond `limit`
    pub fn with_limit(limit: usize) -> Self {
        Self::build(Some(limit), Vec::new())
    }

    pub fn from_points(points: Vec<SplatPoint>) -> Self {
        Self::build(None, points)
    }

    fn build(limit: Option<usize>, points: Vec<SplatPoint>) -> Self {
        Self {
            len: AtomicUsize::new(points.len()),
            points: RwLock::new(points),
            limit,
            progress: Notify::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn is_full(&self) -> bool {
        self.limit.is_some_and(|limit| self.len() >= limit)
    }

    /// Append elements up to the limit; returns how many were accepted
    pub fn extend(&self, incoming: impl IntoIterator<Item = SplatPoint>) -> usize {
        let accepted = {
            let mut points = self.points.write().unwrap_or_else(PoisonError::into_inner);
            let room = self
                .limit
                .map_or(usize::MAX, |limit| limit.saturating_sub(points.len()));
            let before = points.len();
            points.extend(incoming.into_iter().take(room));
            self.len.store(points.len(), Ordering::Release);
            points.len() - before
        };
        if accepted > 0 {
            self.progress.notify_waiters();
        }
        accepted
    }

    /// Resolves on the next successful [`extend`](Self::extend)
    pub async fn progressed(&self) {
        self.progress.notified().await;
    }

    /// Copy of the current elements
    pub fn snapshot(&self) -> Vec<SplatPoint> {
        self.points
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Bounds of the elements loaded so far
    pub fn bounds(&self) -> Option<Aabb> {
        let points = self.points.read().unwrap_or_else(PoisonError::into_inner);
        Aabb::from_points(points.iter().map(|p| p.position))
    }
}

impl Default for SplatCloud {
    fn default() -> Self {
        Self::new()
    }
}

/// Lifecycle of a load for one path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Ready,
    Failed,
}

/// Which loading path produced a handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStrategy {
    /// Streamed, element-capped load
    Packed,
    /// Whole-body load used as fallback
    Direct,
}

/// A loaded asset keyed by its path
#[derive(Debug)]
pub struct AssetHandle {
    path: String,
    representation: Arc<SplatCloud>,
    state: LoadState,
    strategy: LoadStrategy,
}

impl AssetHandle {
    pub fn ready(path: &str, representation: Arc<SplatCloud>, strategy: LoadStrategy) -> Self {
        Self {
            path: path.to_string(),
            representation,
            state: LoadState::Ready,
            strategy,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn representation(&self) -> &Arc<SplatCloud> {
        &self.representation
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn strategy(&self) -> LoadStrategy {
        self.strategy
    }

    /// Whether two handles display the same representation instance
    pub fn same_representation(&self, other: &AssetHandle) -> bool {
        Arc::ptr_eq(&self.representation, &other.representation)
    }
}

/// Unbounded path -> handle map; entries live as long as the cache
#[derive(Debug, Default)]
pub struct AssetCache {
    entries: Mutex<HashMap<String, Arc<AssetHandle>>>,
}

impl AssetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<Arc<AssetHandle>> {
        self.lock().get(path).cloned()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.lock().contains_key(path)
    }

    /// Insert a ready handle. If the path is already cached the existing
    /// handle wins and is returned, so a path never maps to two handles.
    pub fn insert(&self, handle: AssetHandle) -> Arc<AssetHandle> {
        let mut entries = self.lock();
        entries
            .entry(handle.path.clone())
            .or_insert_with(|| Arc::new(handle))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<AssetHandle>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
