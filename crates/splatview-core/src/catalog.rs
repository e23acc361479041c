//! Scene catalog: which asset and companion views belong to a selection
//!
//! ```toml
//! [scenes.scene_01]
//! name = "Scene 01"
//! description = "Urban road"
//!
//! [scenes.scene_01.objects.motor]
//! asset = "spz/motor_scene.splat"
//! views = [
//!     { name = "FRONT_LEFT", path = "videos/motor_fl.mp4" },
//!     { name = "FRONT", path = "videos/motor_f.mp4" },
//!     { name = "FRONT_RIGHT", path = "videos/motor_fr.mp4" },
//! ]
//! ```
//!
//! Object keys are either a single object id or a comma-joined combination.
//! Combination keys are normalized to sorted order on load, so lookups do
//! not depend on the order objects were listed or selected in.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

use crate::error::CatalogError;

/// A camera view played alongside the 3D scene
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanionView {
    pub name: String,
    pub path: String,
}

/// What a scene shows for one object selection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogObject {
    #[serde(default)]
    pub asset: Option<String>,
    /// Thumbnail for the picker
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub views: Vec<CompanionView>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub objects: BTreeMap<String, CatalogObject>,
}

impl SceneEntry {
    /// Objects that can be picked individually (keys that are not combinations)
    pub fn selectable_objects(&self) -> Vec<&str> {
        self.objects
            .keys()
            .filter(|key| !key.contains(','))
            .map(String::as_str)
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneCatalog {
    #[serde(default)]
    pub scenes: BTreeMap<String, SceneEntry>,
}

/// "Scene generation requested": a scene plus the selected objects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneRequest {
    pub scene: String,
    pub objects: Vec<String>,
}

impl SceneRequest {
    pub fn new(scene: impl Into<String>, objects: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            scene: scene.into(),
            objects: objects.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a comma separated object list, e.g. `"motor,car_benz"`
    pub fn parse(scene: impl Into<String>, objects: &str) -> Self {
        Self::new(
            scene,
            objects
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty()),
        )
    }

    /// Catalog key of the selection: object ids sorted and joined with `,`
    pub fn object_key(&self) -> String {
        let mut objects: Vec<&str> = self.objects.iter().map(String::as_str).collect();
        objects.sort_unstable();
        objects.dedup();
        objects.join(",")
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

fn normalize_key(key: &str) -> String {
    let mut parts: Vec<&str> = key
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    parts.sort_unstable();
    parts.dedup();
    parts.join(",")
}

impl FromStr for SceneCatalog {
    type Err = CatalogError;

    fn from_str(content: &str) -> Result<Self, Self::Err> {
        let mut catalog: SceneCatalog = toml::from_str(content)?;
        catalog.normalize();
        Ok(catalog)
    }
}

impl SceneCatalog {
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        let catalog: SceneCatalog = content.parse()?;
        info!(
            path = %path.display(),
            scenes = catalog.scenes.len(),
            "Loaded scene catalog"
        );
        Ok(catalog)
    }

    pub fn scene(&self, id: &str) -> Option<&SceneEntry> {
        self.scenes.get(id)
    }

    pub fn scene_ids(&self) -> impl Iterator<Item = &str> {
        self.scenes.keys().map(String::as_str)
    }

    pub fn resolve(&self, request: &SceneRequest) -> Option<&CatalogObject> {
        self.scenes
            .get(&request.scene)?
            .objects
            .get(&request.object_key())
    }

    pub fn asset_path(&self, request: &SceneRequest) -> Option<&str> {
        self.resolve(request)?.asset.as_deref()
    }

    pub fn views(&self, request: &SceneRequest) -> Option<&[CompanionView]> {
        self.resolve(request).map(|o| o.views.as_slice())
    }

    fn normalize(&mut self) {
        for (scene_id, scene) in self.scenes.iter_mut() {
            let objects = std::mem::take(&mut scene.objects);
            for (key, object) in objects {
                let normalized = normalize_key(&key);
                if scene.objects.contains_key(&normalized) {
                    warn!(scene = %scene_id, key = %key, "Duplicate catalog object key, keeping first");
                    continue;
                }
                scene.objects.insert(normalized, object);
            }
        }
    }
}

/// Load the catalog, falling back to an empty one if the file is missing
pub fn load_catalog(path: &Path) -> Result<SceneCatalog, CatalogError> {
    if path.exists() {
        SceneCatalog::from_file(path)
    } else {
        info!(path = %path.display(), "Scene catalog not found, starting empty");
        Ok(SceneCatalog::default())
    }
}
