//! Scene graph: static helpers plus at most one asset node

use glam::{Quat, Vec3};
use std::f32::consts::PI;
use std::sync::Arc;

use crate::asset::{Aabb, AssetHandle};
use crate::config::RenderConfig;

/// Stable identifier of a node within one graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn direction(self) -> Vec3 {
        match self {
            Axis::X => Vec3::X,
            Axis::Y => Vec3::Y,
            Axis::Z => Vec3::Z,
        }
    }

    /// Conventional helper color (X red, Y green, Z blue)
    pub fn color(self) -> [f32; 3] {
        match self {
            Axis::X => [1.0, 0.0, 0.0],
            Axis::Y => [0.0, 1.0, 0.0],
            Axis::Z => [0.0, 0.0, 1.0],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
        }
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    AmbientLight { color: [f32; 3], intensity: f32 },
    DirectionalLight { color: [f32; 3], intensity: f32 },
    AxesHelper { size: f32 },
    AxisLabel { axis: Axis },
    Asset(Arc<AssetHandle>),
}

/// Position and orientation of a node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl Pose {
    pub const IDENTITY: Pose = Pose {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn at(translation: Vec3) -> Self {
        Self {
            translation,
            rotation: Quat::IDENTITY,
        }
    }

    /// Assets are authored reversed: origin, half turn about the up axis
    pub fn canonical_asset() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::from_rotation_z(PI),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub id: NodeId,
    pub kind: NodeKind,
    pub pose: Pose,
}

impl SceneNode {
    pub fn asset(&self) -> Option<&Arc<AssetHandle>> {
        match &self.kind {
            NodeKind::Asset(handle) => Some(handle),
            _ => None,
        }
    }
}

/// Ordered renderable nodes
#[derive(Debug, Clone)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
    next_id: u64,
    asset: Option<NodeId>,
    background: [f32; 3],
}

impl SceneGraph {
    pub fn new(background: [f32; 3]) -> Self {
        Self {
            nodes: Vec::new(),
            next_id: 0,
            asset: None,
            background,
        }
    }

    /// Graph with the standard lights, axes helper and axis labels
    pub fn with_helpers(config: &RenderConfig) -> Self {
        let mut graph = Self::new(config.background);
        graph.add(
            NodeKind::AmbientLight {
                color: [1.0, 1.0, 1.0],
                intensity: 0.6,
            },
            Pose::IDENTITY,
        );
        graph.add(
            NodeKind::DirectionalLight {
                color: [1.0, 1.0, 1.0],
                intensity: 0.8,
            },
            Pose::at(Vec3::new(10.0, 10.0, 5.0)),
        );
        graph.add(
            NodeKind::AxesHelper {
                size: config.axes_size,
            },
            Pose::IDENTITY,
        );
        for axis in [Axis::X, Axis::Y, Axis::Z] {
            graph.add(
                NodeKind::AxisLabel { axis },
                Pose::at(axis.direction() * config.axes_size * 1.5),
            );
        }
        graph
    }

    pub fn background(&self) -> [f32; 3] {
        self.background
    }

    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Add a non-asset node. Assets go through [`set_asset`](Self::set_asset).
    pub fn add(&mut self, kind: NodeKind, pose: Pose) -> Option<NodeId> {
        if matches!(kind, NodeKind::Asset(_)) {
            return None;
        }
        Some(self.push(kind, pose))
    }

    pub fn asset_node(&self) -> Option<&SceneNode> {
        self.asset.and_then(|id| self.node(id))
    }

    pub fn asset_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.asset().is_some()).count()
    }

    /// Remove the current asset node, if any
    pub fn remove_asset(&mut self) -> Option<SceneNode> {
        let id = self.asset.take()?;
        let index = self.nodes.iter().position(|n| n.id == id)?;
        Some(self.nodes.remove(index))
    }

    /// Replace the asset slot; the previous asset node is removed first
    pub fn set_asset(&mut self, handle: Arc<AssetHandle>, pose: Pose) -> NodeId {
        self.remove_asset();
        let id = self.push(NodeKind::Asset(handle), pose);
        self.asset = Some(id);
        id
    }

    /// World-space bounds of the asset node
    pub fn asset_bounds(&self) -> Option<Aabb> {
        let node = self.asset_node()?;
        let local = node.asset()?.representation().bounds()?;
        Some(local.transformed(node.pose.rotation, node.pose.translation))
    }

    fn push(&mut self, kind: NodeKind, pose: Pose) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.push(SceneNode { id, kind, pose });
        id
    }
}
