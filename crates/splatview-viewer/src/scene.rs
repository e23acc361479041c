//! 3D scene management: mirrors the core scene graph into ECS entities

use bevy::asset::RenderAssetUsages;
use bevy::prelude::*;
use bevy::render::render_resource::PrimitiveTopology;
use std::sync::Arc;
use tracing::{debug, info};

use splatview_core::{lock_viewer, Axis, NodeKind, SplatCloud, SplatPoint};

use crate::app::{init_viewer, CoreViewer, ViewerSet};
use crate::bridge::CameraSnapshot;

pub struct ScenePlugin;

impl Plugin for ScenePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<AxisLabels>()
            .add_systems(Startup, setup_scene.after(init_viewer))
            .add_systems(Update, apply_snapshot.in_set(ViewerSet::Apply));
    }
}

/// Marker component for the main camera
#[derive(Component)]
pub struct MainCamera;

/// Marker for the displayed splat asset
#[derive(Component)]
pub struct SplatAsset;

/// Marker for the axes helper
#[derive(Component)]
pub struct AxesHelper;

#[derive(Debug, Clone)]
pub struct AxisLabel {
    pub text: &'static str,
    pub position: Vec3,
    pub color: Color,
}

/// World-space axis labels, drawn by the UI
#[derive(Resource, Default)]
pub struct AxisLabels(pub Vec<AxisLabel>);

/// What is currently spawned for the core's asset node
#[derive(Resource)]
pub struct ShownAsset {
    material: Handle<StandardMaterial>,
    cloud: Option<Arc<SplatCloud>>,
    entity: Option<Entity>,
    points: usize,
    background: [f32; 3],
}

fn srgb(color: [f32; 3]) -> Color {
    Color::srgb(color[0], color[1], color[2])
}

fn vertex_color(color: Color) -> [f32; 4] {
    let linear = color.to_linear();
    [linear.red, linear.green, linear.blue, linear.alpha]
}

/// Point-list mesh with per-vertex colors
pub fn point_cloud_mesh(points: &[SplatPoint]) -> Mesh {
    let positions: Vec<[f32; 3]> = points.iter().map(|p| p.position.to_array()).collect();
    let colors: Vec<[f32; 4]> = points
        .iter()
        .map(|p| vertex_color(Color::srgba_u8(p.color[0], p.color[1], p.color[2], p.color[3])))
        .collect();

    Mesh::new(PrimitiveTopology::PointList, RenderAssetUsages::default())
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
        .with_inserted_attribute(Mesh::ATTRIBUTE_COLOR, colors)
}

/// Three colored line segments from the origin along +X, +Y and +Z
pub fn axes_mesh(size: f32) -> Mesh {
    let mut positions = Vec::with_capacity(6);
    let mut colors = Vec::with_capacity(6);
    for axis in [Axis::X, Axis::Y, Axis::Z] {
        let color = vertex_color(srgb(axis.color()));
        positions.push([0.0, 0.0, 0.0]);
        positions.push((axis.direction() * size).to_array());
        colors.push(color);
        colors.push(color);
    }

    Mesh::new(PrimitiveTopology::LineList, RenderAssetUsages::default())
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
        .with_inserted_attribute(Mesh::ATTRIBUTE_COLOR, colors)
}

fn camera_transform(camera: &CameraSnapshot) -> Transform {
    Transform::from_translation(camera.eye).looking_at(camera.target, camera.up)
}

/// Spawn the camera and mirror the static nodes of the core scene graph
fn setup_scene(
    mut commands: Commands,
    core: Option<Res<CoreViewer>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut labels: ResMut<AxisLabels>,
) {
    let Some(core) = core else { return };
    let viewer = lock_viewer(&core.viewer);
    let camera = CameraSnapshot::from(viewer.camera());

    // ENU coordinate system: X=East, Y=North, Z=Up
    commands.spawn((
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            fov: camera.fov_y,
            near: camera.near,
            far: camera.far,
            ..default()
        }),
        camera_transform(&camera),
        MainCamera,
    ));

    let unlit = materials.add(StandardMaterial {
        base_color: Color::WHITE,
        unlit: true,
        ..default()
    });

    for node in viewer.scene().nodes() {
        match &node.kind {
            NodeKind::AmbientLight { color, intensity } => {
                commands.insert_resource(AmbientLight {
                    color: srgb(*color),
                    brightness: intensity * 500.0,
                    ..default()
                });
            }
            NodeKind::DirectionalLight { color, intensity } => {
                commands.spawn((
                    DirectionalLight {
                        color: srgb(*color),
                        illuminance: intensity * 10_000.0,
                        ..default()
                    },
                    Transform::from_translation(node.pose.translation)
                        .looking_at(Vec3::ZERO, Vec3::Z),
                ));
            }
            NodeKind::AxesHelper { size } => {
                commands.spawn((
                    Mesh3d(meshes.add(axes_mesh(*size))),
                    MeshMaterial3d(unlit.clone()),
                    Transform::from_translation(node.pose.translation)
                        .with_rotation(node.pose.rotation),
                    AxesHelper,
                ));
            }
            NodeKind::AxisLabel { axis } => {
                labels.0.push(AxisLabel {
                    text: axis.label(),
                    position: node.pose.translation,
                    color: srgb(axis.color()),
                });
            }
            // Asset nodes follow the per-frame snapshot
            NodeKind::Asset(_) => {}
        }
    }

    commands.insert_resource(ShownAsset {
        material: unlit,
        cloud: None,
        entity: None,
        points: 0,
        background: viewer.scene().background(),
    });
    info!(nodes = viewer.scene().nodes().len(), "Scene helpers spawned");
}

/// Apply the latest core frame to the camera, the asset entity and the
/// clear color
fn apply_snapshot(
    mut commands: Commands,
    core: Option<Res<CoreViewer>>,
    shown: Option<ResMut<ShownAsset>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut cameras: Query<(&mut Transform, &mut Projection), With<MainCamera>>,
    mut clear: ResMut<ClearColor>,
) {
    let (Some(core), Some(mut shown)) = (core, shown) else {
        return;
    };
    let snapshot = core.mailbox.lock();
    if snapshot.disposed {
        return;
    }

    if let Some(camera) = &snapshot.camera {
        for (mut transform, mut projection) in cameras.iter_mut() {
            *transform = camera_transform(camera);
            if let Projection::Perspective(perspective) = projection.as_mut() {
                perspective.fov = camera.fov_y;
                perspective.near = camera.near;
                perspective.far = camera.far;
            }
        }
    }

    if snapshot.background != shown.background {
        shown.background = snapshot.background;
        let [r, g, b] = snapshot.background;
        clear.0 = Color::linear_rgb(r, g, b);
    }

    let Some(asset) = &snapshot.asset else {
        if let Some(entity) = shown.entity.take() {
            commands.entity(entity).despawn();
            shown.cloud = None;
            shown.points = 0;
        }
        return;
    };

    let same_cloud = shown
        .cloud
        .as_ref()
        .is_some_and(|cloud| Arc::ptr_eq(cloud, &asset.cloud));
    let transform = Transform {
        translation: asset.translation,
        rotation: asset.rotation,
        ..default()
    };

    if !same_cloud {
        if let Some(entity) = shown.entity.take() {
            commands.entity(entity).despawn();
        }
        let points = asset.cloud.snapshot();
        let entity = commands
            .spawn((
                Mesh3d(meshes.add(point_cloud_mesh(&points))),
                MeshMaterial3d(shown.material.clone()),
                transform,
                SplatAsset,
            ))
            .id();
        debug!(path = %asset.path, points = points.len(), "Spawned splat asset");
        shown.entity = Some(entity);
        shown.cloud = Some(asset.cloud.clone());
        shown.points = points.len();
        return;
    }

    // Streamed clouds keep growing after they are first shown
    let len = asset.cloud.len();
    if len != shown.points {
        if let Some(entity) = shown.entity {
            let points = asset.cloud.snapshot();
            commands
                .entity(entity)
                .insert((Mesh3d(meshes.add(point_cloud_mesh(&points))), transform));
            shown.points = points.len();
        }
    }
}
