//! UI overlays using bevy_egui

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};
use std::collections::BTreeSet;

use splatview_core::{Overlay, SceneCatalog, SceneRequest};

use crate::app::CoreViewer;
use crate::loading::{CompanionViews, GenerateScene, LoadFeedback};
use crate::scene::{AxisLabels, MainCamera};

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<UiState>()
            .add_systems(EguiPrimaryContextPass, ui_system);
    }
}

/// Picker selection
#[derive(Resource, Default, Debug)]
pub struct UiState {
    pub scene: Option<String>,
    pub objects: BTreeSet<String>,
}

impl UiState {
    pub fn select_scene(&mut self, scene: &str) {
        if self.scene.as_deref() != Some(scene) {
            self.scene = Some(scene.to_string());
            self.objects.clear();
        }
    }

    /// The request the Generate button would send, if the selection is usable
    pub fn request(&self) -> Option<SceneRequest> {
        let scene = self.scene.as_ref()?;
        if self.objects.is_empty() {
            return None;
        }
        Some(SceneRequest::new(scene.clone(), self.objects.iter().cloned()))
    }
}

/// Grouped system parameters for the UI system
#[derive(SystemParam)]
pub struct UiParams<'w, 's> {
    pub contexts: EguiContexts<'w, 's>,
    pub core: Option<Res<'w, CoreViewer>>,
    pub state: ResMut<'w, UiState>,
    pub feedback: Res<'w, LoadFeedback>,
    pub views: Res<'w, CompanionViews>,
    pub labels: Res<'w, AxisLabels>,
    pub cameras: Query<'w, 's, (&'static Camera, &'static GlobalTransform), With<MainCamera>>,
    pub generate: MessageWriter<'w, GenerateScene>,
}

/// Text and whether it reports a failure
pub fn overlay_text(overlay: &Overlay) -> Option<(String, bool)> {
    match overlay {
        Overlay::None => None,
        Overlay::Loading { path } => Some((format!("Loading {path}..."), false)),
        Overlay::Placeholder { message } => Some((message.clone(), true)),
    }
}

/// Spinner text for the paths the observer hooks report as loading
pub fn busy_label(active: &[String]) -> Option<String> {
    match active {
        [] => None,
        [path] => Some(format!("Loading {path}")),
        [path, rest @ ..] => Some(format!("Loading {path} (+{} more)", rest.len())),
    }
}

fn to_color32(color: Color) -> egui::Color32 {
    let srgba = color.to_srgba();
    let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    egui::Color32::from_rgb(channel(srgba.red), channel(srgba.green), channel(srgba.blue))
}

fn ui_system(mut params: UiParams) {
    let Some(core) = params.core.as_deref().cloned() else {
        return;
    };
    let Ok(ctx) = params.contexts.ctx_mut() else { return };

    let active = params.feedback.active();
    catalog_panel(
        ctx,
        core.session.catalog(),
        &mut params.state,
        &active,
        &mut params.generate,
    );

    egui::TopBottomPanel::bottom("info_panel")
        .max_height(120.0)
        .show(ctx, |ui| {
            let views = params.views.current();
            if !views.is_empty() {
                ui.horizontal(|ui| {
                    for view in &views {
                        ui.label(egui::RichText::new(&view.name).strong());
                        ui.label(&view.path);
                        ui.separator();
                    }
                });
            }
            ui.horizontal(|ui| {
                match &params.feedback.last {
                    Some(report) => match &report.result {
                        Ok(summary) => ui.label(format!("Loaded {summary}")),
                        Err(e) => ui.colored_label(
                            egui::Color32::from_rgb(220, 90, 90),
                            format!("{}: {}", report.label, e),
                        ),
                    },
                    None => ui.label("No model loaded"),
                };
                ui.separator();
                ui.label("ENU: X=East, Y=North, Z=Up");
                ui.separator();
                ui.label("Left-drag to orbit | Right-drag to pan | Scroll to zoom");
            });
        });

    let overlay = core.mailbox.lock().overlay.clone();
    if let Some((text, failed)) = overlay_text(&overlay) {
        egui::Area::new(egui::Id::new("viewer_overlay"))
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .interactable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    if failed {
                        ui.colored_label(egui::Color32::from_rgb(220, 90, 90), text);
                    } else {
                        ui.spinner();
                        ui.label(text);
                    }
                });
            });
    }

    // Axis labels sit behind the panels
    if let Ok((camera, transform)) = params.cameras.single() {
        let painter = ctx.layer_painter(egui::LayerId::background());
        for label in &params.labels.0 {
            let Ok(pos) = camera.world_to_viewport(transform, label.position) else {
                continue;
            };
            painter.text(
                egui::pos2(pos.x, pos.y),
                egui::Align2::CENTER_CENTER,
                label.text,
                egui::FontId::proportional(16.0),
                to_color32(label.color),
            );
        }
    }
}

fn catalog_panel(
    ctx: &egui::Context,
    catalog: &SceneCatalog,
    state: &mut UiState,
    active: &[String],
    generate: &mut MessageWriter<GenerateScene>,
) {
    egui::SidePanel::left("catalog_panel")
        .default_width(220.0)
        .resizable(true)
        .show(ctx, |ui| {
            ui.heading("Scenes");
            ui.separator();

            if catalog.scenes.is_empty() {
                ui.label("No scenes in catalog");
                return;
            }

            egui::ScrollArea::vertical().show(ui, |ui| {
                for (id, entry) in &catalog.scenes {
                    let title = if entry.name.is_empty() { id.as_str() } else { entry.name.as_str() };
                    let selected = state.scene.as_deref() == Some(id.as_str());
                    if ui.radio(selected, title).clicked() {
                        state.select_scene(id);
                    }
                    if !entry.description.is_empty() {
                        ui.small(&entry.description);
                    }
                }

                let Some(entry) = state.scene.as_ref().and_then(|id| catalog.scene(id)) else {
                    return;
                };
                ui.add_space(8.0);
                ui.label(egui::RichText::new("Objects").strong());
                for object in entry.selectable_objects() {
                    let mut checked = state.objects.contains(object);
                    if ui.checkbox(&mut checked, object).changed() {
                        if checked {
                            state.objects.insert(object.to_string());
                        } else {
                            state.objects.remove(object);
                        }
                    }
                }

                ui.add_space(8.0);
                let request = state.request();
                let busy = busy_label(active);
                let enabled = request.is_some() && busy.is_none();
                ui.horizontal(|ui| {
                    let clicked = ui
                        .add_enabled(enabled, egui::Button::new("Generate"))
                        .clicked();
                    if let Some(text) = &busy {
                        ui.spinner();
                        ui.label(text);
                    }
                    if clicked {
                        if let Some(request) = request {
                            generate.write(GenerateScene(request));
                        }
                    }
                });
            });
        });
}
