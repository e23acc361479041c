//! Forward window input to the core viewer as normalized records

use bevy::input::mouse::MouseWheel;
use bevy::prelude::*;
use bevy::window::{CursorEntered, CursorLeft, CursorMoved, PrimaryWindow, WindowResized};
use bevy_egui::EguiContexts;

use splatview_core::{
    lock_viewer, PointerButton, PointerEvent, Renderer, SurfaceSize, Viewer, WheelEvent,
};

use crate::app::{CoreViewer, ViewerSet};

pub struct InputPlugin;

impl Plugin for InputPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (forward_pointer, forward_wheel, forward_resize).in_set(ViewerSet::Input),
        );
    }
}

pub fn map_button(button: MouseButton) -> PointerButton {
    match button {
        MouseButton::Left => PointerButton::Primary,
        MouseButton::Middle => PointerButton::Auxiliary,
        MouseButton::Right => PointerButton::Secondary,
        MouseButton::Back => PointerButton::Other(3),
        MouseButton::Forward => PointerButton::Other(4),
        MouseButton::Other(index) => PointerButton::Other(index),
    }
}

/// Scrolling up in Bevy is positive, which is a negative (zoom in) wheel delta
pub fn wheel_record(scroll_y: f32) -> WheelEvent {
    WheelEvent { delta_y: -scroll_y }
}

fn egui_wants_pointer(contexts: &mut EguiContexts) -> bool {
    contexts
        .ctx_mut()
        .map(|ctx| ctx.wants_pointer_input() || ctx.is_pointer_over_area())
        .unwrap_or(false)
}

/// Pointer input collected over one Bevy frame
#[derive(Debug, Default)]
pub struct PointerFrame {
    pub entered: bool,
    pub moves: Vec<Vec2>,
    pub pressed: Vec<MouseButton>,
    pub released: Vec<MouseButton>,
    pub left: bool,
    /// Cursor position at the end of the frame
    pub cursor: Option<Vec2>,
    /// egui owns the pointer
    pub blocked: bool,
}

/// Replay a frame into the core. Moves go first so a press lands on the
/// final cursor position and the next drag delta starts from there.
pub fn apply_pointer_frame<R: Renderer>(viewer: &mut Viewer<R>, frame: &PointerFrame) {
    if frame.entered {
        viewer.pointer_enter();
    }

    for position in &frame.moves {
        viewer.pointer_move(position.x, position.y);
    }

    // Presses that start on a panel stay with egui
    if !frame.blocked {
        if let Some(position) = frame.cursor.or_else(|| frame.moves.last().copied()) {
            for button in &frame.pressed {
                viewer.pointer_down(PointerEvent::new(map_button(*button), position.x, position.y));
            }
        }
    }

    // Releases always go through so a drag never gets stuck
    for button in &frame.released {
        viewer.pointer_up(map_button(*button));
    }

    if frame.left {
        viewer.pointer_leave();
    }
}

fn forward_pointer(
    core: Option<Res<CoreViewer>>,
    buttons: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut moved: MessageReader<CursorMoved>,
    mut entered: MessageReader<CursorEntered>,
    mut left: MessageReader<CursorLeft>,
    mut contexts: EguiContexts,
) {
    let Some(core) = core else { return };
    let frame = PointerFrame {
        entered: entered.read().count() > 0,
        moves: moved.read().map(|event| event.position).collect(),
        pressed: buttons.get_just_pressed().copied().collect(),
        released: buttons.get_just_released().copied().collect(),
        left: left.read().count() > 0,
        cursor: windows.single().ok().and_then(Window::cursor_position),
        blocked: egui_wants_pointer(&mut contexts),
    };
    let mut viewer = lock_viewer(&core.viewer);
    apply_pointer_frame(&mut *viewer, &frame);
}

fn forward_wheel(
    core: Option<Res<CoreViewer>>,
    mut wheel: MessageReader<MouseWheel>,
    mut contexts: EguiContexts,
) {
    let Some(core) = core else {
        wheel.clear();
        return;
    };
    if egui_wants_pointer(&mut contexts) {
        wheel.clear();
        return;
    }

    let mut viewer = lock_viewer(&core.viewer);
    for event in wheel.read() {
        viewer.wheel(wheel_record(event.y));
    }
}

fn forward_resize(
    core: Option<Res<CoreViewer>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut resized: MessageReader<WindowResized>,
) {
    let Some(core) = core else { return };
    // Only the latest size matters
    if resized.read().last().is_none() {
        return;
    }
    let Ok(window) = windows.single() else { return };

    let size = SurfaceSize::new(window.physical_width(), window.physical_height());
    lock_viewer(&core.viewer).resize(size);
}

#[cfg(test)]
mod tests {
    use super::*;
    use splatview_core::Interaction;

    fn build_core() -> CoreViewer {
        let options = crate::app::ViewerOptions {
            config: splatview_core::Config::default(),
            catalog: splatview_core::SceneCatalog::default(),
            initial: None,
        };
        let views = crate::loading::CompanionViews::default();
        let feedback = crate::loading::LoadFeedback::default();
        CoreViewer::build(
            &options,
            Some(SurfaceSize::new(800, 600)),
            feedback.observer(),
            views.sink(),
        )
        .unwrap()
    }

    #[test]
    fn test_press_after_moves_does_not_rotate() {
        let core = build_core();
        let mut viewer = lock_viewer(&core.viewer);
        let theta = viewer.controller().viewport().theta();

        apply_pointer_frame(
            &mut *viewer,
            &PointerFrame {
                moves: vec![Vec2::new(10.0, 10.0), Vec2::new(40.0, 10.0)],
                pressed: vec![MouseButton::Left],
                cursor: Some(Vec2::new(40.0, 10.0)),
                ..default()
            },
        );
        assert_eq!(viewer.controller().interaction(), Interaction::Orbiting);
        assert_eq!(viewer.controller().viewport().theta(), theta);

        // The next drag delta is measured from the press position
        apply_pointer_frame(
            &mut *viewer,
            &PointerFrame {
                moves: vec![Vec2::new(50.0, 10.0)],
                cursor: Some(Vec2::new(50.0, 10.0)),
                ..default()
            },
        );
        assert!((viewer.controller().viewport().theta() - (theta - 0.1)).abs() < 1e-5);
    }

    #[test]
    fn test_blocked_press_is_dropped_but_release_goes_through() {
        let core = build_core();
        let mut viewer = lock_viewer(&core.viewer);

        apply_pointer_frame(
            &mut *viewer,
            &PointerFrame {
                pressed: vec![MouseButton::Right],
                cursor: Some(Vec2::new(5.0, 5.0)),
                blocked: true,
                ..default()
            },
        );
        assert_eq!(viewer.controller().interaction(), Interaction::Idle);

        apply_pointer_frame(
            &mut *viewer,
            &PointerFrame {
                pressed: vec![MouseButton::Right],
                cursor: Some(Vec2::new(5.0, 5.0)),
                ..default()
            },
        );
        assert_eq!(viewer.controller().interaction(), Interaction::Panning);

        apply_pointer_frame(
            &mut *viewer,
            &PointerFrame {
                released: vec![MouseButton::Right],
                blocked: true,
                ..default()
            },
        );
        assert_eq!(viewer.controller().interaction(), Interaction::Idle);
    }

    #[test]
    fn test_button_mapping() {
        assert_eq!(map_button(MouseButton::Left), PointerButton::Primary);
        assert_eq!(map_button(MouseButton::Right), PointerButton::Secondary);
        assert_eq!(map_button(MouseButton::Middle), PointerButton::Auxiliary);
        assert_eq!(map_button(MouseButton::Other(7)), PointerButton::Other(7));
    }

    #[test]
    fn test_scroll_up_zooms_in() {
        assert!(wheel_record(1.0).delta_y < 0.0);
        assert!(wheel_record(-2.0).delta_y > 0.0);
        assert_eq!(wheel_record(0.0).delta_y, 0.0);
    }
}
