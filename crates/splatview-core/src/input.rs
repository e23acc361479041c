//! Normalized pointer input records
//!
//! Front ends translate their raw device events into these before handing
//! them to the camera controller.

use serde::{Deserialize, Serialize};

/// Which pointer button an event refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerButton {
    /// Left mouse button / primary touch
    Primary,
    /// Middle button
    Auxiliary,
    /// Right mouse button
    Secondary,
    Other(u16),
}

impl PointerButton {
    /// Map a DOM-style button index (0 = left, 1 = middle, 2 = right)
    pub fn from_index(index: u16) -> Self {
        match index {
            0 => PointerButton::Primary,
            1 => PointerButton::Auxiliary,
            2 => PointerButton::Secondary,
            other => PointerButton::Other(other),
        }
    }
}

/// Pointer position in container pixels, with the button that changed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub button: PointerButton,
    pub x: f32,
    pub y: f32,
}

impl PointerEvent {
    pub fn new(button: PointerButton, x: f32, y: f32) -> Self {
        Self { button, x, y }
    }
}

/// Wheel scroll, DOM sign convention: positive `delta_y` scrolls backward
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelEvent {
    pub delta_y: f32,
}

/// Container size in physical pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width over height, `None` for a collapsed surface
    pub fn aspect(&self) -> Option<f32> {
        if self.width == 0 || self.height == 0 {
            None
        } else {
            Some(self.width as f32 / self.height as f32)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_index_mapping() {
        assert_eq!(PointerButton::from_index(0), PointerButton::Primary);
        assert_eq!(PointerButton::from_index(1), PointerButton::Auxiliary);
        assert_eq!(PointerButton::from_index(2), PointerButton::Secondary);
        assert_eq!(PointerButton::from_index(4), PointerButton::Other(4));
    }

    #[test]
    fn test_collapsed_surface_has_no_aspect() {
        assert_eq!(SurfaceSize::new(800, 0).aspect(), None);
        assert_eq!(SurfaceSize::new(800, 400).aspect(), Some(2.0));
    }
}
