//! Camera controls and orbit navigation
//!
//! The camera always looks at the world origin. Its position is kept in
//! spherical form around that origin (Z up); pointer drags orbit or pan,
//! the wheel scales the radius.

use glam::{Vec2, Vec3};
use std::f32::consts::{FRAC_PI_2, PI};
use tracing::{trace, warn};

use crate::config::CameraConfig;
use crate::input::{PointerButton, PointerEvent, SurfaceSize, WheelEvent};

/// World up axis
pub const WORLD_UP: Vec3 = Vec3::Z;

/// Fixed look-at point
pub const LOOK_AT: Vec3 = Vec3::ZERO;

/// Spherical camera state around [`LOOK_AT`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    radius: f32,
    /// Azimuth around +Z, measured from +X
    theta: f32,
    /// Polar angle from +Z, clamped to [pole_margin, PI - pole_margin]
    phi: f32,
    pole_margin: f32,
}

impl Viewport {
    pub fn new(radius: f32, theta: f32, phi: f32, pole_margin: f32) -> Self {
        let mut viewport = Self {
            radius,
            theta,
            phi,
            pole_margin,
        };
        viewport.phi = viewport.clamp_phi(phi);
        viewport
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn theta(&self) -> f32 {
        self.theta
    }

    pub fn phi(&self) -> f32 {
        self.phi
    }

    /// Cartesian eye position derived from the spherical triple
    pub fn position(&self) -> Vec3 {
        let (sin_phi, cos_phi) = self.phi.sin_cos();
        let (sin_theta, cos_theta) = self.theta.sin_cos();
        Vec3::new(
            self.radius * sin_phi * cos_theta,
            self.radius * sin_phi * sin_theta,
            self.radius * cos_phi,
        )
    }

    /// Re-derive the spherical triple from a cartesian eye position
    pub fn set_position(&mut self, position: Vec3) {
        let radius = position.length();
        self.radius = radius;
        if radius > 0.0 {
            self.theta = position.y.atan2(position.x);
            self.phi = self.clamp_phi((position.z / radius).clamp(-1.0, 1.0).acos());
        }
    }

    pub fn rotate(&mut self, d_theta: f32, d_phi: f32) {
        self.theta += d_theta;
        self.phi = self.clamp_phi(self.phi + d_phi);
    }

    pub fn scale_radius(&mut self, factor: f32) {
        self.radius *= factor;
    }

    fn clamp_phi(&self, phi: f32) -> f32 {
        phi.clamp(self.pole_margin, PI - self.pole_margin)
    }
}

/// Perspective camera whose eye is given by a [`Viewport`]
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub viewport: Viewport,
    pub aspect: f32,
    /// Vertical field of view, radians
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn position(&self) -> Vec3 {
        self.viewport.position()
    }

    pub fn target(&self) -> Vec3 {
        LOOK_AT
    }

    pub fn up(&self) -> Vec3 {
        WORLD_UP
    }

    /// Unit vector from the eye toward the look-at point
    pub fn forward(&self) -> Vec3 {
        (LOOK_AT - self.position()).normalize_or_zero()
    }
}

/// Pointer interaction mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interaction {
    #[default]
    Idle,
    Orbiting,
    Panning,
}

impl Interaction {
    fn button(self) -> Option<PointerButton> {
        match self {
            Interaction::Idle => None,
            Interaction::Orbiting => Some(PointerButton::Primary),
            Interaction::Panning => Some(PointerButton::Secondary),
        }
    }
}

/// Pointer tracking state
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerState {
    pub interaction: Interaction,
    /// Coordinates of the previous pointer event
    pub last: Vec2,
}

/// Turns pointer input into camera motion
#[derive(Debug, Clone)]
pub struct CameraController {
    camera: Camera,
    pointer: PointerState,
    orbit_speed: f32,
    pan_speed: f32,
    zoom_step: f32,
}

impl CameraController {
    pub fn new(config: &CameraConfig, surface: SurfaceSize) -> Self {
        let viewport = Viewport::new(
            config.initial_radius,
            config.initial_theta,
            config.initial_phi,
            config.pole_margin,
        );
        Self {
            camera: Camera {
                viewport,
                aspect: surface.aspect().unwrap_or(1.0),
                fov_y: config.fov_degrees.to_radians(),
                near: config.near,
                far: config.far,
            },
            pointer: PointerState::default(),
            orbit_speed: config.orbit_speed,
            pan_speed: config.pan_speed,
            zoom_step: config.zoom_step,
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn viewport(&self) -> &Viewport {
        &self.camera.viewport
    }

    pub fn pointer(&self) -> &PointerState {
        &self.pointer
    }

    pub fn interaction(&self) -> Interaction {
        self.pointer.interaction
    }

    /// True while the secondary button drives a pan; the host should
    /// swallow its native context menu.
    pub fn suppresses_context_menu(&self) -> bool {
        self.pointer.interaction == Interaction::Panning
    }

    pub fn pointer_down(&mut self, event: PointerEvent) {
        if self.pointer.interaction == Interaction::Idle {
            self.pointer.interaction = match event.button {
                PointerButton::Primary => Interaction::Orbiting,
                PointerButton::Secondary => Interaction::Panning,
                _ => Interaction::Idle,
            };
        }
        self.pointer.last = Vec2::new(event.x, event.y);
        trace!(interaction = ?self.pointer.interaction, "Pointer down");
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        let current = Vec2::new(x, y);
        let delta = current - self.pointer.last;
        self.pointer.last = current;

        match self.pointer.interaction {
            Interaction::Idle => {}
            Interaction::Orbiting => self.orbit(delta),
            Interaction::Panning => self.pan(delta),
        }
    }

    pub fn pointer_up(&mut self, button: PointerButton) {
        if self.pointer.interaction.button() == Some(button) {
            self.pointer.interaction = Interaction::Idle;
        }
    }

    pub fn pointer_leave(&mut self) {
        self.pointer.interaction = Interaction::Idle;
    }

    pub fn pointer_enter(&mut self) {
        trace!("Pointer entered container");
    }

    /// Scroll forward (negative delta) moves closer, backward moves away
    pub fn wheel(&mut self, event: WheelEvent) {
        let direction = if event.delta_y > 0.0 {
            1.0
        } else if event.delta_y < 0.0 {
            -1.0
        } else {
            return;
        };
        let mut next = self.camera.viewport;
        next.scale_radius(1.0 + direction * self.zoom_step);
        self.commit(next);
    }

    /// Match the projection to a new container size. Returns false for a
    /// collapsed container, which leaves the aspect untouched.
    pub fn resize(&mut self, size: SurfaceSize) -> bool {
        match size.aspect() {
            Some(aspect) => {
                self.camera.aspect = aspect;
                true
            }
            None => false,
        }
    }

    /// Place the eye at (0, -radius, 0), facing the origin
    pub fn frame_at(&mut self, radius: f32) {
        let next = Viewport::new(
            radius,
            -FRAC_PI_2,
            FRAC_PI_2,
            self.camera.viewport.pole_margin,
        );
        self.commit(next);
    }

    fn orbit(&mut self, delta: Vec2) {
        let mut next = self.camera.viewport;
        next.rotate(-delta.x * self.orbit_speed, delta.y * self.orbit_speed);
        self.commit(next);
    }

    // Moves the eye in the camera plane; the look-at point stays at the origin.
    fn pan(&mut self, delta: Vec2) {
        let eye = self.camera.position();
        let forward = self.camera.forward();
        let right = forward.cross(WORLD_UP).normalize_or_zero();
        let up = right.cross(forward).normalize_or_zero();

        let moved = eye + right * (-delta.x * self.pan_speed) + up * (-delta.y * self.pan_speed);

        let mut next = self.camera.viewport;
        next.set_position(moved);
        self.commit(next);
    }

    fn commit(&mut self, next: Viewport) {
        if next.radius.is_finite() && next.radius > 0.0 && next.position().is_finite() {
            self.camera.viewport = next;
        } else {
            warn!(radius = next.radius, "Rejected degenerate camera state");
        }
    }
}
