//! First-person free-look camera driven by mouse motion, scroll and WASD.

use std::f32::consts::FRAC_PI_2;

use crate::camera::Camera;
use crate::input::{InputFrame, Movement};
use crate::{Mat4, Vec3};

/// Initial yaw, roughly looking down -Z. Deliberately `3.14`, not `PI`.
#[allow(clippy::approx_constant)]
pub const INITIAL_YAW: f32 = 3.14;

/// How the scroll-derived field of view is bounded.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FovPolicy {
    /// `initial - step * scroll`, unbounded. Large scroll reaches zero or negative fov.
    Legacy,
    /// Same formula, clamped to `[min_deg, max_deg]`.
    Clamped { min_deg: f32, max_deg: f32 },
}

impl Default for FovPolicy {
    fn default() -> Self {
        FovPolicy::Clamped {
            min_deg: 1.0,
            max_deg: 120.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraConfig {
    /// Units per second.
    pub speed: f32,
    pub mouse_sensitivity: f32,
    pub initial_fov_deg: f32,
    /// Degrees of fov per scroll unit.
    pub zoom_step_deg: f32,
    pub aspect: f32,
    pub z_near: f32,
    pub z_far: f32,
    pub fov_policy: FovPolicy,
    pub initial_position: Vec3,
    pub initial_horizontal_angle: f32,
    pub initial_vertical_angle: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            speed: 3.0,
            mouse_sensitivity: 0.1,
            initial_fov_deg: 45.0,
            zoom_step_deg: 5.0,
            aspect: 4.0 / 3.0,
            z_near: 0.1,
            z_far: 100.0,
            fov_policy: FovPolicy::default(),
            initial_position: Vec3::new(0.0, 0.0, 5.0),
            initial_horizontal_angle: INITIAL_YAW,
            initial_vertical_angle: 0.0,
        }
    }
}

/// Numeric camera state mutated by input.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraState {
    pub position: Vec3,
    /// Yaw in radians.
    pub horizontal_angle: f32,
    /// Pitch in radians.
    pub vertical_angle: f32,
    pub fov_deg: f32,
}

/// Orientation vectors derived from the angles.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraBasis {
    pub right: Vec3,
    pub direction: Vec3,
    pub up: Vec3,
}

impl CameraBasis {
    pub fn from_angles(horizontal: f32, vertical: f32) -> Self {
        let right = Vec3::new(
            (horizontal - FRAC_PI_2).sin(),
            0.0,
            (horizontal - FRAC_PI_2).cos(),
        );
        let direction = Vec3::new(
            vertical.cos() * horizontal.sin(),
            vertical.sin(),
            vertical.cos() * horizontal.cos(),
        );
        Self {
            right,
            direction,
            up: right.cross(direction),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraMatrices {
    pub view: Mat4,
    pub projection: Mat4,
}

#[derive(Clone, Debug)]
pub struct CameraController {
    config: CameraConfig,
    state: CameraState,
    basis: CameraBasis,
}

impl CameraController {
    pub fn new(config: CameraConfig) -> Self {
        let state = CameraState {
            position: config.initial_position,
            horizontal_angle: config.initial_horizontal_angle,
            vertical_angle: config.initial_vertical_angle,
            fov_deg: config.initial_fov_deg,
        };
        Self {
            basis: CameraBasis::from_angles(state.horizontal_angle, state.vertical_angle),
            config,
            state,
        }
    }

    #[inline]
    pub fn state(&self) -> &CameraState {
        &self.state
    }

    #[inline]
    pub fn basis(&self) -> &CameraBasis {
        &self.basis
    }

    /// Field of view for a cumulative scroll value under the configured policy.
    pub fn fov_for_scroll(&self, scroll: f32) -> f32 {
        let fov = self.config.initial_fov_deg - self.config.zoom_step_deg * scroll;
        match self.config.fov_policy {
            FovPolicy::Legacy => fov,
            FovPolicy::Clamped { min_deg, max_deg } => fov.clamp(min_deg, max_deg),
        }
    }

    /// Advance by `dt` seconds and return the new view/projection matrices.
    pub fn tick(&mut self, dt: f32, input: &InputFrame) -> CameraMatrices {
        let turn = self.config.mouse_sensitivity * dt;
        self.state.horizontal_angle -= turn * input.mouse_delta.x;
        self.state.vertical_angle -= turn * input.mouse_delta.y;

        self.basis = CameraBasis::from_angles(self.state.horizontal_angle, self.state.vertical_angle);
        self.state.fov_deg = self.fov_for_scroll(input.scroll);

        if !input.movements.is_empty() {
            let step = dt * self.config.speed;
            let CameraBasis {
                right, direction, ..
            } = self.basis;
            // Not normalised: diagonals are faster than a single axis.
            for movement in input.movements.iter() {
                self.state.position += match movement {
                    Movement::Left => -right * step,
                    Movement::Right => right * step,
                    Movement::Forward => direction * step,
                    Movement::Backward => -direction * step,
                };
            }
        }

        self.matrices()
    }

    /// Camera for the current state.
    pub fn camera(&self) -> Camera {
        Camera {
            position: self.state.position,
            direction: self.basis.direction,
            up: self.basis.up,
            fov_deg: self.state.fov_deg,
            aspect: self.config.aspect,
            z_near: self.config.z_near,
            z_far: self.config.z_far,
        }
    }

    pub fn matrices(&self) -> CameraMatrices {
        let camera = self.camera();
        CameraMatrices {
            view: camera.view(),
            projection: camera.proj(),
        }
    }
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new(CameraConfig::default())
    }
}
