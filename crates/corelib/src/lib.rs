//! Core types: math re-exports, Transform, Camera, input and the frame mesh store.

pub use glam::{Mat3, Mat4, Quat, Vec2, Vec3, Vec4, vec3};

pub mod camera;
pub mod controller;
pub mod frame;
pub mod input;
pub mod transform;

pub use controller::{CameraConfig, CameraController, CameraMatrices, FovPolicy};
pub use frame::{DiagonalPlacement, FrameMeshStore, PlacementStrategy, RenderRequest};
pub use input::{InputFrame, InputState, Movement, MovementSet};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_transform_is_identity_matrix() {
        let t = transform::Transform::identity();
        assert_eq!(t.matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn translate_then_scale_matrix() {
        let t = transform::Transform::from_trs(
            vec3(1.0, 2.0, 3.0),
            Quat::IDENTITY,
            vec3(2.0, 2.0, 2.0),
        );
        // Last column holds the translation, the diagonal the scale.
        let m = t.matrix().to_cols_array();
        assert!((m[12] - 1.0).abs() < 1e-6);
        assert!((m[13] - 2.0).abs() < 1e-6);
        assert!((m[14] - 3.0).abs() < 1e-6);
        assert!((m[0] - 2.0).abs() < 1e-6);
        assert!((m[5] - 2.0).abs() < 1e-6);
        assert!((m[10] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn default_controller_pv_is_finite() {
        let pv = CameraController::default().camera().proj_view();
        let a = pv.to_cols_array();
        assert!(a.iter().all(|f| f.is_finite()));
    }
}
