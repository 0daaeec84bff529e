//! Per-frame mesh list and the render requests issued for it.

use crate::controller::CameraMatrices;
use crate::transform::Transform;
use crate::{Mat3, Mat4, Vec3};

/// Decides where the mesh at a given load index sits in the world.
pub trait PlacementStrategy {
    fn placement(&self, index: usize) -> Transform;
}

/// Mesh `i` is translated by `(i, i, i)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DiagonalPlacement;

impl PlacementStrategy for DiagonalPlacement {
    fn placement(&self, index: usize) -> Transform {
        Transform::from_translation(Vec3::splat(index as f32))
    }
}

/// Matrices and light for drawing one mesh this frame.
#[derive(Debug)]
pub struct RenderRequest<'a, M> {
    pub index: usize,
    pub mesh: &'a M,
    pub mvp: Mat4,
    /// World matrix: placement * base model.
    pub model: Mat4,
    pub view: Mat4,
    /// Upper 3x3 of view * model.
    pub mv3x3: Mat3,
    pub light_position: Vec3,
}

/// Loaded meshes in load order, plus how to place them.
///
/// Each mesh keeps the load index it was added with, so gaps left by skipped
/// meshes do not shift later placements.
pub struct FrameMeshStore<M> {
    meshes: Vec<(usize, M)>,
    placement: Box<dyn PlacementStrategy>,
    base_model: Mat4,
    light_position: Vec3,
}

impl<M> FrameMeshStore<M> {
    pub fn new(meshes: Vec<M>) -> Self {
        Self::with_placement(meshes, Box::new(DiagonalPlacement))
    }

    pub fn with_placement(meshes: Vec<M>, placement: Box<dyn PlacementStrategy>) -> Self {
        Self {
            meshes: meshes.into_iter().enumerate().collect(),
            placement,
            base_model: Mat4::IDENTITY,
            light_position: Vec3::new(0.0, 0.0, 4.0),
        }
    }

    pub fn with_light_position(mut self, light_position: Vec3) -> Self {
        self.light_position = light_position;
        self
    }

    /// Append a mesh at the load index after the last one.
    pub fn push(&mut self, mesh: M) {
        let index = self.meshes.last().map_or(0, |(last, _)| last + 1);
        self.meshes.push((index, mesh));
    }

    /// Append a mesh that sits at load index `index`. Indices must increase.
    pub fn push_at(&mut self, index: usize, mesh: M) {
        debug_assert!(self.meshes.last().is_none_or(|(last, _)| *last < index));
        self.meshes.push((index, mesh));
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn meshes(&self) -> impl Iterator<Item = &M> {
        self.meshes.iter().map(|(_, mesh)| mesh)
    }

    /// One request per mesh, in load order.
    pub fn render_requests<'a>(
        &'a self,
        camera: &'a CameraMatrices,
    ) -> impl Iterator<Item = RenderRequest<'a, M>> + 'a {
        let view_proj = camera.projection * camera.view;
        self.meshes.iter().map(move |(index, mesh)| {
            let index = *index;
            let translation = self.placement.placement(index).matrix();
            let model = translation * self.base_model;
            RenderRequest {
                index,
                mesh,
                mvp: view_proj * model,
                model,
                view: camera.view,
                mv3x3: Mat3::from_mat4(camera.view * model),
                light_position: self.light_position,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::CameraController;

    struct Fixed(Vec3);

    impl PlacementStrategy for Fixed {
        fn placement(&self, _index: usize) -> Transform {
            Transform::from_translation(self.0)
        }
    }

    #[test]
    fn diagonal_translation_per_index() {
        let store = FrameMeshStore::new(vec!["a", "b", "c"]);
        let camera = CameraMatrices {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
        };
        let origins: Vec<Vec3> = store
            .render_requests(&camera)
            .map(|r| r.model.transform_point3(Vec3::ZERO))
            .collect();
        assert_eq!(origins, vec![Vec3::ZERO, Vec3::ONE, Vec3::splat(2.0)]);
        let names: Vec<&str> = store.render_requests(&camera).map(|r| *r.mesh).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn mvp_is_projection_view_translation() {
        let camera = CameraController::default().matrices();
        let store = FrameMeshStore::new(vec![(), ()]);
        let second = store.render_requests(&camera).nth(1).unwrap();

        let expected = camera.projection * camera.view * Mat4::from_translation(Vec3::ONE);
        assert!(second.mvp.abs_diff_eq(expected, 1e-5));
        assert_eq!(second.view, camera.view);
        assert_eq!(second.light_position, Vec3::new(0.0, 0.0, 4.0));
        let mv = Mat3::from_mat4(camera.view * Mat4::from_translation(Vec3::ONE));
        assert!(second.mv3x3.abs_diff_eq(mv, 1e-6));
    }

    #[test]
    fn placement_is_pluggable() {
        let store = FrameMeshStore::with_placement(vec![1u8, 2u8], Box::new(Fixed(Vec3::X)))
            .with_light_position(Vec3::Y);
        let camera = CameraMatrices {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
        };
        for request in store.render_requests(&camera) {
            assert_eq!(request.model.transform_point3(Vec3::ZERO), Vec3::X);
            assert_eq!(request.light_position, Vec3::Y);
        }
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn skipped_load_index_keeps_later_placements() {
        let mut store = FrameMeshStore::new(Vec::new());
        store.push_at(0, "a");
        // Load index 1 failed and was never added.
        store.push_at(2, "c");
        store.push("d");
        let camera = CameraMatrices {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
        };
        let placed: Vec<(usize, Vec3)> = store
            .render_requests(&camera)
            .map(|r| (r.index, r.model.transform_point3(Vec3::ZERO)))
            .collect();
        assert_eq!(
            placed,
            vec![(0, Vec3::ZERO), (2, Vec3::splat(2.0)), (3, Vec3::splat(3.0))]
        );
        assert_eq!(store.meshes().copied().collect::<Vec<_>>(), vec!["a", "c", "d"]);
    }
}
