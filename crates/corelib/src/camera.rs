use crate::{Mat4, Vec3};

/// Free-look perspective camera: a position and a view direction.
///
/// Right-handed, OpenGL depth range. The renderer multiplies the projection by
/// `OPENGL_TO_WGPU` to get z in [0,1].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    /// Unit view direction.
    pub direction: Vec3,
    pub up: Vec3,
    /// Vertical field of view in degrees. Not validated: legacy zoom may pass zero or less.
    pub fov_deg: f32,
    pub aspect: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl Camera {
    #[inline]
    pub fn view(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.direction, self.up)
    }

    #[inline]
    pub fn proj(&self) -> Mat4 {
        Mat4::perspective_rh_gl(
            self.fov_deg.to_radians(),
            self.aspect.max(1e-6),
            self.z_near,
            self.z_far,
        )
    }

    #[inline]
    pub fn proj_view(&self) -> Mat4 {
        self.proj() * self.view()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera(fov_deg: f32) -> Camera {
        Camera {
            position: Vec3::new(0.0, 0.0, 5.0),
            direction: Vec3::NEG_Z,
            up: Vec3::Y,
            fov_deg,
            aspect: 4.0 / 3.0,
            z_near: 0.1,
            z_far: 100.0,
        }
    }

    #[test]
    fn origin_projects_to_screen_centre() {
        let clip = camera(45.0).proj_view() * Vec3::ZERO.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-6 && ndc.y.abs() < 1e-6);
        assert!(ndc.z > -1.0 && ndc.z < 1.0);
    }

    #[test]
    fn near_and_far_planes_map_to_gl_depth_range() {
        let cam = camera(45.0);
        let near = cam.proj() * Vec3::new(0.0, 0.0, -0.1).extend(1.0);
        let far = cam.proj() * Vec3::new(0.0, 0.0, -100.0).extend(1.0);
        assert!((near.z / near.w + 1.0).abs() < 1e-4);
        assert!((far.z / far.w - 1.0).abs() < 1e-4);
    }

    #[test]
    fn narrower_fov_magnifies() {
        let point = Vec3::new(1.0, 0.0, 0.0).extend(1.0);
        let wide = camera(60.0).proj_view() * point;
        let narrow = camera(20.0).proj_view() * point;
        assert!((narrow.x / narrow.w).abs() > (wide.x / wide.w).abs());
    }
}
