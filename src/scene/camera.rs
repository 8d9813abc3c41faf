use glam::Mat4;

/// Perspective projection parameters; position and orientation come from the
/// owning entity's world transform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub fov_y_radians: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn new(fov_y_radians: f32, near: f32, far: f32) -> Self {
        Self {
            fov_y_radians,
            near,
            far,
        }
    }

    /// Right-handed projection with a `[0, 1]` clip-space depth range.
    pub fn proj(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_y_radians, aspect, self.near, self.far)
    }

    pub fn view_proj(&self, world: &Mat4, aspect: f32) -> Mat4 {
        self.proj(aspect) * world.inverse()
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            fov_y_radians: 60f32.to_radians(),
            near: 0.1,
            far: 100.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn view_proj_is_reasonable() {
        let cam = Camera::default();
        let world = Mat4::from_translation(Vec3::new(0.0, 0.0, 3.0));
        let vp = cam.view_proj(&world, 16.0 / 9.0);
        let inv = vp.inverse();
        let id = vp * inv;
        assert!(id.abs_diff_eq(Mat4::IDENTITY, 1e-4));
    }

    #[test]
    fn near_and_far_map_to_unit_depth_range() {
        let cam = Camera::new(1.0, 0.5, 50.0);
        let proj = cam.proj(1.0);
        let near = proj.project_point3(Vec3::new(0.0, 0.0, -0.5));
        let far = proj.project_point3(Vec3::new(0.0, 0.0, -50.0));
        assert!((near.z - 0.0).abs() < 1e-5);
        assert!((far.z - 1.0).abs() < 1e-5);
    }
}
