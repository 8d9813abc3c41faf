//! View-frustum geometry: corner frusta for shadow fitting and plane sets for
//! culling. Clip space depth is `[0, 1]`.

use glam::{Mat4, Vec3, Vec4};

use crate::scene::{Aabb, Sphere};

/// NDC corners, near face first. Both faces wind the same way so corner `i`
/// and corner `i + 4` lie on the same edge.
const NDC_CORNERS: [Vec3; 8] = [
    Vec3::new(-1.0, -1.0, 0.0),
    Vec3::new(1.0, -1.0, 0.0),
    Vec3::new(1.0, 1.0, 0.0),
    Vec3::new(-1.0, 1.0, 0.0),
    Vec3::new(-1.0, -1.0, 1.0),
    Vec3::new(1.0, -1.0, 1.0),
    Vec3::new(1.0, 1.0, 1.0),
    Vec3::new(-1.0, 1.0, 1.0),
];

/// Eight world-space corners of a (possibly clipped) view volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    pub corners: [Vec3; 8],
}

impl Default for Frustum {
    fn default() -> Self {
        Self {
            corners: [Vec3::ZERO; 8],
        }
    }
}

impl Frustum {
    /// Corners of the volume a view-projection (or plain projection) maps to
    /// the clip cube.
    pub fn from_matrix(matrix: &Mat4) -> Self {
        let mut frustum = Self::default();
        frustum.set_from_matrix(matrix);
        frustum
    }

    pub fn set_from_matrix(&mut self, matrix: &Mat4) {
        let inverse = matrix.inverse();
        for (corner, ndc) in self.corners.iter_mut().zip(NDC_CORNERS) {
            *corner = inverse.project_point3(ndc);
        }
    }

    pub fn near_corners(&self) -> &[Vec3] {
        &self.corners[..4]
    }

    pub fn far_corners(&self) -> &[Vec3] {
        &self.corners[4..]
    }

    pub fn transform(&mut self, matrix: &Mat4) {
        for corner in &mut self.corners {
            *corner = matrix.transform_point3(*corner);
        }
    }

    pub fn transformed(&self, matrix: &Mat4) -> Self {
        let mut frustum = *self;
        frustum.transform(matrix);
        frustum
    }

    pub fn aabb(&self) -> Aabb {
        let mut aabb = Aabb::new(self.corners[0], self.corners[0]);
        for corner in &self.corners[1..] {
            aabb = aabb.expanded_to(*corner);
        }
        aabb
    }

    pub fn center(&self) -> Vec3 {
        self.corners.iter().copied().sum::<Vec3>() / 8.0
    }

    pub fn bounding_sphere(&self) -> Sphere {
        Sphere::from_points(&self.corners)
    }

    /// Writes into `out` the slice of this frustum between the depth fractions
    /// `near` and `far` (0 = near face, 1 = far face). Points along a side edge
    /// vary linearly in view depth, so interpolating the edges is exact for
    /// perspective and orthographic volumes alike.
    pub fn clip_z(&self, near: f32, far: f32, out: &mut Frustum) {
        for i in 0..4 {
            let a = self.corners[i];
            let b = self.corners[i + 4];
            out.corners[i] = a.lerp(b, near);
            out.corners[i + 4] = a.lerp(b, far);
        }
    }

    pub fn clipped_z(&self, near: f32, far: f32) -> Self {
        let mut out = Self::default();
        self.clip_z(near, far, &mut out);
        out
    }
}

/// Plane `normal . p + d = 0`; the normal points into the frustum.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Plane {
    pub normal: Vec3,
    pub d: f32,
}

impl Plane {
    fn from_vec4(v: Vec4) -> Self {
        let length = v.truncate().length();
        if length <= f32::EPSILON {
            return Self {
                normal: Vec3::ZERO,
                d: v.w,
            };
        }
        Self {
            normal: v.truncate() / length,
            d: v.w / length,
        }
    }

    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.d
    }
}

/// Six normalized planes: left, right, bottom, top, near, far.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrustumPlanes {
    pub planes: [Plane; 6],
}

impl FrustumPlanes {
    pub fn from_matrix(view_proj: &Mat4) -> Self {
        let r0 = view_proj.row(0);
        let r1 = view_proj.row(1);
        let r2 = view_proj.row(2);
        let r3 = view_proj.row(3);

        Self {
            planes: [
                Plane::from_vec4(r3 + r0),
                Plane::from_vec4(r3 - r0),
                Plane::from_vec4(r3 + r1),
                Plane::from_vec4(r3 - r1),
                Plane::from_vec4(r2),
                Plane::from_vec4(r3 - r2),
            ],
        }
    }

    /// Conservative test: false only when the box lies entirely behind one
    /// plane. Boxes near a frustum corner may be reported as intersecting.
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        self.planes.iter().all(|plane| {
            let positive = Vec3::select(plane.normal.cmpge(Vec3::ZERO), aabb.max, aabb.min);
            plane.signed_distance(positive) >= 0.0
        })
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.signed_distance(point) >= 0.0)
    }
}

/// Culling frustum of the active camera, refreshed once per frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct CameraFrustum {
    planes: FrustumPlanes,
    eye: Vec3,
}

impl CameraFrustum {
    pub fn new(view_proj: &Mat4, eye: Vec3) -> Self {
        let mut frustum = Self::default();
        frustum.update(view_proj, eye);
        frustum
    }

    pub fn update(&mut self, view_proj: &Mat4, eye: Vec3) {
        self.planes = FrustumPlanes::from_matrix(view_proj);
        self.eye = eye;
    }

    pub fn planes(&self) -> &FrustumPlanes {
        &self.planes
    }

    pub fn eye(&self) -> Vec3 {
        self.eye
    }

    /// A box around the camera always counts as visible, even when the near
    /// plane would cut it away.
    pub fn is_visible(&self, aabb: &Aabb) -> bool {
        aabb.contains_point(self.eye) || self.planes.intersects_aabb(aabb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera_view_proj() -> (Mat4, Vec3) {
        let eye = Vec3::new(0.0, 0.0, 5.0);
        let view = Mat4::look_at_rh(eye, Vec3::ZERO, Vec3::Y);
        let proj = Mat4::perspective_rh(60f32.to_radians(), 1.0, 0.1, 50.0);
        (proj * view, eye)
    }

    #[test]
    fn corners_lie_on_near_and_far_planes() {
        let proj = Mat4::perspective_rh(90f32.to_radians(), 1.0, 1.0, 10.0);
        let frustum = Frustum::from_matrix(&proj);
        for corner in frustum.near_corners() {
            assert!((corner.z + 1.0).abs() < 1e-4);
        }
        for corner in frustum.far_corners() {
            assert!((corner.z + 10.0).abs() < 1e-3);
            assert!((corner.x.abs() - 10.0).abs() < 1e-3);
        }
    }

    #[test]
    fn clip_z_interpolates_view_depth() {
        let proj = Mat4::perspective_rh(60f32.to_radians(), 1.5, 1.0, 11.0);
        let clipped = Frustum::from_matrix(&proj).clipped_z(0.5, 1.0);
        for corner in clipped.near_corners() {
            assert!((corner.z + 6.0).abs() < 1e-3);
        }
        for corner in clipped.far_corners() {
            assert!((corner.z + 11.0).abs() < 1e-3);
        }
    }

    #[test]
    fn orthographic_aabb_matches_bounds() {
        let ortho = Mat4::orthographic_rh(-2.0, 2.0, -1.0, 1.0, 0.0, 4.0);
        let aabb = Frustum::from_matrix(&ortho).aabb();
        assert!((aabb.min - Vec3::new(-2.0, -1.0, -4.0)).length() < 1e-4);
        assert!((aabb.max - Vec3::new(2.0, 1.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn planes_are_normalized_and_face_inward() {
        let (view_proj, _) = camera_view_proj();
        let planes = FrustumPlanes::from_matrix(&view_proj);
        for plane in &planes.planes {
            assert!((plane.normal.length() - 1.0).abs() < 1e-4);
        }
        assert!(planes.contains_point(Vec3::ZERO));
        assert!(!planes.contains_point(Vec3::new(0.0, 0.0, 10.0)));
    }

    #[test]
    fn culls_boxes_outside() {
        let (view_proj, eye) = camera_view_proj();
        let frustum = CameraFrustum::new(&view_proj, eye);
        let behind = Aabb::from_center_half_extents(Vec3::new(0.0, 0.0, 20.0), Vec3::ONE);
        let beside = Aabb::from_center_half_extents(Vec3::new(100.0, 0.0, 0.0), Vec3::ONE);
        let beyond = Aabb::from_center_half_extents(Vec3::new(0.0, 0.0, -80.0), Vec3::ONE);
        let inside = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::ONE);
        assert!(!frustum.is_visible(&behind));
        assert!(!frustum.is_visible(&beside));
        assert!(!frustum.is_visible(&beyond));
        assert!(frustum.is_visible(&inside));
    }

    #[test]
    fn box_around_eye_is_visible() {
        let (view_proj, eye) = camera_view_proj();
        let frustum = CameraFrustum::new(&view_proj, eye);
        let tiny = Aabb::from_center_half_extents(eye + Vec3::new(0.0, 0.0, 0.01), Vec3::splat(0.02));
        assert!(frustum.is_visible(&tiny));
    }
}
