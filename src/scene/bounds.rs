use glam::{Mat4, Vec3};

/// Axis-aligned bounding box.
///
/// The default box is a single point at the origin (`min == max`), which is
/// what an empty scene reports as its bounds.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub const ZERO: Self = Self {
        min: Vec3::ZERO,
        max: Vec3::ZERO,
    };

    /// Builds a box from two opposite corners in any order.
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        let half = half_extents.abs();
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Smallest box enclosing every point, or `None` for an empty iterator.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Vec3>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        Some(iter.fold(Self::new(first, first), |aabb, p| aabb.expanded_to(p)))
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn expanded_to(&self, point: Vec3) -> Aabb {
        Aabb {
            min: self.min.min(point),
            max: self.max.max(point),
        }
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let (min, max) = (self.min, self.max);
        [
            Vec3::new(min.x, min.y, min.z),
            Vec3::new(max.x, min.y, min.z),
            Vec3::new(max.x, max.y, min.z),
            Vec3::new(min.x, max.y, min.z),
            Vec3::new(min.x, min.y, max.z),
            Vec3::new(max.x, min.y, max.z),
            Vec3::new(max.x, max.y, max.z),
            Vec3::new(min.x, max.y, max.z),
        ]
    }

    /// Bounds of this box after an affine transform (Arvo's method).
    pub fn transformed(&self, matrix: &Mat4) -> Aabb {
        let center = matrix.transform_point3(self.center());
        let half = self.half_extents();
        let extent = matrix.x_axis.truncate().abs() * half.x
            + matrix.y_axis.truncate().abs() * half.y
            + matrix.z_axis.truncate().abs() * half.z;
        Aabb {
            min: center - extent,
            max: center + extent,
        }
    }
}

/// Bounding sphere used to fit shadow cascades.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Sphere centred on the centroid of `points` reaching the farthest one.
    ///
    /// The centroid depends only on the shape of the point set, so the radius
    /// stays constant when the set is rotated.
    pub fn from_points(points: &[Vec3]) -> Self {
        if points.is_empty() {
            return Self::default();
        }
        let center = points.iter().copied().sum::<Vec3>() / points.len() as f32;
        let radius = points
            .iter()
            .map(|p| p.distance(center))
            .fold(0.0_f32, f32::max);
        Self { center, radius }
    }

    pub fn contains_point(&self, point: Vec3, epsilon: f32) -> bool {
        point.distance(self.center) <= self.radius + epsilon
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    #[test]
    fn default_box_is_zero_sized() {
        let aabb = Aabb::default();
        assert_eq!(aabb.min, aabb.max);
        assert_eq!(aabb.size(), Vec3::ZERO);
    }

    #[test]
    fn union_covers_both_boxes() {
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let b = Aabb::new(Vec3::splat(-2.0), Vec3::new(0.5, 0.5, 0.5));
        let u = a.union(&b);
        assert_eq!(u.min, Vec3::splat(-2.0));
        assert_eq!(u.max, Vec3::ONE);
    }

    #[test]
    fn transformed_box_encloses_every_transformed_corner() {
        let aabb = Aabb::new(Vec3::new(-1.0, 0.0, -2.0), Vec3::new(3.0, 1.0, 0.5));
        let matrix = Mat4::from_scale_rotation_translation(
            Vec3::new(2.0, 0.5, 1.0),
            Quat::from_euler(glam::EulerRot::XYZ, 0.3, 1.1, -0.7),
            Vec3::new(4.0, -2.0, 9.0),
        );
        let transformed = aabb.transformed(&matrix);
        for corner in aabb.corners() {
            let p = matrix.transform_point3(corner);
            assert!(p.cmpge(transformed.min - 1e-4).all(), "{p:?} below {transformed:?}");
            assert!(p.cmple(transformed.max + 1e-4).all(), "{p:?} above {transformed:?}");
        }
    }

    #[test]
    fn from_points_of_nothing_is_none() {
        assert!(Aabb::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn sphere_from_points_contains_all_points() {
        let points = [
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(-3.0, 2.0, 0.0),
            Vec3::new(0.0, 0.0, 5.0),
        ];
        let sphere = Sphere::from_points(&points);
        for p in points {
            assert!(sphere.contains_point(p, 1e-5));
        }
    }
}
