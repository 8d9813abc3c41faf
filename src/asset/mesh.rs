use glam::Vec3;

use crate::scene::Aabb;

/// GPU-resident geometry as seen by the renderer.
///
/// Vertex and index buffers live behind the graphics device; the renderer only
/// needs the local bounds for culling and the index count / topology for
/// issuing the draw.
#[derive(Clone, Debug, PartialEq)]
pub struct Mesh {
    pub label: String,
    pub bounds: Aabb,
    pub index_count: u32,
    pub topology: wgpu::PrimitiveTopology,
}

impl Mesh {
    pub fn new(label: impl Into<String>, bounds: Aabb, index_count: u32) -> Self {
        Self {
            label: label.into(),
            bounds,
            index_count,
            topology: wgpu::PrimitiveTopology::TriangleList,
        }
    }

    pub fn with_topology(mut self, topology: wgpu::PrimitiveTopology) -> Self {
        self.topology = topology;
        self
    }

    /// Unit cube centred on the origin (36 indices).
    pub fn cube(label: impl Into<String>) -> Self {
        Self::new(
            label,
            Aabb::from_center_half_extents(Vec3::ZERO, Vec3::splat(0.5)),
            36,
        )
    }

    /// Point list used by particle emitters; bounds are a single point.
    pub fn points(label: impl Into<String>, count: u32) -> Self {
        Self::new(label, Aabb::default(), count)
            .with_topology(wgpu::PrimitiveTopology::PointList)
    }
}
