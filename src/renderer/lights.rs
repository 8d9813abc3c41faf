use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::scene::{DirectionalLight, PointLight, SpotLight};

pub const MAX_DIRECTIONAL_LIGHTS: usize = 4;
pub const MAX_POINT_LIGHTS: usize = 16;
pub const MAX_SPOT_LIGHTS: usize = 8;

/// Lights face down their local -Z axis.
fn world_direction(world: &Mat4) -> Vec3 {
    world
        .transform_vector3(Vec3::NEG_Z)
        .try_normalize()
        .unwrap_or(Vec3::NEG_Z)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DirectionalLightData {
    pub direction: Vec3,
    pub color: Vec3,
    pub intensity: f32,
}

impl DirectionalLightData {
    pub fn from_component(light: &DirectionalLight, world: &Mat4) -> Self {
        Self {
            direction: world_direction(world),
            color: light.color,
            intensity: light.intensity,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointLightData {
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    pub range: f32,
}

impl PointLightData {
    pub fn from_component(light: &PointLight, world: &Mat4) -> Self {
        Self {
            position: world.w_axis.truncate(),
            color: light.color,
            intensity: light.intensity,
            range: light.range,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpotLightData {
    pub position: Vec3,
    pub direction: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    pub range: f32,
    pub inner_angle: f32,
    pub outer_angle: f32,
}

impl SpotLightData {
    pub fn from_component(light: &SpotLight, world: &Mat4) -> Self {
        Self {
            position: world.w_axis.truncate(),
            direction: world_direction(world),
            color: light.color,
            intensity: light.intensity,
            range: light.range,
            inner_angle: light.inner_angle,
            outer_angle: light.outer_angle,
        }
    }
}

/// Lights in collection order. Cleared, not reallocated, between frames.
#[derive(Clone, Debug, Default)]
pub struct LightsData {
    directional: Vec<DirectionalLightData>,
    point: Vec<PointLightData>,
    spot: Vec<SpotLightData>,
}

impl LightsData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.directional.clear();
        self.point.clear();
        self.spot.clear();
    }

    pub fn add_directional(&mut self, light: DirectionalLightData) {
        self.directional.push(light);
    }

    pub fn add_point(&mut self, light: PointLightData) {
        self.point.push(light);
    }

    pub fn add_spot(&mut self, light: SpotLightData) {
        self.spot.push(light);
    }

    pub fn directional_lights(&self) -> &[DirectionalLightData] {
        &self.directional
    }

    pub fn point_lights(&self) -> &[PointLightData] {
        &self.point
    }

    pub fn spot_lights(&self) -> &[SpotLightData] {
        &self.spot
    }

    /// The light that casts the cascaded shadows.
    pub fn shadow_caster(&self) -> Option<&DirectionalLightData> {
        self.directional.first()
    }

    pub fn len(&self) -> usize {
        self.directional.len() + self.point.len() + self.spot.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct DirectionalLightRaw {
    pub direction: [f32; 4],
    pub color_intensity: [f32; 4],
}

impl DirectionalLightRaw {
    pub fn from_data(data: &DirectionalLightData) -> Self {
        Self {
            direction: data.direction.extend(0.0).to_array(),
            color_intensity: data.color.extend(data.intensity).to_array(),
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct PointLightRaw {
    pub position_range: [f32; 4],
    pub color_intensity: [f32; 4],
}

impl PointLightRaw {
    pub fn from_data(data: &PointLightData) -> Self {
        Self {
            position_range: data.position.extend(data.range).to_array(),
            color_intensity: data.color.extend(data.intensity).to_array(),
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct SpotLightRaw {
    pub position_range: [f32; 4],
    pub direction: [f32; 4],
    pub color_intensity: [f32; 4],
    pub cone_params: [f32; 4],
}

impl SpotLightRaw {
    pub fn from_data(data: &SpotLightData) -> Self {
        let inner = data.inner_angle.min(data.outer_angle);
        let outer = data.inner_angle.max(data.outer_angle);

        Self {
            position_range: data.position.extend(data.range).to_array(),
            direction: data.direction.extend(0.0).to_array(),
            color_intensity: data.color.extend(data.intensity).to_array(),
            cone_params: [inner.cos(), outer.cos(), 0.0, 0.0],
        }
    }
}

/// `Lights` uniform block. `counts` holds directional, point and spot counts.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct LightsUniform {
    pub counts: [u32; 4],
    pub directionals: [DirectionalLightRaw; MAX_DIRECTIONAL_LIGHTS],
    pub points: [PointLightRaw; MAX_POINT_LIGHTS],
    pub spots: [SpotLightRaw; MAX_SPOT_LIGHTS],
}

impl LightsUniform {
    pub fn from_data(data: &LightsData) -> Self {
        let mut uniform = Self::zeroed();

        uniform.counts[0] = fill(
            &mut uniform.directionals,
            data.directional_lights(),
            DirectionalLightRaw::from_data,
        );
        uniform.counts[1] = fill(&mut uniform.points, data.point_lights(), PointLightRaw::from_data);
        uniform.counts[2] = fill(&mut uniform.spots, data.spot_lights(), SpotLightRaw::from_data);

        let dropped = data.len() as u32 - uniform.counts.iter().sum::<u32>();
        if dropped > 0 {
            log::trace!("{dropped} lights exceed the uniform capacity and are ignored");
        }

        uniform
    }
}

fn fill<S, D>(dst: &mut [D], src: &[S], convert: impl Fn(&S) -> D) -> u32 {
    let count = src.len().min(dst.len());
    for (slot, light) in dst.iter_mut().zip(src) {
        *slot = convert(light);
    }
    count as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    #[test]
    fn directional_direction_follows_world_rotation() {
        let light = DirectionalLight {
            color: Vec3::ONE,
            intensity: 3.0,
        };
        let world = Mat4::from_quat(Quat::from_rotation_x(-std::f32::consts::FRAC_PI_2));
        let data = DirectionalLightData::from_component(&light, &world);
        assert!((data.direction - Vec3::NEG_Y).length() < 1e-5);
    }

    #[test]
    fn uniform_counts_are_capped() {
        let mut lights = LightsData::new();
        for i in 0..(MAX_POINT_LIGHTS + 3) {
            lights.add_point(PointLightData {
                position: Vec3::splat(i as f32),
                color: Vec3::ONE,
                intensity: 1.0,
                range: 5.0,
            });
        }
        let uniform = LightsUniform::from_data(&lights);
        assert_eq!(uniform.counts, [0, MAX_POINT_LIGHTS as u32, 0, 0]);
        assert_eq!(uniform.points[2].position_range, [2.0, 2.0, 2.0, 5.0]);
    }

    #[test]
    fn spot_cone_orders_angles() {
        let raw = SpotLightRaw::from_data(&SpotLightData {
            position: Vec3::ZERO,
            direction: Vec3::NEG_Z,
            color: Vec3::ONE,
            intensity: 1.0,
            range: 1.0,
            inner_angle: 0.6,
            outer_angle: 0.2,
        });
        assert!(raw.cone_params[0] > raw.cone_params[1]);
    }
}
