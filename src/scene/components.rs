// scene/components.rs
// Pure hecs components

use crate::asset::{Handle, Mesh};
use crate::environment::EnvironmentMaps;
use crate::renderer::Texture;
use crate::scene::{Camera, Model, Transform};
use glam::Vec3;

// ============================================================================
// Hierarchy Components
// ============================================================================

/// Local transform relative to the parent entity.
#[derive(Debug, Clone, Copy)]
pub struct TransformComponent(pub Transform);

/// Parent entity reference
#[derive(Debug, Clone, Copy)]
pub struct Parent(pub hecs::Entity);

/// Ordered list of children entities
#[derive(Debug, Clone, Default)]
pub struct Children(pub Vec<hecs::Entity>);

/// Disabled entities hide themselves and their whole subtree from rendering.
#[derive(Debug, Clone, Copy)]
pub struct Enabled(pub bool);

impl Default for Enabled {
    fn default() -> Self {
        Self(true)
    }
}

/// Name component for debugging
#[derive(Debug, Clone)]
pub struct Name(pub String);

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

// ============================================================================
// Rendering Components
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct CameraComponent(pub Camera);

#[derive(Debug, Clone, Copy)]
pub struct ModelComponent(pub Handle<Model>);

#[derive(Debug, Clone, Copy)]
pub struct EnvironmentComponent(pub EnvironmentMaps);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleBlend {
    Additive,
    Alpha,
}

/// GPU particle emitter. Simulation writes the point mesh elsewhere; the
/// renderer only draws `particle_count` points from it.
#[derive(Debug, Clone, Copy)]
pub struct ParticleEmitter {
    pub mesh: Handle<Mesh>,
    pub texture: Option<Handle<Texture>>,
    pub blend: ParticleBlend,
    pub particle_count: u32,
    pub particle_size: f32,
}

// ============================================================================
// Lighting Components
// ============================================================================

/// Point light component
#[derive(Debug, Clone, Copy)]
pub struct PointLight {
    pub color: Vec3,
    pub intensity: f32,
    pub range: f32,
}

/// Directional light component; shines along the entity's `-Z` axis.
#[derive(Debug, Clone, Copy)]
pub struct DirectionalLight {
    pub color: Vec3,
    pub intensity: f32,
}

/// Spot light component
#[derive(Debug, Clone, Copy)]
pub struct SpotLight {
    pub color: Vec3,
    pub intensity: f32,
    pub inner_angle: f32,
    pub outer_angle: f32,
    pub range: f32,
}
