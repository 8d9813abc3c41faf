// scene/mod.rs

pub mod bounds;
pub mod builder;
pub mod camera;
pub mod components;
pub mod model;
pub mod scene;
pub mod transform;

pub use bounds::{Aabb, Sphere};
pub use builder::EntityBuilder;
pub use camera::Camera;
pub use model::{Model, ModelNode, Primitive};
pub use scene::{Scene, SceneComponent};
pub use transform::Transform;

pub use components::{
    CameraComponent, Children, DirectionalLight, Enabled, EnvironmentComponent, ModelComponent,
    Name, Parent, ParticleBlend, ParticleEmitter, PointLight, SpotLight, TransformComponent,
};
