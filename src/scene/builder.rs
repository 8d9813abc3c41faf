// scene/builder.rs
// Fluent helper over hecs::EntityBuilder that also maintains the hierarchy.

use hecs::Entity;

use super::components::*;
use super::scene::Scene;
use crate::asset::Handle;
use crate::environment::EnvironmentMaps;
use crate::scene::{Camera, Model, Transform};

pub struct EntityBuilder<'s> {
    scene: &'s mut Scene,
    builder: hecs::EntityBuilder,
    parent: Option<Entity>,
}

impl<'s> EntityBuilder<'s> {
    pub fn new(scene: &'s mut Scene) -> Self {
        Self {
            scene,
            builder: hecs::EntityBuilder::new(),
            parent: None,
        }
    }

    /// Attach the new entity under `parent` instead of at the root.
    pub fn child_of(mut self, parent: Entity) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.builder.add(Name::new(name));
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.builder.add(TransformComponent(transform));
        self
    }

    pub fn with_camera(mut self, camera: Camera) -> Self {
        self.builder.add(CameraComponent(camera));
        self
    }

    pub fn with_model(mut self, model: Handle<Model>) -> Self {
        self.builder.add(ModelComponent(model));
        self
    }

    pub fn with_environment(mut self, maps: EnvironmentMaps) -> Self {
        self.builder.add(EnvironmentComponent(maps));
        self
    }

    pub fn with_directional_light(mut self, light: DirectionalLight) -> Self {
        self.builder.add(light);
        self
    }

    pub fn with_point_light(mut self, light: PointLight) -> Self {
        self.builder.add(light);
        self
    }

    pub fn with_spot_light(mut self, light: SpotLight) -> Self {
        self.builder.add(light);
        self
    }

    pub fn with_particle_emitter(mut self, emitter: ParticleEmitter) -> Self {
        self.builder.add(emitter);
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.builder.add(Enabled(enabled));
        self
    }

    pub fn spawn(mut self) -> Entity {
        if let Some(parent) = self.parent {
            self.builder.add(Parent(parent));
        }
        let entity = self.scene.world.spawn(self.builder.build());
        self.scene.attach(entity, self.parent);
        entity
    }
}
