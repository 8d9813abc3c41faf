use glam::Mat4;
use hecs::{Entity, World};

use super::builder::EntityBuilder;
use super::components::*;
use crate::asset::{Assets, Handle, Mesh};
use crate::environment::EnvironmentMaps;
use crate::scene::{Camera, Model, Transform};

/// One renderable component found while walking the scene graph.
#[derive(Debug, Clone, Copy)]
pub enum SceneComponent<'a> {
    Camera(&'a Camera),
    Environment(&'a EnvironmentMaps),
    DirectionalLight(&'a DirectionalLight),
    PointLight(&'a PointLight),
    SpotLight(&'a SpotLight),
    Model(Handle<Model>),
    ParticleEmitter(&'a ParticleEmitter),
}

pub struct Scene {
    pub world: World,
    pub assets: Assets,
    roots: Vec<Entity>,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            world: World::new(),
            assets: Assets::default(),
            roots: Vec::new(),
        }
    }

    /// Starts building an entity; call `spawn` on the builder to insert it.
    pub fn entity(&mut self) -> EntityBuilder<'_> {
        EntityBuilder::new(self)
    }

    pub fn add_mesh(&mut self, mesh: Mesh) -> Handle<Mesh> {
        self.assets.meshes.insert(mesh)
    }

    pub fn add_model(&mut self, model: Model) -> Handle<Model> {
        self.assets.models.insert(model)
    }

    /// Root entities in insertion order.
    pub fn roots(&self) -> &[Entity] {
        &self.roots
    }

    pub(crate) fn attach(&mut self, entity: Entity, parent: Option<Entity>) {
        let Some(parent) = parent.filter(|p| self.world.contains(*p)) else {
            self.roots.push(entity);
            return;
        };

        if let Ok(mut children) = self.world.get::<&mut Children>(parent) {
            children.0.push(entity);
            return;
        }
        if let Err(err) = self.world.insert_one(parent, Children(vec![entity])) {
            log::error!("Failed to attach {:?} to {:?}: {:?}", entity, parent, err);
            self.roots.push(entity);
        }
    }

    pub fn set_enabled(&mut self, entity: Entity, enabled: bool) -> bool {
        if let Ok(mut flag) = self.world.get::<&mut Enabled>(entity) {
            flag.0 = enabled;
            return true;
        }
        self.world.insert_one(entity, Enabled(enabled)).is_ok()
    }

    pub fn is_enabled(&self, entity: Entity) -> bool {
        self.world
            .get::<&Enabled>(entity)
            .map(|flag| flag.0)
            .unwrap_or(true)
    }

    pub fn set_transform(&mut self, entity: Entity, transform: Transform) -> bool {
        if let Ok(mut local) = self.world.get::<&mut TransformComponent>(entity) {
            local.0 = transform;
            return true;
        }
        self.world
            .insert_one(entity, TransformComponent(transform))
            .is_ok()
    }

    /// Depth-first walk over enabled entities, parents before children and
    /// siblings in insertion order. `visit` receives the entity's world matrix
    /// once per renderable component. Disabled entities prune their subtree.
    pub fn traverse<F>(&self, visit: F)
    where
        F: FnMut(&Mat4, SceneComponent<'_>),
    {
        self.traverse_with(&mut Vec::new(), visit);
    }

    /// Same walk as [`Scene::traverse`], using `stack` as scratch space so a
    /// caller walking every frame keeps its allocation.
    pub fn traverse_with<F>(&self, stack: &mut Vec<(Entity, Mat4)>, mut visit: F)
    where
        F: FnMut(&Mat4, SceneComponent<'_>),
    {
        stack.clear();
        stack.extend(self.roots.iter().rev().map(|&root| (root, Mat4::IDENTITY)));

        while let Some((entity, parent_world)) = stack.pop() {
            if !self.world.contains(entity) {
                continue;
            }
            if !self.is_enabled(entity) {
                log::trace!("Skipping disabled subtree at {:?}", entity);
                continue;
            }

            let local = self
                .world
                .get::<&TransformComponent>(entity)
                .map(|t| t.0.matrix())
                .unwrap_or(Mat4::IDENTITY);
            let world = parent_world * local;

            self.visit_components(entity, &world, &mut visit);

            if let Ok(children) = self.world.get::<&Children>(entity) {
                for &child in children.0.iter().rev() {
                    stack.push((child, world));
                }
            }
        }
    }

    fn visit_components<F>(&self, entity: Entity, world: &Mat4, visit: &mut F)
    where
        F: FnMut(&Mat4, SceneComponent<'_>),
    {
        if let Ok(camera) = self.world.get::<&CameraComponent>(entity) {
            visit(world, SceneComponent::Camera(&camera.0));
        }
        if let Ok(environment) = self.world.get::<&EnvironmentComponent>(entity) {
            visit(world, SceneComponent::Environment(&environment.0));
        }
        if let Ok(light) = self.world.get::<&DirectionalLight>(entity) {
            visit(world, SceneComponent::DirectionalLight(&*light));
        }
        if let Ok(light) = self.world.get::<&PointLight>(entity) {
            visit(world, SceneComponent::PointLight(&*light));
        }
        if let Ok(light) = self.world.get::<&SpotLight>(entity) {
            visit(world, SceneComponent::SpotLight(&*light));
        }
        if let Ok(model) = self.world.get::<&ModelComponent>(entity) {
            visit(world, SceneComponent::Model(model.0));
        }
        if let Ok(emitter) = self.world.get::<&ParticleEmitter>(entity) {
            visit(world, SceneComponent::ParticleEmitter(&*emitter));
        }
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn light(intensity: f32) -> PointLight {
        PointLight {
            color: Vec3::ONE,
            intensity,
            range: 10.0,
        }
    }

    fn visited_intensities(scene: &Scene) -> Vec<f32> {
        let mut seen = Vec::new();
        scene.traverse(|_, component| {
            if let SceneComponent::PointLight(light) = component {
                seen.push(light.intensity);
            }
        });
        seen
    }

    #[test]
    fn traversal_is_depth_first_parent_before_children() {
        let mut scene = Scene::new();
        let a = scene.entity().with_point_light(light(1.0)).spawn();
        let _a1 = scene.entity().child_of(a).with_point_light(light(2.0)).spawn();
        let _a2 = scene.entity().child_of(a).with_point_light(light(3.0)).spawn();
        let _b = scene.entity().with_point_light(light(4.0)).spawn();

        assert_eq!(visited_intensities(&scene), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn disabled_entity_hides_its_subtree() {
        let mut scene = Scene::new();
        let parent = scene.entity().with_point_light(light(1.0)).spawn();
        scene.entity().child_of(parent).with_point_light(light(2.0)).spawn();
        scene.entity().with_point_light(light(3.0)).spawn();

        scene.set_enabled(parent, false);
        assert_eq!(visited_intensities(&scene), vec![3.0]);

        scene.set_enabled(parent, true);
        assert_eq!(visited_intensities(&scene), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn world_matrix_accumulates_parent_transforms() {
        let mut scene = Scene::new();
        let parent = scene
            .entity()
            .with_transform(Transform::from_translation(Vec3::new(5.0, 0.0, 0.0)))
            .spawn();
        scene
            .entity()
            .child_of(parent)
            .with_transform(Transform::from_translation(Vec3::new(2.0, 0.0, 0.0)))
            .with_point_light(light(1.0))
            .spawn();

        let mut position = None;
        scene.traverse(|world, component| {
            if let SceneComponent::PointLight(_) = component {
                position = Some(world.transform_point3(Vec3::ZERO));
            }
        });
        assert_eq!(position, Some(Vec3::new(7.0, 0.0, 0.0)));
    }

    #[test]
    fn reused_stack_keeps_order_and_storage() {
        let mut scene = Scene::new();
        let a = scene.entity().with_point_light(light(1.0)).spawn();
        let a1 = scene.entity().child_of(a).with_point_light(light(2.0)).spawn();
        scene.entity().child_of(a1).with_point_light(light(3.0)).spawn();
        scene.entity().with_point_light(light(4.0)).spawn();

        let mut stack = Vec::new();
        let walk = |stack: &mut Vec<(Entity, Mat4)>| {
            let mut seen = Vec::new();
            scene.traverse_with(stack, |_, component| {
                if let SceneComponent::PointLight(light) = component {
                    seen.push(light.intensity);
                }
            });
            seen
        };

        assert_eq!(walk(&mut stack), vec![1.0, 2.0, 3.0, 4.0]);
        let capacity = stack.capacity();
        assert!(capacity > 0);
        assert!(stack.is_empty());

        assert_eq!(walk(&mut stack), vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(stack.capacity(), capacity);
    }
}
