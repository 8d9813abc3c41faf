//! Per-frame snapshot of everything the passes need from the scene graph.

use glam::{Mat4, Vec3};

use crate::asset::{Assets, Handle, Mesh};
use crate::environment::EnvironmentMaps;
use crate::renderer::lights::{DirectionalLightData, LightsData, PointLightData, SpotLightData};
use crate::renderer::Material;
use crate::scene::{Aabb, Camera, Model, ParticleEmitter, Scene, SceneComponent};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraData {
    pub camera: Camera,
    pub world: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
    pub view_proj: Mat4,
    pub position: Vec3,
    pub aspect: f32,
}

impl CameraData {
    pub fn new(camera: Camera, world: Mat4, aspect: f32) -> Self {
        let view = world.inverse();
        let projection = camera.proj(aspect);
        Self {
            camera,
            world,
            view,
            projection,
            view_proj: projection * view,
            position: world.w_axis.truncate(),
            aspect,
        }
    }

    pub fn near(&self) -> f32 {
        self.camera.near
    }

    pub fn far(&self) -> f32 {
        self.camera.far
    }
}

/// A placed model. Its node world matrices live in
/// `SceneRenderData::node_world[first_node..first_node + node_count]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelInstance {
    pub model: Handle<Model>,
    pub world: Mat4,
    pub first_node: usize,
    pub node_count: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct EmitterInstance {
    pub emitter: ParticleEmitter,
    pub world: Mat4,
}

/// One primitive ready to draw.
#[derive(Debug, Clone, Copy)]
pub struct MeshDraw<'a> {
    pub handle: Handle<Mesh>,
    pub mesh: &'a Mesh,
    pub material: &'a Material,
    pub world: &'a Mat4,
}

impl MeshDraw<'_> {
    pub fn world_bounds(&self) -> Aabb {
        self.mesh.bounds.transformed(self.world)
    }
}

#[derive(Debug, Default)]
pub struct SceneRenderData {
    camera: Option<CameraData>,
    environment: Option<EnvironmentMaps>,
    lights: LightsData,
    models: Vec<ModelInstance>,
    node_world: Vec<Mat4>,
    emitters: Vec<EmitterInstance>,
    scene_aabb: Option<Aabb>,
}

impl SceneRenderData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empties every list while keeping their storage.
    pub fn reset(&mut self) {
        self.camera = None;
        self.environment = None;
        self.lights.clear();
        self.models.clear();
        self.node_world.clear();
        self.emitters.clear();
        self.scene_aabb = None;
    }

    pub fn camera(&self) -> Option<&CameraData> {
        self.camera.as_ref()
    }

    pub fn environment(&self) -> Option<&EnvironmentMaps> {
        self.environment.as_ref()
    }

    pub fn lights(&self) -> &LightsData {
        &self.lights
    }

    pub fn models(&self) -> &[ModelInstance] {
        &self.models
    }

    pub fn particle_emitters(&self) -> &[EmitterInstance] {
        &self.emitters
    }

    pub fn node_world(&self, instance: &ModelInstance) -> &[Mat4] {
        self.node_world
            .get(instance.first_node..instance.first_node + instance.node_count)
            .unwrap_or(&[])
    }

    /// Union of every mesh's world-space bounds; a point at the origin when
    /// nothing was collected.
    pub fn scene_aabb(&self) -> Aabb {
        self.scene_aabb.unwrap_or_default()
    }

    /// Every primitive of every collected model, in collection order.
    /// Primitives whose mesh is not in `assets` are skipped.
    pub fn mesh_draws<'a>(&'a self, assets: &'a Assets) -> impl Iterator<Item = MeshDraw<'a>> + 'a {
        self.models.iter().flat_map(move |instance| {
            let nodes = assets
                .models
                .get(instance.model)
                .map_or(&[][..], |model| model.nodes());
            nodes
                .iter()
                .zip(self.node_world(instance))
                .flat_map(move |(node, world)| {
                    node.primitives.iter().filter_map(move |primitive| {
                        let mesh = assets.meshes.get(primitive.mesh)?;
                        Some(MeshDraw {
                            handle: primitive.mesh,
                            mesh,
                            material: &primitive.material,
                            world,
                        })
                    })
                })
        })
    }

    fn push_model(&mut self, handle: Handle<Model>, model: &Model, world: &Mat4) {
        let first_node = self.node_world.len();
        for node in model.nodes() {
            let parent = node
                .parent
                .and_then(|p| self.node_world.get(first_node + p).copied())
                .unwrap_or(*world);
            self.node_world.push(parent * node.transform.matrix());
        }
        self.models.push(ModelInstance {
            model: handle,
            world: *world,
            first_node,
            node_count: model.node_count(),
        });
    }
}

/// Walks the scene once per frame and fills a reusable `SceneRenderData`.
#[derive(Debug, Default)]
pub struct SceneRenderDataCollector {
    data: SceneRenderData,
    stack: Vec<(hecs::Entity, Mat4)>,
}

impl SceneRenderDataCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(&self) -> &SceneRenderData {
        &self.data
    }

    pub fn collect(&mut self, scene: &Scene, aspect: f32) -> &SceneRenderData {
        let data = &mut self.data;
        data.reset();

        scene.traverse_with(&mut self.stack, |world, component| match component {
            SceneComponent::Camera(camera) => {
                data.camera = Some(CameraData::new(*camera, *world, aspect));
            }
            SceneComponent::Environment(maps) => data.environment = Some(*maps),
            SceneComponent::DirectionalLight(light) => data
                .lights
                .add_directional(DirectionalLightData::from_component(light, world)),
            SceneComponent::PointLight(light) => data
                .lights
                .add_point(PointLightData::from_component(light, world)),
            SceneComponent::SpotLight(light) => data
                .lights
                .add_spot(SpotLightData::from_component(light, world)),
            SceneComponent::Model(handle) => match scene.assets.models.get(handle) {
                Some(model) => data.push_model(handle, model, world),
                None => log::warn!("Model {:?} is not loaded; skipping", handle),
            },
            SceneComponent::ParticleEmitter(emitter) => data.emitters.push(EmitterInstance {
                emitter: *emitter,
                world: *world,
            }),
        });

        let bounds = data
            .mesh_draws(&scene.assets)
            .map(|draw| draw.world_bounds())
            .reduce(|acc, aabb| acc.union(&aabb));
        data.scene_aabb = bounds;

        log::trace!(
            "Collected {} models, {} lights, {} emitters",
            data.models.len(),
            data.lights.len(),
            data.emitters.len()
        );
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{DirectionalLight, Transform};

    fn cube_scene() -> (Scene, Handle<Model>) {
        let mut scene = Scene::new();
        let mesh = scene.add_mesh(Mesh::cube("cube"));
        let model = scene.add_model(Model::single("cube", mesh, Material::white()));
        (scene, model)
    }

    #[test]
    fn empty_scene_collects_nothing() {
        let scene = Scene::new();
        let mut collector = SceneRenderDataCollector::new();
        let data = collector.collect(&scene, 1.0);
        assert!(data.camera().is_none());
        assert!(data.environment().is_none());
        assert!(data.lights().is_empty());
        assert!(data.models().is_empty());
        assert!(data.particle_emitters().is_empty());
        assert_eq!(data.scene_aabb().size(), Vec3::ZERO);
    }

    #[test]
    fn collect_resets_previous_frame() {
        let (mut scene, model) = cube_scene();
        let entity = scene.entity().with_model(model).spawn();
        scene
            .entity()
            .with_directional_light(DirectionalLight {
                color: Vec3::ONE,
                intensity: 1.0,
            })
            .spawn();

        let mut collector = SceneRenderDataCollector::new();
        assert_eq!(collector.collect(&scene, 1.0).models().len(), 1);

        scene.set_enabled(entity, false);
        let data = collector.collect(&scene, 1.0);
        assert!(data.models().is_empty());
        assert_eq!(data.lights().directional_lights().len(), 1);
    }

    #[test]
    fn repeated_collects_reuse_the_traversal_stack() {
        let (mut scene, model) = cube_scene();
        let parent = scene.entity().with_model(model).spawn();
        scene.entity().child_of(parent).with_model(model).spawn();

        let mut collector = SceneRenderDataCollector::new();
        assert_eq!(collector.collect(&scene, 1.0).models().len(), 2);
        let capacity = collector.stack.capacity();
        assert!(capacity > 0);

        assert_eq!(collector.collect(&scene, 1.0).models().len(), 2);
        assert_eq!(collector.stack.capacity(), capacity);
    }

    #[test]
    fn last_camera_wins() {
        let mut scene = Scene::new();
        scene.entity().with_camera(Camera::new(1.0, 0.1, 10.0)).spawn();
        scene.entity().with_camera(Camera::new(1.0, 0.5, 20.0)).spawn();
        let mut collector = SceneRenderDataCollector::new();
        let camera = collector.collect(&scene, 1.0).camera().copied();
        assert_eq!(camera.map(|c| c.far()), Some(20.0));
    }

    #[test]
    fn node_world_accumulates_model_hierarchy() {
        let mut scene = Scene::new();
        let mesh = scene.add_mesh(Mesh::cube("cube"));
        let mut model = Model::new("pair");
        let root = model.add_node(None, "root", Transform::from_translation(Vec3::X));
        let child = model.add_node(Some(root), "child", Transform::from_translation(Vec3::Y));
        model.add_primitive(child, mesh, Material::white());
        let model = scene.add_model(model);
        scene
            .entity()
            .with_transform(Transform::from_translation(Vec3::Z))
            .with_model(model)
            .spawn();

        let mut collector = SceneRenderDataCollector::new();
        let data = collector.collect(&scene, 1.0);
        let instance = data.models()[0];
        let worlds = data.node_world(&instance);
        assert_eq!(worlds.len(), 2);
        assert_eq!(worlds[1].w_axis.truncate(), Vec3::new(1.0, 1.0, 1.0));

        let aabb = data.scene_aabb();
        assert!((aabb.center() - Vec3::ONE).length() < 1e-5);
        assert!((aabb.size() - Vec3::ONE).length() < 1e-5);
    }

    #[test]
    fn missing_model_is_skipped() {
        let mut scene = Scene::new();
        scene.entity().with_model(Handle::new(42)).spawn();
        let mut collector = SceneRenderDataCollector::new();
        assert!(collector.collect(&scene, 1.0).models().is_empty());
    }
}
