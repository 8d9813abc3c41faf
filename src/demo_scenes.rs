use glam::{Quat, Vec3};
use log::info;
use pbr_csm::asset::Mesh;
use pbr_csm::renderer::{GraphicsDevice, Material, TextureDescriptor};
use pbr_csm::scene::{
    Camera, DirectionalLight, Model, ParticleBlend, ParticleEmitter, PointLight, Scene, SpotLight,
    Transform,
};
use pbr_csm::EnvironmentMaps;

#[allow(dead_code)]
#[derive(Clone, Copy, Debug)]
pub enum DemoScene {
    ShadowTest,
    PbrTest,
    HierarchyTest,
}

impl DemoScene {
    pub fn build(self, device: &mut dyn GraphicsDevice) -> Scene {
        let mut scene = Scene::new();
        match self {
            DemoScene::ShadowTest => setup_shadow_test_scene(&mut scene, device),
            DemoScene::PbrTest => setup_pbr_test_scene(&mut scene, device),
            DemoScene::HierarchyTest => setup_hierarchy_test_scene(&mut scene),
        }
        scene
    }
}

/// Camera transform on a circle around the origin.
pub fn orbit_camera(radius: f32, height: f32, angle: f32) -> Transform {
    let eye = Vec3::new(angle.cos() * radius, height, angle.sin() * radius);
    Transform::looking_at(eye, Vec3::ZERO, Vec3::Y)
}

fn spawn_camera(scene: &mut Scene) -> hecs::Entity {
    scene
        .entity()
        .with_name("Main Camera")
        .with_transform(orbit_camera(12.0, 6.0, 0.0))
        .with_camera(Camera::new(60f32.to_radians(), 0.1, 200.0))
        .spawn()
}

fn spawn_sun(scene: &mut Scene, direction: Vec3, intensity: f32) {
    scene
        .entity()
        .with_name("Sun")
        .with_transform(Transform::facing(direction))
        .with_directional_light(DirectionalLight {
            color: Vec3::ONE,
            intensity,
        })
        .spawn();
}

fn environment(device: &mut dyn GraphicsDevice) -> EnvironmentMaps {
    let hdr = wgpu::TextureFormat::Rgba16Float;
    EnvironmentMaps::new(
        device.create_texture(&TextureDescriptor::cube("SkyRadiance", 1024, hdr)),
        device.create_texture(&TextureDescriptor::cube("SkyIrradiance", 32, hdr)),
        device.create_texture(&TextureDescriptor::cube("SkySpecular", 256, hdr)),
    )
}

fn setup_shadow_test_scene(scene: &mut Scene, device: &mut dyn GraphicsDevice) {
    info!("Creating shadow map test scene...");

    let cube = scene.add_mesh(Mesh::cube("Cube"));
    let checker = device.create_texture(&TextureDescriptor::d2(
        "Shadow Test Floor",
        512,
        512,
        wgpu::TextureFormat::Rgba8UnormSrgb,
    ));

    let floor_material = Material::pbr()
        .with_base_color_texture(checker)
        .with_roughness(1.0);
    let floor = scene.add_model(Model::single("Floor", cube, floor_material));
    scene
        .entity()
        .with_name("Shadow Test Floor")
        .with_transform(Transform::from_trs(
            Vec3::new(0.0, -0.05, 0.0),
            Quat::IDENTITY,
            Vec3::new(25.0, 0.1, 25.0),
        ))
        .with_model(floor)
        .spawn();

    let cube_material = Material::rgb(0.86, 0.86, 0.9)
        .with_metallic(0.0)
        .with_roughness(0.3);
    let cube_model = scene.add_model(Model::single("Cube", cube, cube_material));
    scene
        .entity()
        .with_name("Shadow Test Cube")
        .with_transform(Transform::from_trs(
            Vec3::new(0.0, 1.0, 0.0),
            Quat::IDENTITY,
            Vec3::splat(1.5),
        ))
        .with_model(cube_model)
        .spawn();

    let glass = Material::new([0.6, 0.8, 1.0, 0.35])
        .with_roughness(0.05)
        .with_alpha_blend()
        .with_double_sided(true);
    let glass_model = scene.add_model(Model::single("Glass", cube, glass));
    scene
        .entity()
        .with_name("Glass Pane")
        .with_transform(Transform::from_trs(
            Vec3::new(2.5, 1.0, 0.5),
            Quat::IDENTITY,
            Vec3::new(0.1, 2.0, 2.0),
        ))
        .with_model(glass_model)
        .spawn();

    spawn_sun(scene, Vec3::new(-0.6, -1.0, -0.4), 6.0);

    scene
        .entity()
        .with_name("Shadow Test Fill")
        .with_transform(Transform::from_translation(Vec3::new(3.0, 4.0, 2.0)))
        .with_point_light(PointLight {
            color: Vec3::new(0.9, 0.95, 1.0),
            intensity: 2.0,
            range: 20.0,
        })
        .spawn();

    let sparks = scene.add_mesh(Mesh::points("Sparks", 256));
    scene
        .entity()
        .with_name("Sparks")
        .with_transform(Transform::from_translation(Vec3::new(-2.0, 0.5, 1.0)))
        .with_particle_emitter(ParticleEmitter {
            mesh: sparks,
            texture: None,
            blend: ParticleBlend::Additive,
            particle_count: 256,
            particle_size: 0.05,
        })
        .spawn();

    scene
        .entity()
        .with_name("Environment")
        .with_environment(environment(device).with_intensity(0.6))
        .spawn();

    spawn_camera(scene);
}

fn setup_pbr_test_scene(scene: &mut Scene, device: &mut dyn GraphicsDevice) {
    info!("Creating PBR material grid...");

    let sphere = scene.add_mesh(Mesh::new(
        "Sphere",
        pbr_csm::scene::Aabb::from_center_half_extents(Vec3::ZERO, Vec3::splat(0.5)),
        2880,
    ));

    const GRID: i32 = 5;
    for row in 0..GRID {
        for col in 0..GRID {
            let metallic = row as f32 / (GRID - 1) as f32;
            let roughness = (col as f32 / (GRID - 1) as f32).max(0.05);
            let material = Material::rgb(0.9, 0.1, 0.1)
                .with_metallic(metallic)
                .with_roughness(roughness);
            let model = scene.add_model(Model::single(format!("Sphere {row}x{col}"), sphere, material));
            scene
                .entity()
                .with_transform(Transform::from_translation(Vec3::new(
                    (col - GRID / 2) as f32 * 1.2,
                    (row - GRID / 2) as f32 * 1.2,
                    0.0,
                )))
                .with_model(model)
                .spawn();
        }
    }

    spawn_sun(scene, Vec3::new(-0.3, -0.8, -1.0), 3.0);
    scene
        .entity()
        .with_name("Environment")
        .with_environment(environment(device))
        .spawn();
    spawn_camera(scene);
}

fn setup_hierarchy_test_scene(scene: &mut Scene) {
    info!("Creating hierarchy test scene...");

    let cube = scene.add_mesh(Mesh::cube("Cube"));
    let mut model = Model::new("Arm");
    let base = model.add_node(None, "Base", Transform::IDENTITY);
    model.add_primitive(base, cube, Material::rgb(0.8, 0.8, 0.8));
    let mut parent = base;
    for i in 0..4 {
        let joint = model.add_node(
            Some(parent),
            format!("Joint{i}"),
            Transform::from_trs(
                Vec3::new(0.0, 1.1, 0.0),
                Quat::from_rotation_z(0.3),
                Vec3::splat(0.85),
            ),
        );
        model.add_primitive(joint, cube, Material::rgb(0.2, 0.4 + 0.1 * i as f32, 0.8));
        parent = joint;
    }
    let arm = scene.add_model(model);

    let root = scene.entity().with_name("Pivot").spawn();
    for i in 0..3 {
        let angle = i as f32 * std::f32::consts::TAU / 3.0;
        scene
            .entity()
            .child_of(root)
            .with_transform(Transform::from_trs(
                Vec3::new(angle.cos() * 3.0, 0.0, angle.sin() * 3.0),
                Quat::from_rotation_y(angle),
                Vec3::ONE,
            ))
            .with_model(arm)
            .spawn();
    }

    scene
        .entity()
        .child_of(root)
        .with_transform(Transform::from_translation(Vec3::new(0.0, 5.0, 0.0)))
        .with_spot_light(SpotLight {
            color: Vec3::new(1.0, 0.9, 0.7),
            intensity: 8.0,
            inner_angle: 0.3,
            outer_angle: 0.5,
            range: 15.0,
        })
        .spawn();

    spawn_sun(scene, Vec3::new(0.2, -1.0, 0.3), 2.0);
    spawn_camera(scene);
}
