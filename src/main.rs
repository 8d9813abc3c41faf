mod demo_scenes;

use demo_scenes::{orbit_camera, DemoScene};
use pbr_csm::{HeadlessDevice, PbrSceneRenderer, RenderSettings};

const ACTIVE_SCENE: DemoScene = DemoScene::ShadowTest;
const FRAME_COUNT: usize = 8;

fn run() -> pbr_csm::Result<()> {
    let settings = RenderSettings::load();
    let mut device = HeadlessDevice::new(settings.resolution.width, settings.resolution.height);
    let mut renderer = PbrSceneRenderer::new(&mut device, settings)?;
    let mut scene = ACTIVE_SCENE.build(&mut device);

    let camera = scene
        .world
        .query::<&pbr_csm::scene::CameraComponent>()
        .iter()
        .map(|(entity, _)| entity)
        .last();

    for frame in 0..FRAME_COUNT {
        if let Some(camera) = camera {
            let angle = frame as f32 * std::f32::consts::TAU / FRAME_COUNT as f32;
            scene.set_transform(camera, orbit_camera(12.0, 6.0, angle));
        }

        let output = renderer.render_frame(&mut device, &scene)?;
        log::info!(
            "Frame {}: image {:?}, {} draw calls, {} culled, {} cascades, {} commands",
            frame,
            output.image,
            output.stats.draw_calls(),
            output.stats.culled,
            output.stats.cascades,
            device.commands().len()
        );
        device.clear_commands();
    }

    Ok(())
}

fn main() {
    pbr_csm::init_logging();
    log::info!("Starting headless PBR renderer with {:?}", ACTIVE_SCENE);

    if let Err(err) = run() {
        log::error!("Render error: {err}");
        std::process::exit(1);
    }

    log::info!("Shutdown complete");
}
