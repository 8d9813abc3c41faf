//! Frame orchestration: collect the scene, render shadows, run the deferred
//! path for opaque surfaces, layer skybox, particles and blended surfaces on
//! top, then post-process.

use crate::asset::Handle;
use crate::error::{RenderError, Result};
use crate::renderer::csm::{CsmConfig, CsmGenerator, CASCADE_COUNT};
use crate::renderer::device::{
    ClearValues, FrameBuffer, FrameBufferDescriptor, GraphicsDevice, RenderTarget,
    TextureDescriptor, Viewport,
};
use crate::renderer::forward::ForwardPath;
use crate::renderer::frustum::CameraFrustum;
use crate::renderer::gbuffer::{GBufferGenerator, DEPTH_FORMAT};
use crate::renderer::light_pass::LightPassRenderer;
use crate::renderer::particles::ParticleRenderer;
use crate::renderer::postprocess::{PostProcessChain, PostProcessor};
use crate::renderer::scene_data::{SceneRenderData, SceneRenderDataCollector};
use crate::renderer::shaders::ShaderLibrary;
use crate::renderer::shading::{IblMaps, ShadingInputs};
use crate::renderer::skybox::SkyboxRenderer;
use crate::renderer::Texture;
use crate::scene::Scene;
use crate::settings::RenderSettings;

pub const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub const BRDF_LUT_SIZE: u32 = 512;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub shadow_draws: usize,
    pub gbuffer_draws: usize,
    pub culled: usize,
    pub light_pass_draws: usize,
    pub skybox_draws: usize,
    pub particle_draws: usize,
    pub forward_draws: usize,
    pub cascades: usize,
}

impl FrameStats {
    pub fn draw_calls(&self) -> usize {
        self.shadow_draws
            + self.gbuffer_draws
            + self.light_pass_draws
            + self.skybox_draws
            + self.particle_draws
            + self.forward_draws
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameOutput {
    pub image: Handle<Texture>,
    pub stats: FrameStats,
}

/// HDR colour + depth the lit scene is assembled in.
#[derive(Debug, Clone, Copy)]
struct SceneTarget {
    frame_buffer: Handle<FrameBuffer>,
    color: Handle<Texture>,
}

impl SceneTarget {
    fn create(device: &mut dyn GraphicsDevice, width: u32, height: u32) -> Result<Self> {
        let frame_buffer = device.create_frame_buffer(&FrameBufferDescriptor {
            label: "SceneColor".to_string(),
            width,
            height,
            color_formats: vec![HDR_FORMAT],
            depth_format: Some(DEPTH_FORMAT),
        });
        Ok(Self {
            frame_buffer,
            color: device.color_texture(frame_buffer, 0)?,
        })
    }
}

pub struct PbrSceneRenderer {
    settings: RenderSettings,
    shaders: ShaderLibrary,
    collector: SceneRenderDataCollector,
    frustum: CameraFrustum,
    csm: CsmGenerator,
    gbuffer: GBufferGenerator,
    light_pass: LightPassRenderer,
    skybox: SkyboxRenderer,
    particles: ParticleRenderer,
    forward: ForwardPath,
    post_processor: Option<Box<dyn PostProcessor>>,
    target: SceneTarget,
    brdf_lut: Handle<Texture>,
    width: u32,
    height: u32,
    stats: FrameStats,
}

impl PbrSceneRenderer {
    pub fn new(device: &mut dyn GraphicsDevice, settings: RenderSettings) -> Result<Self> {
        let width = settings.resolution.width.max(1);
        let height = settings.resolution.height.max(1);
        let shaders = ShaderLibrary::new(device);

        let csm = CsmGenerator::new(
            device,
            shaders.shadow_depth,
            CsmConfig {
                shadow_map_size: settings.shadow_map_size,
                split_lambda: settings.cascade_split_lambda,
                max_shadow_distance: settings.max_shadow_distance,
                depth_bias: settings.shadow_depth_bias(),
            },
        )?;
        let gbuffer = GBufferGenerator::new(device, shaders.gbuffer, width, height)?;
        let target = SceneTarget::create(device, width, height)?;
        let brdf_lut = device.create_texture(&TextureDescriptor::d2(
            "BrdfLut",
            BRDF_LUT_SIZE,
            BRDF_LUT_SIZE,
            wgpu::TextureFormat::Rg16Float,
        ));
        let post_processor = PostProcessChain::new(
            device,
            shaders.post_process(),
            settings.post_process,
            width,
            height,
        )?;

        log::info!("PBR scene renderer ready at {}x{}", width, height);

        Ok(Self {
            collector: SceneRenderDataCollector::new(),
            frustum: CameraFrustum::default(),
            csm,
            gbuffer,
            light_pass: LightPassRenderer::new(shaders.light_pass),
            skybox: SkyboxRenderer::new(shaders.skybox),
            particles: ParticleRenderer::new(shaders.particles),
            forward: ForwardPath::new(shaders.forward),
            post_processor: Some(Box::new(post_processor)),
            target,
            brdf_lut,
            width,
            height,
            stats: FrameStats::default(),
            shaders,
            settings,
        })
    }

    /// Replaces the post-processing stage; `None` presents the HDR target.
    pub fn with_post_processor(mut self, post_processor: Option<Box<dyn PostProcessor>>) -> Self {
        self.post_processor = post_processor;
        self
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn shaders(&self) -> &ShaderLibrary {
        &self.shaders
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    pub fn scene_data(&self) -> &SceneRenderData {
        self.collector.data()
    }

    pub fn shadow_generator(&self) -> &CsmGenerator {
        &self.csm
    }

    pub fn gbuffer(&self) -> &GBufferGenerator {
        &self.gbuffer
    }

    /// Texture the lit scene is assembled in before post-processing.
    pub fn scene_color(&self) -> Handle<Texture> {
        self.target.color
    }

    pub fn brdf_lut(&self) -> Handle<Texture> {
        self.brdf_lut
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn render_frame(&mut self, device: &mut dyn GraphicsDevice, scene: &Scene) -> Result<FrameOutput> {
        let aspect = self.width as f32 / self.height as f32;
        let mut stats = FrameStats::default();

        let data = self.collector.collect(scene, aspect);
        let camera = *data.camera().ok_or(RenderError::MissingCamera)?;
        self.frustum.update(&camera.view_proj, camera.position);

        let shadows = self
            .csm
            .generate_shadow_maps(device, data, &scene.assets)?
            .copied();
        stats.shadow_draws = self.csm.draw_count();
        stats.cascades = if shadows.is_some() { CASCADE_COUNT } else { 0 };

        let target = RenderTarget::FrameBuffer(self.target.frame_buffer);
        device.bind_frame_buffer(target)?;
        device.set_viewport(Viewport::new(self.width, self.height));
        device.clear(&ClearValues::color_and_depth(self.settings.clear_color()))?;

        let geometry = self
            .gbuffer
            .generate_gbuffer(device, data, &self.frustum, &scene.assets)?;
        stats.gbuffer_draws = geometry.drawn;
        stats.culled = geometry.culled;

        let inputs = ShadingInputs {
            lights: data.lights(),
            shadows: shadows.as_ref(),
            ibl: data
                .environment()
                .map(|environment| IblMaps::from_environment(environment, self.brdf_lut)),
        };
        self.light_pass
            .render_light_pass(device, target, self.gbuffer.gbuffer(), data, &inputs)?;
        stats.light_pass_draws = 1;

        if let Some(environment) = data.environment() {
            self.skybox
                .render(device, target, &camera, environment.radiance)?;
            stats.skybox_draws = 1;
        }

        self.particles.set_camera(Some(camera));
        stats.particle_draws =
            self.particles
                .render(device, target, data.particle_emitters(), &scene.assets)?;

        let blended = self
            .forward
            .render_scene_data(device, target, data, &inputs, &scene.assets)?;
        stats.forward_draws = blended.drawn;
        device.unbind_frame_buffer();

        let image = match self.post_processor.as_mut() {
            Some(post) => post.process(device, self.target.color)?,
            None => self.target.color,
        };

        log::debug!(
            "Frame: {} draws ({} shadow, {} geometry, {} culled, {} blended, {} particles), {} cascades",
            stats.draw_calls(),
            stats.shadow_draws,
            stats.gbuffer_draws,
            stats.culled,
            stats.forward_draws,
            stats.particle_draws,
            stats.cascades
        );
        self.stats = stats;
        Ok(FrameOutput { image, stats })
    }

    /// Recreates the resolution-dependent targets. Zero sizes are ignored.
    pub fn resize(&mut self, device: &mut dyn GraphicsDevice, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            log::warn!("Ignoring resize to {}x{}", width, height);
            return Ok(());
        }
        if (width, height) == (self.width, self.height) {
            return Ok(());
        }

        self.gbuffer.resize(device, width, height)?;
        device.destroy_frame_buffer(self.target.frame_buffer)?;
        self.target = SceneTarget::create(device, width, height)?;
        if let Some(post) = self.post_processor.as_mut() {
            post.resize(device, width, height)?;
        }

        self.width = width;
        self.height = height;
        self.settings.resolution.width = width;
        self.settings.resolution.height = height;
        log::info!("Renderer resized to {}x{}", width, height);
        Ok(())
    }
}
