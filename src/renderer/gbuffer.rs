//! Deferred geometry pass for OPAQUE and MASK surfaces.

use crate::asset::{Assets, Handle};
use crate::error::{RenderError, Result};
use crate::renderer::device::{
    ClearValues, DepthState, FrameBuffer, FrameBufferDescriptor, GraphicsDevice, RasterState,
    RenderTarget, Shader, Viewport,
};
use crate::renderer::draw::{self, BoundChannels, PassStats, SavedState};
use crate::renderer::frustum::CameraFrustum;
use crate::renderer::scene_data::SceneRenderData;
use crate::renderer::uniforms::{self, channel};
use crate::renderer::Texture;

pub const ALBEDO_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;
pub const NORMAL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub const EMISSIVE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub const OCCLUSION_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R8Unorm;
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Geometry attachments: albedo + metallic, normal + roughness, emissive,
/// occlusion, and depth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GBuffer {
    pub frame_buffer: Handle<FrameBuffer>,
    pub albedo: Handle<Texture>,
    pub normal: Handle<Texture>,
    pub emissive: Handle<Texture>,
    pub occlusion: Handle<Texture>,
    pub depth: Handle<Texture>,
    pub width: u32,
    pub height: u32,
}

impl GBuffer {
    pub fn create(device: &mut dyn GraphicsDevice, width: u32, height: u32) -> Result<Self> {
        let frame_buffer = device.create_frame_buffer(&FrameBufferDescriptor {
            label: "GBuffer".to_string(),
            width,
            height,
            color_formats: vec![ALBEDO_FORMAT, NORMAL_FORMAT, EMISSIVE_FORMAT, OCCLUSION_FORMAT],
            depth_format: Some(DEPTH_FORMAT),
        });
        Ok(Self {
            frame_buffer,
            albedo: device.color_texture(frame_buffer, 0)?,
            normal: device.color_texture(frame_buffer, 1)?,
            emissive: device.color_texture(frame_buffer, 2)?,
            occlusion: device.color_texture(frame_buffer, 3)?,
            depth: device.depth_texture(frame_buffer)?,
            width,
            height,
        })
    }

    /// Attachments paired with the channels the light pass samples them from.
    pub fn bindings(&self) -> [(u32, Handle<Texture>); 5] {
        [
            (channel::GBUFFER_ALBEDO, self.albedo),
            (channel::GBUFFER_NORMAL, self.normal),
            (channel::GBUFFER_EMISSIVE, self.emissive),
            (channel::GBUFFER_OCCLUSION, self.occlusion),
            (channel::GBUFFER_DEPTH, self.depth),
        ]
    }
}

pub struct GBufferGenerator {
    shader: Handle<Shader>,
    gbuffer: GBuffer,
    channels: BoundChannels,
}

impl GBufferGenerator {
    pub fn new(
        device: &mut dyn GraphicsDevice,
        shader: Handle<Shader>,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let gbuffer = GBuffer::create(device, width, height)?;
        log::info!("Created G-buffer {}x{}", width, height);
        Ok(Self {
            shader,
            gbuffer,
            channels: BoundChannels::new(),
        })
    }

    pub fn gbuffer(&self) -> &GBuffer {
        &self.gbuffer
    }

    pub fn resize(&mut self, device: &mut dyn GraphicsDevice, width: u32, height: u32) -> Result<()> {
        if width == self.gbuffer.width && height == self.gbuffer.height {
            return Ok(());
        }
        device.destroy_frame_buffer(self.gbuffer.frame_buffer)?;
        self.gbuffer = GBuffer::create(device, width, height)?;
        log::debug!("Resized G-buffer to {}x{}", width, height);
        Ok(())
    }

    /// Fills the G-buffer with every visible non-blended primitive.
    pub fn generate_gbuffer(
        &mut self,
        device: &mut dyn GraphicsDevice,
        data: &SceneRenderData,
        frustum: &CameraFrustum,
        assets: &Assets,
    ) -> Result<PassStats> {
        let camera = data.camera().ok_or(RenderError::MissingCamera)?;
        let saved = SavedState::capture(device);

        let result = self.draw_geometry(device, data, frustum, assets, &camera.view_proj);
        saved.restore(device);
        let stats = result?;

        log::trace!(
            "G-buffer pass: {} drawn, {} culled",
            stats.drawn,
            stats.culled
        );
        Ok(stats)
    }

    fn draw_geometry(
        &mut self,
        device: &mut dyn GraphicsDevice,
        data: &SceneRenderData,
        frustum: &CameraFrustum,
        assets: &Assets,
        view_proj: &glam::Mat4,
    ) -> Result<PassStats> {
        device.bind_frame_buffer(RenderTarget::FrameBuffer(self.gbuffer.frame_buffer))?;
        device.set_viewport(Viewport::new(self.gbuffer.width, self.gbuffer.height));
        device.clear(&ClearValues::color_and_depth(wgpu::Color::TRANSPARENT))?;
        device.set_raster_state(RasterState::default());
        device.set_depth_state(DepthState {
            compare: wgpu::CompareFunction::Less,
            write: true,
        });
        device.set_blend_state(None);
        device.bind_shader(self.shader)?;
        device.set_uniform(uniforms::VIEW_PROJ, (*view_proj).into())?;

        let mut stats = PassStats::default();
        for mesh_draw in data.mesh_draws(assets) {
            if mesh_draw.material.is_blended() {
                continue;
            }
            if !frustum.is_visible(&mesh_draw.world_bounds()) {
                stats.culled += 1;
                continue;
            }
            draw::draw_shaded(device, &mesh_draw, view_proj, &mut self.channels)?;
            stats.drawn += 1;
        }
        Ok(stats)
    }
}
