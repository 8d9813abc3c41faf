//! Deferred lighting: one full-screen quad shading every covered G-buffer
//! pixel with the frame's lights, shadow cascades and IBL.

use crate::asset::Handle;
use crate::error::{RenderError, Result};
use crate::renderer::device::{DepthState, GraphicsDevice, RasterState, RenderTarget, Shader};
use crate::renderer::draw::{BoundChannels, SavedState};
use crate::renderer::gbuffer::GBuffer;
use crate::renderer::scene_data::{CameraData, SceneRenderData};
use crate::renderer::shading::{self, ShadingInputs};
use crate::renderer::uniforms;

pub struct LightPassRenderer {
    shader: Handle<Shader>,
    channels: BoundChannels,
}

impl LightPassRenderer {
    pub fn new(shader: Handle<Shader>) -> Self {
        Self {
            shader,
            channels: BoundChannels::new(),
        }
    }

    /// Copies G-buffer depth into `target` and shades the pixels geometry
    /// covered. The quad sits on the far plane and passes the `NotEqual`
    /// depth test wherever depth differs from the clear value.
    pub fn render_light_pass(
        &mut self,
        device: &mut dyn GraphicsDevice,
        target: RenderTarget,
        gbuffer: &GBuffer,
        data: &SceneRenderData,
        inputs: &ShadingInputs<'_>,
    ) -> Result<()> {
        let camera = data.camera().ok_or(RenderError::MissingCamera)?;

        device.copy_depth(gbuffer.frame_buffer, target)?;
        device.bind_frame_buffer(target)?;

        let saved = SavedState::capture(device);
        let result = self.shade(device, gbuffer, inputs, camera);
        let released = self.channels.release(device);
        saved.restore(device);
        result.and(released)
    }

    fn shade(
        &mut self,
        device: &mut dyn GraphicsDevice,
        gbuffer: &GBuffer,
        inputs: &ShadingInputs<'_>,
        camera: &CameraData,
    ) -> Result<()> {
        device.set_raster_state(RasterState {
            cull_mode: None,
            ..RasterState::default()
        });
        device.set_depth_state(DepthState {
            compare: wgpu::CompareFunction::NotEqual,
            write: false,
        });
        device.set_blend_state(None);
        device.bind_shader(self.shader)?;

        for (channel, texture) in gbuffer.bindings() {
            self.channels.bind(device, channel, texture)?;
        }
        shading::bind_shading(device, inputs, &mut self.channels)?;

        device.set_uniform(uniforms::INVERSE_VIEW_PROJ, camera.view_proj.inverse().into())?;
        device.set_uniform(uniforms::VIEW, camera.view.into())?;
        device.set_uniform(uniforms::CAMERA_POSITION, camera.position.into())?;

        device.draw_fullscreen_quad()
    }
}
