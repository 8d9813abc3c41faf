use glam::{Mat3, Mat4};

use crate::asset::Handle;
use crate::error::Result;
use crate::renderer::device::{DepthState, GraphicsDevice, RasterState, RenderTarget, Shader};
use crate::renderer::draw::SavedState;
use crate::renderer::scene_data::CameraData;
use crate::renderer::uniforms::{self, channel};
use crate::renderer::Texture;

/// Draws the environment radiance cubemap behind everything already in the
/// target.
pub struct SkyboxRenderer {
    shader: Handle<Shader>,
}

impl SkyboxRenderer {
    pub fn new(shader: Handle<Shader>) -> Self {
        Self { shader }
    }

    /// Camera view-projection with the translation removed.
    pub fn rotation_view_proj(camera: &CameraData) -> Mat4 {
        camera.projection * Mat4::from_mat3(Mat3::from_mat4(camera.view))
    }

    pub fn render(
        &mut self,
        device: &mut dyn GraphicsDevice,
        target: RenderTarget,
        camera: &CameraData,
        radiance: Handle<Texture>,
    ) -> Result<()> {
        device.bind_frame_buffer(target)?;
        let saved = SavedState::capture(device);

        device.bind_texture(channel::SKYBOX, radiance)?;
        let result = self.draw(device, camera);
        let unbound = device.unbind_texture(channel::SKYBOX);
        saved.restore(device);
        result.and(unbound)
    }

    fn draw(&self, device: &mut dyn GraphicsDevice, camera: &CameraData) -> Result<()> {
        device.set_raster_state(RasterState {
            cull_mode: None,
            ..RasterState::default()
        });
        device.set_depth_state(DepthState {
            compare: wgpu::CompareFunction::LessEqual,
            write: false,
        });
        device.set_blend_state(None);
        device.bind_shader(self.shader)?;

        let view_proj = Self::rotation_view_proj(camera);
        device.set_uniform(uniforms::VIEW_PROJ, view_proj.into())?;
        device.set_uniform(uniforms::INVERSE_VIEW_PROJ, view_proj.inverse().into())?;
        device.draw_fullscreen_quad()
    }
}
