//! Forward pass for BLEND surfaces, composited over the deferred result.

use glam::{Mat4, Vec3};

use crate::asset::{Assets, Handle, Mesh};
use crate::error::{RenderError, Result};
use crate::renderer::device::{DepthState, GraphicsDevice, RenderTarget, Shader};
use crate::renderer::draw::{self, BoundChannels, PassStats, SavedState};
use crate::renderer::scene_data::{CameraData, MeshDraw, SceneRenderData};
use crate::renderer::shading::{self, ShadingInputs};
use crate::renderer::uniforms;
use crate::renderer::Material;

/// A blended primitive queued for sorting. Owned so the queue's storage can
/// be reused from frame to frame.
#[derive(Debug, Clone, Copy)]
struct BlendedDraw {
    mesh: Handle<Mesh>,
    material: Material,
    world: Mat4,
    distance_sq: f32,
}

pub struct ForwardPath {
    shader: Handle<Shader>,
    blended: Vec<BlendedDraw>,
    shading_channels: BoundChannels,
    material_channels: BoundChannels,
}

impl ForwardPath {
    pub fn new(shader: Handle<Shader>) -> Self {
        Self {
            shader,
            blended: Vec::new(),
            shading_channels: BoundChannels::new(),
            material_channels: BoundChannels::new(),
        }
    }

    /// Draws BLEND primitives back to front with alpha blending, depth test
    /// on and depth writes off. Opaque and masked primitives are ignored.
    pub fn render_scene_data(
        &mut self,
        device: &mut dyn GraphicsDevice,
        target: RenderTarget,
        data: &SceneRenderData,
        inputs: &ShadingInputs<'_>,
        assets: &Assets,
    ) -> Result<PassStats> {
        let camera = data.camera().ok_or(RenderError::MissingCamera)?;
        self.queue_blended(data, assets, camera.position);
        if self.blended.is_empty() {
            return Ok(PassStats::default());
        }

        device.bind_frame_buffer(target)?;
        let saved = SavedState::capture(device);
        let result = self.draw_blended(device, camera, inputs, assets);
        let released = self.shading_channels.release(device);
        saved.restore(device);

        let stats = result?;
        released?;
        log::trace!("Forward pass: {} blended draws", stats.drawn);
        Ok(stats)
    }

    fn queue_blended(&mut self, data: &SceneRenderData, assets: &Assets, eye: Vec3) {
        self.blended.clear();
        self.blended.extend(
            data.mesh_draws(assets)
                .filter(|draw| draw.material.is_blended())
                .map(|draw| BlendedDraw {
                    mesh: draw.handle,
                    material: *draw.material,
                    world: *draw.world,
                    distance_sq: draw.world_bounds().center().distance_squared(eye),
                }),
        );
        self.blended
            .sort_by(|a, b| b.distance_sq.total_cmp(&a.distance_sq));
    }

    fn draw_blended(
        &mut self,
        device: &mut dyn GraphicsDevice,
        camera: &CameraData,
        inputs: &ShadingInputs<'_>,
        assets: &Assets,
    ) -> Result<PassStats> {
        device.set_depth_state(DepthState {
            compare: wgpu::CompareFunction::Less,
            write: false,
        });
        device.set_blend_state(Some(wgpu::BlendState::ALPHA_BLENDING));
        device.bind_shader(self.shader)?;
        device.set_uniform(uniforms::VIEW_PROJ, camera.view_proj.into())?;
        device.set_uniform(uniforms::CAMERA_POSITION, camera.position.into())?;
        shading::bind_shading(device, inputs, &mut self.shading_channels)?;

        let mut stats = PassStats::default();
        for queued in &self.blended {
            let Some(mesh) = assets.meshes.get(queued.mesh) else {
                continue;
            };
            let mesh_draw = MeshDraw {
                handle: queued.mesh,
                mesh,
                material: &queued.material,
                world: &queued.world,
            };
            draw::draw_shaded(device, &mesh_draw, &camera.view_proj, &mut self.material_channels)?;
            stats.drawn += 1;
        }
        Ok(stats)
    }
}
