//! Particle emitters, drawn after the opaque result and before blended
//! meshes.

use crate::asset::{Assets, Handle};
use crate::error::{RenderError, Result};
use crate::renderer::device::{DepthState, GraphicsDevice, RasterState, RenderTarget, Shader};
use crate::renderer::draw::SavedState;
use crate::renderer::scene_data::{CameraData, EmitterInstance};
use crate::renderer::uniforms::{self, channel};
use crate::scene::ParticleBlend;

pub const PARTICLE_COUNT: &str = "u_particle_count";
pub const PARTICLE_SIZE: &str = "u_particle_size";

/// Source alpha scaled, destination kept.
pub const ADDITIVE_BLENDING: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::SrcAlpha,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
};

pub fn blend_state(blend: ParticleBlend) -> wgpu::BlendState {
    match blend {
        ParticleBlend::Additive => ADDITIVE_BLENDING,
        ParticleBlend::Alpha => wgpu::BlendState::ALPHA_BLENDING,
    }
}

pub struct ParticleRenderer {
    shader: Handle<Shader>,
    camera: Option<CameraData>,
}

impl ParticleRenderer {
    pub fn new(shader: Handle<Shader>) -> Self {
        Self {
            shader,
            camera: None,
        }
    }

    pub fn set_camera(&mut self, camera: Option<CameraData>) {
        self.camera = camera;
    }

    /// Returns the number of emitters drawn.
    pub fn render(
        &mut self,
        device: &mut dyn GraphicsDevice,
        target: RenderTarget,
        emitters: &[EmitterInstance],
        assets: &Assets,
    ) -> Result<usize> {
        if emitters.is_empty() {
            return Ok(0);
        }
        let camera = self.camera.ok_or(RenderError::ParticlesWithoutCamera)?;

        device.bind_frame_buffer(target)?;
        let saved = SavedState::capture(device);
        let result = self.draw_emitters(device, &camera, emitters, assets);
        saved.restore(device);
        result
    }

    fn draw_emitters(
        &self,
        device: &mut dyn GraphicsDevice,
        camera: &CameraData,
        emitters: &[EmitterInstance],
        assets: &Assets,
    ) -> Result<usize> {
        device.set_raster_state(RasterState {
            cull_mode: None,
            ..RasterState::default()
        });
        device.set_depth_state(DepthState {
            compare: wgpu::CompareFunction::Less,
            write: false,
        });
        device.bind_shader(self.shader)?;
        device.set_uniform(uniforms::VIEW_PROJ, camera.view_proj.into())?;
        device.set_uniform(uniforms::CAMERA_POSITION, camera.position.into())?;

        let mut drawn = 0;
        for instance in emitters {
            let emitter = &instance.emitter;
            if emitter.particle_count == 0 {
                continue;
            }
            let Some(mesh) = assets.meshes.get(emitter.mesh) else {
                log::warn!("Particle mesh {:?} is not loaded; skipping emitter", emitter.mesh);
                continue;
            };

            device.set_blend_state(Some(blend_state(emitter.blend)));
            device.set_uniform(uniforms::WORLD, instance.world.into())?;
            device.set_uniform(PARTICLE_COUNT, emitter.particle_count.into())?;
            device.set_uniform(PARTICLE_SIZE, emitter.particle_size.into())?;

            match emitter.texture {
                Some(texture) => {
                    device.bind_texture(channel::PARTICLE, texture)?;
                    let result = device.draw_mesh(emitter.mesh, mesh);
                    let unbound = device.unbind_texture(channel::PARTICLE);
                    result.and(unbound)?;
                }
                None => device.draw_mesh(emitter.mesh, mesh)?,
            }
            drawn += 1;
        }
        Ok(drawn)
    }
}
