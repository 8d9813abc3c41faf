//! Draw helpers shared by the geometry, shadow and forward passes.

use glam::Mat4;

use crate::asset::Handle;
use crate::error::Result;
use crate::renderer::device::{DepthState, GraphicsDevice, RasterState, Viewport};
use crate::renderer::scene_data::MeshDraw;
use crate::renderer::uniforms;
use crate::renderer::{Material, Texture};

/// Draws issued and meshes rejected by frustum culling in one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    pub drawn: usize,
    pub culled: usize,
}

/// Fixed-function state a pass changes and puts back when it finishes.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SavedState {
    raster: RasterState,
    depth: DepthState,
    blend: Option<wgpu::BlendState>,
    viewport: Viewport,
}

impl SavedState {
    pub(crate) fn capture(device: &dyn GraphicsDevice) -> Self {
        Self {
            raster: device.raster_state(),
            depth: device.depth_state(),
            blend: device.blend_state(),
            viewport: device.viewport(),
        }
    }

    pub(crate) fn restore(self, device: &mut dyn GraphicsDevice) {
        device.set_raster_state(self.raster);
        device.set_depth_state(self.depth);
        device.set_blend_state(self.blend);
        device.set_viewport(self.viewport);
    }
}

/// Texture channels bound by one pass or draw, released in reverse order.
#[derive(Debug, Default)]
pub(crate) struct BoundChannels {
    channels: Vec<u32>,
}

impl BoundChannels {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn bind(
        &mut self,
        device: &mut dyn GraphicsDevice,
        channel: u32,
        texture: Handle<Texture>,
    ) -> Result<()> {
        device.bind_texture(channel, texture)?;
        self.channels.push(channel);
        Ok(())
    }

    /// Unbinds everything, even after a failed unbind; reports the first error.
    pub(crate) fn release(&mut self, device: &mut dyn GraphicsDevice) -> Result<()> {
        let mut result = Ok(());
        while let Some(channel) = self.channels.pop() {
            let unbound = device.unbind_texture(channel);
            if result.is_ok() {
                result = unbound;
            }
        }
        result
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

pub(crate) fn set_transform_uniforms(
    device: &mut dyn GraphicsDevice,
    world: &Mat4,
    view_proj: &Mat4,
) -> Result<()> {
    device.set_uniform(uniforms::WORLD, (*world).into())?;
    device.set_uniform(uniforms::WORLD_VIEW_PROJ, (*view_proj * *world).into())
}

pub(crate) fn set_material_uniforms(device: &mut dyn GraphicsDevice, material: &Material) -> Result<()> {
    device.set_uniform(
        uniforms::BASE_COLOR_FACTOR,
        glam::Vec4::from_array(material.base_color_factor).into(),
    )?;
    device.set_uniform(uniforms::METALLIC_FACTOR, material.metallic_factor.into())?;
    device.set_uniform(uniforms::ROUGHNESS_FACTOR, material.roughness_factor.into())?;
    device.set_uniform(
        uniforms::EMISSIVE_FACTOR,
        glam::Vec3::from_array(material.emissive_factor).into(),
    )?;
    device.set_uniform(uniforms::OCCLUSION_STRENGTH, material.occlusion_strength.into())?;
    device.set_uniform(uniforms::ALPHA_MODE, material.alpha_mode.as_u32().into())?;
    device.set_uniform(uniforms::ALPHA_CUTOFF, material.alpha_cutoff.into())?;
    device.set_uniform(uniforms::MATERIAL_FLAGS, material.flags().bits().into())
}

/// Issues one draw with culling disabled for double-sided materials.
pub(crate) fn draw_with_sidedness(device: &mut dyn GraphicsDevice, draw: &MeshDraw<'_>) -> Result<()> {
    if !draw.material.double_sided {
        return device.draw_mesh(draw.handle, draw.mesh);
    }

    let raster = device.raster_state();
    device.set_raster_state(RasterState {
        cull_mode: None,
        ..raster
    });
    let result = device.draw_mesh(draw.handle, draw.mesh);
    device.set_raster_state(raster);
    result
}

/// Full material draw: transform and material uniforms, material textures on
/// their fixed channels, the draw, then the channels released again.
pub(crate) fn draw_shaded(
    device: &mut dyn GraphicsDevice,
    draw: &MeshDraw<'_>,
    view_proj: &Mat4,
    channels: &mut BoundChannels,
) -> Result<()> {
    let result = bind_and_draw(device, draw, view_proj, channels);
    let released = channels.release(device);
    debug_assert!(channels.is_empty());
    result.and(released)
}

fn bind_and_draw(
    device: &mut dyn GraphicsDevice,
    draw: &MeshDraw<'_>,
    view_proj: &Mat4,
    channels: &mut BoundChannels,
) -> Result<()> {
    set_transform_uniforms(device, draw.world, view_proj)?;
    set_material_uniforms(device, draw.material)?;
    for (channel, texture) in draw.material.textures.bindings() {
        channels.bind(device, channel, texture)?;
    }
    log::trace!("Drawing '{}'", draw.mesh.label);
    draw_with_sidedness(device, draw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::Mesh;
    use crate::error::RenderError;
    use crate::renderer::device::{
        RenderTarget, ShaderDescriptor, ShaderProgram, TextureDescriptor,
    };
    use crate::renderer::HeadlessDevice;

    fn bound_device() -> HeadlessDevice {
        let mut device = HeadlessDevice::new(32, 32);
        let shader = device.create_shader(&ShaderDescriptor::new("Geometry", ShaderProgram::GBuffer));
        device.bind_frame_buffer(RenderTarget::Screen).unwrap();
        device.bind_shader(shader).unwrap();
        device
    }

    fn texture(device: &mut HeadlessDevice) -> Handle<Texture> {
        device.create_texture(&TextureDescriptor::d2(
            "T",
            4,
            4,
            wgpu::TextureFormat::Rgba8Unorm,
        ))
    }

    #[test]
    fn release_unbinds_everything_and_reports_first_error() {
        let mut device = bound_device();
        let t = texture(&mut device);
        let mut channels = BoundChannels::new();
        channels.bind(&mut device, 0, t).unwrap();
        channels.bind(&mut device, 2, t).unwrap();
        device.unbind_texture(2).unwrap();

        assert_eq!(
            channels.release(&mut device),
            Err(RenderError::ChannelNotBound { channel: 2 })
        );
        assert!(channels.is_empty());
        assert!(device.bound_channels().is_empty());
    }

    #[test]
    fn double_sided_draw_disables_culling_only_for_itself() {
        let mut device = bound_device();
        let mesh = Mesh::cube("Leaf");
        let material = Material::white().with_double_sided(true);
        let world = Mat4::IDENTITY;
        let draw = MeshDraw {
            handle: Handle::new(0),
            mesh: &mesh,
            material: &material,
            world: &world,
        };

        draw_with_sidedness(&mut device, &draw).unwrap();

        let recorded = device.draws().next().unwrap();
        assert_eq!(recorded.raster.cull_mode, None);
        assert_eq!(device.raster_state(), RasterState::default());
    }

    #[test]
    fn shaded_draw_leaves_no_channels_bound() {
        let mut device = bound_device();
        let albedo = texture(&mut device);
        let mesh = Mesh::cube("Crate");
        let material = Material::pbr().with_base_color_texture(albedo);
        let world = Mat4::from_translation(glam::Vec3::X);
        let draw = MeshDraw {
            handle: Handle::new(0),
            mesh: &mesh,
            material: &material,
            world: &world,
        };
        let mut channels = BoundChannels::new();

        draw_shaded(&mut device, &draw, &Mat4::IDENTITY, &mut channels).unwrap();

        let recorded = device.draws().next().unwrap();
        assert_eq!(recorded.textures, vec![(uniforms::channel::BASE_COLOR, albedo)]);
        assert!(device.bound_channels().is_empty());
    }

    #[test]
    fn saved_state_puts_everything_back() {
        let mut device = bound_device();
        let saved = SavedState::capture(&device);
        device.set_raster_state(RasterState {
            cull_mode: Some(wgpu::Face::Front),
            depth_clamp: true,
            ..RasterState::default()
        });
        device.set_depth_state(DepthState {
            compare: wgpu::CompareFunction::Always,
            write: false,
        });
        device.set_blend_state(Some(wgpu::BlendState::ALPHA_BLENDING));
        device.set_viewport(Viewport::new(8, 8));

        saved.restore(&mut device);

        assert_eq!(device.raster_state(), RasterState::default());
        assert_eq!(device.depth_state(), DepthState::default());
        assert_eq!(device.blend_state(), None);
        assert_eq!(device.viewport(), Viewport::new(32, 32));
    }
}
