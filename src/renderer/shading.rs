//! Lighting inputs shared by the deferred light pass and the forward pass:
//! the light arrays, shadow cascades and image-based lighting maps.

use crate::asset::Handle;
use crate::environment::EnvironmentMaps;
use crate::error::Result;
use crate::renderer::csm::{CascadedShadowMap, CascadesUniform};
use crate::renderer::device::GraphicsDevice;
use crate::renderer::draw::BoundChannels;
use crate::renderer::lights::{LightsData, LightsUniform};
use crate::renderer::uniforms::{self, channel};
use crate::renderer::Texture;

/// Image-based lighting for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IblMaps {
    pub irradiance: Handle<Texture>,
    pub specular: Handle<Texture>,
    pub brdf_lut: Handle<Texture>,
    pub intensity: f32,
}

impl IblMaps {
    pub fn from_environment(environment: &EnvironmentMaps, brdf_lut: Handle<Texture>) -> Self {
        Self {
            irradiance: environment.irradiance,
            specular: environment.specular,
            brdf_lut,
            intensity: environment.intensity,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ShadingInputs<'a> {
    pub lights: &'a LightsData,
    pub shadows: Option<&'a CascadedShadowMap>,
    pub ibl: Option<IblMaps>,
}

/// Uploads light and cascade blocks and binds cascade and IBL textures. The
/// shader must already be bound; channels land in `channels`.
pub(crate) fn bind_shading(
    device: &mut dyn GraphicsDevice,
    inputs: &ShadingInputs<'_>,
    channels: &mut BoundChannels,
) -> Result<()> {
    let lights = LightsUniform::from_data(inputs.lights);
    device.set_uniform_block(uniforms::LIGHTS_BLOCK, bytemuck::bytes_of(&lights))?;

    device.set_uniform(uniforms::SHADOWS_ENABLED, inputs.shadows.is_some().into())?;
    if let Some(shadows) = inputs.shadows {
        let block = CascadesUniform::from_shadow_map(shadows);
        device.set_uniform_block(uniforms::CASCADES_BLOCK, bytemuck::bytes_of(&block))?;
        for (i, cascade) in shadows.cascades.iter().enumerate() {
            channels.bind(device, channel::SHADOW_CASCADE_0 + i as u32, cascade.depth_texture)?;
        }
    }

    device.set_uniform(uniforms::IBL_ENABLED, inputs.ibl.is_some().into())?;
    if let Some(ibl) = inputs.ibl {
        device.set_uniform(uniforms::IBL_INTENSITY, ibl.intensity.into())?;
        channels.bind(device, channel::IRRADIANCE, ibl.irradiance)?;
        channels.bind(device, channel::PREFILTERED_SPECULAR, ibl.specular)?;
        channels.bind(device, channel::BRDF_LUT, ibl.brdf_lut)?;
    }

    Ok(())
}
