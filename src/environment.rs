use crate::asset::Handle;
use crate::renderer::Texture;

/// Pre-filtered image-based lighting maps for one environment.
///
/// All three are cubemaps produced offline or by an external pre-filter step;
/// the renderer only binds them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvironmentMaps {
    /// Source radiance, drawn as the skybox.
    pub radiance: Handle<Texture>,
    /// Cosine-convolved radiance for diffuse IBL.
    pub irradiance: Handle<Texture>,
    /// Roughness-mipped radiance for specular IBL.
    pub specular: Handle<Texture>,
    pub intensity: f32,
}

impl EnvironmentMaps {
    pub fn new(
        radiance: Handle<Texture>,
        irradiance: Handle<Texture>,
        specular: Handle<Texture>,
    ) -> Self {
        Self {
            radiance,
            irradiance,
            specular,
            intensity: 1.0,
        }
    }

    pub fn with_intensity(mut self, intensity: f32) -> Self {
        self.intensity = intensity;
        self
    }
}
