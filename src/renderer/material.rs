// renderer/material.rs (PBR metallic-roughness)

use bitflags::bitflags;

use crate::asset::Handle;
use crate::renderer::uniforms::channel;
use crate::renderer::Texture;

/// Decides the rendering path: OPAQUE and MASK go through the G-buffer,
/// BLEND through the forward pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AlphaMode {
    #[default]
    Opaque,
    Mask,
    Blend,
}

impl AlphaMode {
    pub fn as_u32(self) -> u32 {
        match self {
            Self::Opaque => 0,
            Self::Mask => 1,
            Self::Blend => 2,
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MaterialFlags: u32 {
        const BASE_COLOR_TEXTURE = 1 << 0;
        const METALLIC_ROUGHNESS_TEXTURE = 1 << 1;
        const NORMAL_TEXTURE = 1 << 2;
        const EMISSIVE_TEXTURE = 1 << 3;
        const OCCLUSION_TEXTURE = 1 << 4;
        const DOUBLE_SIDED = 1 << 5;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MaterialTextures {
    pub base_color: Option<Handle<Texture>>,
    pub metallic_roughness: Option<Handle<Texture>>,
    pub normal: Option<Handle<Texture>>,
    pub emissive: Option<Handle<Texture>>,
    pub occlusion: Option<Handle<Texture>>,
}

impl MaterialTextures {
    /// Present textures paired with the fixed channel they bind to.
    pub fn bindings(&self) -> impl Iterator<Item = (u32, Handle<Texture>)> {
        [
            (channel::BASE_COLOR, self.base_color),
            (channel::METALLIC_ROUGHNESS, self.metallic_roughness),
            (channel::NORMAL, self.normal),
            (channel::EMISSIVE, self.emissive),
            (channel::OCCLUSION, self.occlusion),
        ]
        .into_iter()
        .filter_map(|(channel, texture)| texture.map(|t| (channel, t)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub base_color_factor: [f32; 4],
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    pub emissive_factor: [f32; 3],
    pub occlusion_strength: f32,
    pub alpha_mode: AlphaMode,
    pub alpha_cutoff: f32,
    pub double_sided: bool,
    pub textures: MaterialTextures,
}

impl Material {
    pub fn new(color: [f32; 4]) -> Self {
        Self {
            base_color_factor: color,
            metallic_factor: 0.0,
            roughness_factor: 1.0,
            emissive_factor: [0.0; 3],
            occlusion_strength: 1.0,
            alpha_mode: AlphaMode::Opaque,
            alpha_cutoff: 0.5,
            double_sided: false,
            textures: MaterialTextures::default(),
        }
    }

    pub fn pbr() -> Self {
        Self::new([1.0, 1.0, 1.0, 1.0])
            .with_metallic(0.0)
            .with_roughness(0.5)
    }

    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::new([r, g, b, 1.0])
    }

    pub fn white() -> Self {
        Self::rgb(1.0, 1.0, 1.0)
    }

    pub fn with_metallic(mut self, metallic: f32) -> Self {
        self.metallic_factor = metallic.clamp(0.0, 1.0);
        self
    }

    pub fn with_roughness(mut self, roughness: f32) -> Self {
        self.roughness_factor = roughness.clamp(0.0, 1.0);
        self
    }

    pub fn with_emissive(mut self, emissive: [f32; 3]) -> Self {
        self.emissive_factor = emissive;
        self
    }

    pub fn with_alpha_mode(mut self, mode: AlphaMode) -> Self {
        self.alpha_mode = mode;
        self
    }

    pub fn with_alpha_blend(self) -> Self {
        self.with_alpha_mode(AlphaMode::Blend)
    }

    pub fn with_alpha_mask(mut self, cutoff: f32) -> Self {
        self.alpha_mode = AlphaMode::Mask;
        self.alpha_cutoff = cutoff.clamp(0.0, 1.0);
        self
    }

    pub fn with_double_sided(mut self, double_sided: bool) -> Self {
        self.double_sided = double_sided;
        self
    }

    pub fn with_base_color_texture(mut self, texture: Handle<Texture>) -> Self {
        self.textures.base_color = Some(texture);
        self
    }

    pub fn with_metallic_roughness_texture(mut self, texture: Handle<Texture>) -> Self {
        self.textures.metallic_roughness = Some(texture);
        self
    }

    pub fn with_normal_texture(mut self, texture: Handle<Texture>) -> Self {
        self.textures.normal = Some(texture);
        self
    }

    pub fn with_emissive_texture(mut self, texture: Handle<Texture>) -> Self {
        self.textures.emissive = Some(texture);
        self
    }

    pub fn with_occlusion_texture(mut self, texture: Handle<Texture>) -> Self {
        self.textures.occlusion = Some(texture);
        self
    }

    pub fn is_blended(&self) -> bool {
        self.alpha_mode == AlphaMode::Blend
    }

    pub fn flags(&self) -> MaterialFlags {
        let mut flags = MaterialFlags::empty();
        flags.set(MaterialFlags::BASE_COLOR_TEXTURE, self.textures.base_color.is_some());
        flags.set(
            MaterialFlags::METALLIC_ROUGHNESS_TEXTURE,
            self.textures.metallic_roughness.is_some(),
        );
        flags.set(MaterialFlags::NORMAL_TEXTURE, self.textures.normal.is_some());
        flags.set(MaterialFlags::EMISSIVE_TEXTURE, self.textures.emissive.is_some());
        flags.set(MaterialFlags::OCCLUSION_TEXTURE, self.textures.occlusion.is_some());
        flags.set(MaterialFlags::DOUBLE_SIDED, self.double_sided);
        flags
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::white()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_follow_present_textures() {
        let material = Material::pbr()
            .with_normal_texture(Handle::new(2))
            .with_double_sided(true);
        let flags = material.flags();
        assert!(flags.contains(MaterialFlags::NORMAL_TEXTURE | MaterialFlags::DOUBLE_SIDED));
        assert!(!flags.contains(MaterialFlags::BASE_COLOR_TEXTURE));
    }

    #[test]
    fn bindings_use_fixed_channels() {
        let material = Material::pbr()
            .with_base_color_texture(Handle::new(7))
            .with_occlusion_texture(Handle::new(9));
        let bindings: Vec<_> = material.textures.bindings().collect();
        assert_eq!(
            bindings,
            vec![
                (channel::BASE_COLOR, Handle::new(7)),
                (channel::OCCLUSION, Handle::new(9))
            ]
        );
    }

    #[test]
    fn mask_cutoff_is_clamped() {
        let material = Material::white().with_alpha_mask(3.0);
        assert_eq!(material.alpha_mode, AlphaMode::Mask);
        assert_eq!(material.alpha_cutoff, 1.0);
        assert!(!material.is_blended());
    }
}
