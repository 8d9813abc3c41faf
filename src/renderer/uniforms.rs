//! Fixed texture channels and uniform names shared by the render passes.

/// Texture channel assignments. Material channels and G-buffer channels
/// overlap because no pass uses both sets at once.
pub mod channel {
    pub const BASE_COLOR: u32 = 0;
    pub const METALLIC_ROUGHNESS: u32 = 1;
    pub const NORMAL: u32 = 2;
    pub const EMISSIVE: u32 = 3;
    pub const OCCLUSION: u32 = 4;

    pub const GBUFFER_ALBEDO: u32 = 0;
    pub const GBUFFER_NORMAL: u32 = 1;
    pub const GBUFFER_EMISSIVE: u32 = 2;
    pub const GBUFFER_OCCLUSION: u32 = 3;
    pub const GBUFFER_DEPTH: u32 = 4;

    /// First of `CASCADE_COUNT` consecutive shadow cascade channels.
    pub const SHADOW_CASCADE_0: u32 = 5;

    pub const IRRADIANCE: u32 = 9;
    pub const PREFILTERED_SPECULAR: u32 = 10;
    pub const BRDF_LUT: u32 = 11;

    pub const SKYBOX: u32 = 0;
    pub const PARTICLE: u32 = 0;
    pub const POST_INPUT: u32 = 0;
    pub const POST_BLOOM: u32 = 1;
}

pub const WORLD: &str = "u_world";
pub const WORLD_VIEW_PROJ: &str = "u_world_view_proj";
pub const VIEW_PROJ: &str = "u_view_proj";
pub const INVERSE_VIEW_PROJ: &str = "u_inverse_view_proj";
pub const VIEW: &str = "u_view";
pub const CAMERA_POSITION: &str = "u_camera_position";
pub const LIGHT_VIEW_PROJ: &str = "u_light_view_proj";

pub const BASE_COLOR_FACTOR: &str = "u_base_color_factor";
pub const METALLIC_FACTOR: &str = "u_metallic_factor";
pub const ROUGHNESS_FACTOR: &str = "u_roughness_factor";
pub const EMISSIVE_FACTOR: &str = "u_emissive_factor";
pub const OCCLUSION_STRENGTH: &str = "u_occlusion_strength";
pub const ALPHA_MODE: &str = "u_alpha_mode";
pub const ALPHA_CUTOFF: &str = "u_alpha_cutoff";
pub const MATERIAL_FLAGS: &str = "u_material_flags";

pub const LIGHTS_BLOCK: &str = "Lights";
pub const CASCADES_BLOCK: &str = "ShadowCascades";
pub const SHADOWS_ENABLED: &str = "u_shadows_enabled";
pub const IBL_ENABLED: &str = "u_ibl_enabled";
pub const IBL_INTENSITY: &str = "u_ibl_intensity";
