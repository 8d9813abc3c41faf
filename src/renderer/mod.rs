pub mod csm;
pub mod device;
pub(crate) mod draw;
pub mod forward;
pub mod frustum;
pub mod gbuffer;
pub mod headless;
pub mod light_pass;
pub mod lights;
pub mod material;
pub mod particles;
pub mod pbr_renderer;
pub mod postprocess;
pub mod scene_data;
pub mod shaders;
pub mod shading;
pub mod skybox;
pub mod uniforms;

pub use csm::{
    compute_split_fractions, CascadedShadowMap, CascadesUniform, CsmConfig, CsmGenerator,
    CsmSplit, ShadowCascade, CASCADE_COUNT,
};
pub use device::{
    ClearFlags, ClearValues, DepthState, FrameBuffer, FrameBufferDescriptor, GraphicsDevice,
    RasterState, RenderTarget, Shader, ShaderDescriptor, ShaderProgram, Texture,
    TextureDescriptor, UniformValue, Viewport,
};
pub use draw::PassStats;
pub use forward::ForwardPath;
pub use frustum::{CameraFrustum, Frustum, FrustumPlanes, Plane};
pub use gbuffer::{GBuffer, GBufferGenerator};
pub use headless::{Command, DrawCall, DrawKind, HeadlessDevice};
pub use light_pass::LightPassRenderer;
pub use lights::{
    DirectionalLightData, LightsData, LightsUniform, PointLightData, SpotLightData,
};
pub use material::{AlphaMode, Material, MaterialFlags, MaterialTextures};
pub use particles::ParticleRenderer;
pub use pbr_renderer::{FrameOutput, FrameStats, PbrSceneRenderer};
pub use postprocess::{FxaaQuality, PostProcessChain, PostProcessShaders, PostProcessor};
pub use scene_data::{
    CameraData, EmitterInstance, MeshDraw, ModelInstance, SceneRenderData,
    SceneRenderDataCollector,
};
pub use shaders::ShaderLibrary;
pub use shading::{IblMaps, ShadingInputs};
pub use skybox::SkyboxRenderer;
