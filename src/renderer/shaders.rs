use crate::asset::Handle;
use crate::renderer::device::{GraphicsDevice, Shader, ShaderDescriptor, ShaderProgram};
use crate::renderer::postprocess::PostProcessShaders;

/// Every program a frame uses, created once with the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShaderLibrary {
    pub shadow_depth: Handle<Shader>,
    pub gbuffer: Handle<Shader>,
    pub light_pass: Handle<Shader>,
    pub forward: Handle<Shader>,
    pub skybox: Handle<Shader>,
    pub particles: Handle<Shader>,
    pub bloom: Handle<Shader>,
    pub tone_map: Handle<Shader>,
    pub fxaa: Handle<Shader>,
}

impl ShaderLibrary {
    pub fn new(device: &mut dyn GraphicsDevice) -> Self {
        let mut create =
            |label: &str, program| device.create_shader(&ShaderDescriptor::new(label, program));

        Self {
            shadow_depth: create("ShadowDepthShader", ShaderProgram::ShadowDepth),
            gbuffer: create("GBufferShader", ShaderProgram::GBuffer),
            light_pass: create("LightPassShader", ShaderProgram::LightPass),
            forward: create("ForwardShader", ShaderProgram::Forward),
            skybox: create("SkyboxShader", ShaderProgram::Skybox),
            particles: create("ParticleShader", ShaderProgram::Particles),
            bloom: create("BloomShader", ShaderProgram::Bloom),
            tone_map: create("ToneMapShader", ShaderProgram::ToneMap),
            fxaa: create("FxaaShader", ShaderProgram::Fxaa),
        }
    }

    pub fn post_process(&self) -> PostProcessShaders {
        PostProcessShaders {
            bloom: self.bloom,
            tone_map: self.tone_map,
            fxaa: self.fxaa,
        }
    }
}
