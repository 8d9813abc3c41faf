//! Image-space effects applied to the lit HDR frame: bloom through a
//! down/up-sampled mip chain, tone mapping with bloom composite, then FXAA.

use glam::Vec4;
use serde::{Deserialize, Serialize};

use crate::asset::Handle;
use crate::error::Result;
use crate::renderer::device::{
    ClearFlags, ClearValues, DepthState, FrameBuffer, FrameBufferDescriptor, GraphicsDevice,
    RasterState, RenderTarget, Shader, UniformValue, Viewport, CLEAR_DEPTH,
};
use crate::renderer::draw::{BoundChannels, SavedState};
use crate::renderer::uniforms::channel;
use crate::renderer::Texture;
use crate::settings::PostProcessSettings;

pub const BLOOM_MIP_COUNT: usize = 5;
pub const BLOOM_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub const OUTPUT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

const BLOOM_STAGE: &str = "u_bloom_stage";
const BLOOM_THRESHOLD: &str = "u_bloom_threshold";
const BLOOM_INTENSITY: &str = "u_bloom_intensity";
const BLOOM_ENABLED: &str = "u_bloom_enabled";
const EXPOSURE: &str = "u_exposure";
const TEXEL_SIZE: &str = "u_texel_size";
const FXAA_PARAMS: &str = "u_fxaa_params";

const STAGE_PREFILTER: u32 = 0;
const STAGE_DOWNSAMPLE: u32 = 1;
const STAGE_UPSAMPLE: u32 = 2;

/// FXAA 3.11 quality presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FxaaQuality {
    Off,
    Low,
    #[default]
    Medium,
    High,
}

impl FxaaQuality {
    /// Edge threshold, minimum edge threshold and sub-pixel amount, or `None`
    /// when FXAA is disabled.
    pub fn params(self) -> Option<Vec4> {
        match self {
            Self::Off => None,
            Self::Low => Some(Vec4::new(0.250, 0.0833, 0.50, 0.0)),
            Self::Medium => Some(Vec4::new(0.166, 0.0625, 0.75, 0.0)),
            Self::High => Some(Vec4::new(0.125, 0.0312, 1.00, 0.0)),
        }
    }
}

/// Turns a rendered image into the image to present.
pub trait PostProcessor {
    fn process(
        &mut self,
        device: &mut dyn GraphicsDevice,
        image: Handle<Texture>,
    ) -> Result<Handle<Texture>>;

    fn resize(&mut self, _device: &mut dyn GraphicsDevice, _width: u32, _height: u32) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostProcessShaders {
    pub bloom: Handle<Shader>,
    pub tone_map: Handle<Shader>,
    pub fxaa: Handle<Shader>,
}

#[derive(Debug, Clone, Copy)]
struct EffectTarget {
    frame_buffer: Handle<FrameBuffer>,
    texture: Handle<Texture>,
    width: u32,
    height: u32,
}

impl EffectTarget {
    fn create(
        device: &mut dyn GraphicsDevice,
        label: String,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    ) -> Result<Self> {
        let frame_buffer = device.create_frame_buffer(&FrameBufferDescriptor {
            label,
            width,
            height,
            color_formats: vec![format],
            depth_format: None,
        });
        Ok(Self {
            frame_buffer,
            texture: device.color_texture(frame_buffer, 0)?,
            width,
            height,
        })
    }

    fn viewport(&self) -> Viewport {
        Viewport::new(self.width, self.height)
    }
}

struct EffectTargets {
    bloom_down: Vec<EffectTarget>,
    bloom_up: Vec<EffectTarget>,
    composite: EffectTarget,
    fxaa: EffectTarget,
}

impl EffectTargets {
    fn create(device: &mut dyn GraphicsDevice, width: u32, height: u32) -> Result<Self> {
        let mut bloom_down = Vec::with_capacity(BLOOM_MIP_COUNT);
        let mut bloom_up = Vec::with_capacity(BLOOM_MIP_COUNT - 1);
        let mut mip_width = (width.max(2) / 2).max(1);
        let mut mip_height = (height.max(2) / 2).max(1);

        for level in 0..BLOOM_MIP_COUNT {
            bloom_down.push(EffectTarget::create(
                device,
                format!("BloomDown{level}"),
                mip_width,
                mip_height,
                BLOOM_FORMAT,
            )?);
            if level + 1 < BLOOM_MIP_COUNT {
                bloom_up.push(EffectTarget::create(
                    device,
                    format!("BloomUp{level}"),
                    mip_width,
                    mip_height,
                    BLOOM_FORMAT,
                )?);
            }
            mip_width = (mip_width / 2).max(1);
            mip_height = (mip_height / 2).max(1);
        }

        Ok(Self {
            bloom_down,
            bloom_up,
            composite: EffectTarget::create(device, "Composite".into(), width, height, OUTPUT_FORMAT)?,
            fxaa: EffectTarget::create(device, "Fxaa".into(), width, height, OUTPUT_FORMAT)?,
        })
    }

    fn destroy(&self, device: &mut dyn GraphicsDevice) -> Result<()> {
        self.bloom_down
            .iter()
            .chain(&self.bloom_up)
            .chain([&self.composite, &self.fxaa])
            .try_for_each(|target| device.destroy_frame_buffer(target.frame_buffer))
    }
}

pub struct PostProcessChain {
    shaders: PostProcessShaders,
    settings: PostProcessSettings,
    targets: EffectTargets,
    channels: BoundChannels,
    width: u32,
    height: u32,
}

impl PostProcessChain {
    pub fn new(
        device: &mut dyn GraphicsDevice,
        shaders: PostProcessShaders,
        settings: PostProcessSettings,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let targets = EffectTargets::create(device, width, height)?;
        log::info!(
            "Post-process chain {}x{}: bloom {}, fxaa {:?}",
            width,
            height,
            settings.bloom,
            settings.fxaa
        );
        Ok(Self {
            shaders,
            settings,
            targets,
            channels: BoundChannels::new(),
            width,
            height,
        })
    }

    pub fn settings(&self) -> &PostProcessSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: PostProcessSettings) {
        self.settings = settings;
    }

    fn run_chain(&mut self, device: &mut dyn GraphicsDevice, image: Handle<Texture>) -> Result<Handle<Texture>> {
        device.set_raster_state(RasterState {
            cull_mode: None,
            ..RasterState::default()
        });
        device.set_depth_state(DepthState {
            compare: wgpu::CompareFunction::Always,
            write: false,
        });
        device.set_blend_state(None);

        let bloom = if self.settings.bloom {
            Some(self.run_bloom(device, image)?)
        } else {
            None
        };

        let composite = self.targets.composite;
        let mut inputs = vec![(channel::POST_INPUT, image)];
        if let Some(bloom) = bloom {
            inputs.push((channel::POST_BLOOM, bloom));
        }
        self.run_pass(
            device,
            self.shaders.tone_map,
            &composite,
            &inputs,
            &[
                (EXPOSURE, self.settings.exposure.into()),
                (BLOOM_ENABLED, bloom.is_some().into()),
                (BLOOM_INTENSITY, self.settings.bloom_intensity.into()),
            ],
        )?;

        let Some(fxaa_params) = self.settings.fxaa.params() else {
            return Ok(composite.texture);
        };
        let fxaa = self.targets.fxaa;
        let texel_size = Vec4::new(
            1.0 / fxaa.width as f32,
            1.0 / fxaa.height as f32,
            fxaa.width as f32,
            fxaa.height as f32,
        );
        self.run_pass(
            device,
            self.shaders.fxaa,
            &fxaa,
            &[(channel::POST_INPUT, composite.texture)],
            &[(TEXEL_SIZE, texel_size.into()), (FXAA_PARAMS, fxaa_params.into())],
        )?;
        Ok(fxaa.texture)
    }

    /// Prefilters into the first down mip, halves down the chain, then adds
    /// each level back on the way up. Returns the half-resolution result.
    fn run_bloom(&mut self, device: &mut dyn GraphicsDevice, image: Handle<Texture>) -> Result<Handle<Texture>> {
        let shader = self.shaders.bloom;
        let threshold = self.settings.bloom_threshold;

        let first = self.targets.bloom_down[0];
        self.run_pass(
            device,
            shader,
            &first,
            &[(channel::POST_INPUT, image)],
            &[
                (BLOOM_STAGE, STAGE_PREFILTER.into()),
                (BLOOM_THRESHOLD, threshold.into()),
            ],
        )?;

        for level in 1..BLOOM_MIP_COUNT {
            let source = self.targets.bloom_down[level - 1].texture;
            let target = self.targets.bloom_down[level];
            self.run_pass(
                device,
                shader,
                &target,
                &[(channel::POST_INPUT, source)],
                &[(BLOOM_STAGE, STAGE_DOWNSAMPLE.into())],
            )?;
        }

        let mut source = self.targets.bloom_down[BLOOM_MIP_COUNT - 1].texture;
        for level in (0..BLOOM_MIP_COUNT - 1).rev() {
            let target = self.targets.bloom_up[level];
            let detail = self.targets.bloom_down[level].texture;
            self.run_pass(
                device,
                shader,
                &target,
                &[(channel::POST_INPUT, source), (channel::POST_BLOOM, detail)],
                &[(BLOOM_STAGE, STAGE_UPSAMPLE.into())],
            )?;
            source = target.texture;
        }

        Ok(source)
    }

    fn run_pass(
        &mut self,
        device: &mut dyn GraphicsDevice,
        shader: Handle<Shader>,
        target: &EffectTarget,
        inputs: &[(u32, Handle<Texture>)],
        values: &[(&str, UniformValue)],
    ) -> Result<()> {
        device.bind_frame_buffer(RenderTarget::FrameBuffer(target.frame_buffer))?;
        device.set_viewport(target.viewport());
        device.clear(&ClearValues {
            flags: ClearFlags::COLOR,
            color: wgpu::Color::BLACK,
            depth: CLEAR_DEPTH,
        })?;
        device.bind_shader(shader)?;
        for (name, value) in values {
            device.set_uniform(name, *value)?;
        }

        let result = inputs
            .iter()
            .try_for_each(|&(slot, texture)| self.channels.bind(device, slot, texture))
            .and_then(|()| device.draw_fullscreen_quad());
        let released = self.channels.release(device);
        result.and(released)
    }
}

impl PostProcessor for PostProcessChain {
    fn process(
        &mut self,
        device: &mut dyn GraphicsDevice,
        image: Handle<Texture>,
    ) -> Result<Handle<Texture>> {
        let saved = SavedState::capture(device);
        let result = self.run_chain(device, image);
        device.unbind_frame_buffer();
        saved.restore(device);
        result
    }

    fn resize(&mut self, device: &mut dyn GraphicsDevice, width: u32, height: u32) -> Result<()> {
        if width == self.width && height == self.height {
            return Ok(());
        }
        self.targets.destroy(device)?;
        self.targets = EffectTargets::create(device, width, height)?;
        self.width = width;
        self.height = height;
        log::debug!("Resized post-process targets to {}x{}", width, height);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::device::{ShaderDescriptor, ShaderProgram, TextureDescriptor};
    use crate::renderer::HeadlessDevice;

    fn chain(device: &mut HeadlessDevice, settings: PostProcessSettings) -> PostProcessChain {
        let shaders = PostProcessShaders {
            bloom: device.create_shader(&ShaderDescriptor::new("Bloom", ShaderProgram::Bloom)),
            tone_map: device.create_shader(&ShaderDescriptor::new("ToneMap", ShaderProgram::ToneMap)),
            fxaa: device.create_shader(&ShaderDescriptor::new("Fxaa", ShaderProgram::Fxaa)),
        };
        PostProcessChain::new(device, shaders, settings, 320, 180).unwrap()
    }

    fn hdr_image(device: &mut HeadlessDevice) -> Handle<Texture> {
        device.create_texture(&TextureDescriptor::d2("Hdr", 320, 180, BLOOM_FORMAT))
    }

    #[test]
    fn full_chain_runs_every_effect() {
        let mut device = HeadlessDevice::new(320, 180);
        let mut chain = chain(&mut device, PostProcessSettings::default());
        let image = hdr_image(&mut device);

        let output = chain.process(&mut device, image).unwrap();

        assert_eq!(device.draws_with(ShaderProgram::Bloom).count(), 2 * BLOOM_MIP_COUNT - 1);
        assert_eq!(device.draws_with(ShaderProgram::ToneMap).count(), 1);
        assert_eq!(device.draws_with(ShaderProgram::Fxaa).count(), 1);
        assert_eq!(output, chain.targets.fxaa.texture);
        assert!(device.bound_channels().is_empty());
    }

    #[test]
    fn disabled_effects_are_skipped() {
        let mut device = HeadlessDevice::new(320, 180);
        let settings = PostProcessSettings {
            bloom: false,
            fxaa: FxaaQuality::Off,
            ..PostProcessSettings::default()
        };
        let mut chain = chain(&mut device, settings);
        let image = hdr_image(&mut device);

        let output = chain.process(&mut device, image).unwrap();

        assert_eq!(device.draws_with(ShaderProgram::Bloom).count(), 0);
        assert_eq!(device.draws_with(ShaderProgram::Fxaa).count(), 0);
        assert_eq!(output, chain.targets.composite.texture);
    }

    #[test]
    fn bloom_chain_halves_each_level() {
        let mut device = HeadlessDevice::new(320, 180);
        let chain = chain(&mut device, PostProcessSettings::default());
        let sizes: Vec<_> = chain
            .targets
            .bloom_down
            .iter()
            .map(|t| (t.width, t.height))
            .collect();
        assert_eq!(sizes, vec![(160, 90), (80, 45), (40, 22), (20, 11), (10, 5)]);
    }

    #[test]
    fn fxaa_presets_tighten_with_quality() {
        let low = FxaaQuality::Low.params().unwrap();
        let high = FxaaQuality::High.params().unwrap();
        assert!(high.x < low.x);
        assert!(FxaaQuality::Off.params().is_none());
    }
}
