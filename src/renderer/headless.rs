//! Validating, recording implementation of [`GraphicsDevice`].
//!
//! Nothing reaches a GPU: every call is checked against the resource-state
//! rules the passes must follow and appended to a command log. Used by the
//! headless binary for frame capture and by tests to inspect what a frame did.

use std::collections::BTreeMap;

use crate::asset::{AssetCache, Handle, Mesh};
use crate::error::{RenderError, Result};
use crate::renderer::device::{
    ClearValues, DepthState, FrameBuffer, FrameBufferDescriptor, GraphicsDevice, RasterState,
    RenderTarget, Shader, ShaderDescriptor, ShaderProgram, Texture, TextureDescriptor,
    UniformValue, Viewport,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawKind {
    Mesh(Handle<Mesh>),
    FullscreenQuad,
}

/// Snapshot of the pipeline state at the moment a draw was issued.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawCall {
    pub kind: DrawKind,
    pub target: RenderTarget,
    pub shader: Handle<Shader>,
    pub program: ShaderProgram,
    pub raster: RasterState,
    pub depth: DepthState,
    pub blend: Option<wgpu::BlendState>,
    pub viewport: Viewport,
    pub textures: Vec<(u32, Handle<Texture>)>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    BindFrameBuffer(RenderTarget),
    UnbindFrameBuffer,
    Clear(ClearValues),
    CopyDepth {
        source: Handle<FrameBuffer>,
        destination: RenderTarget,
    },
    SetViewport(Viewport),
    SetRasterState(RasterState),
    SetDepthState(DepthState),
    SetBlendState(Option<wgpu::BlendState>),
    BindShader(Handle<Shader>),
    SetUniform {
        name: String,
        value: UniformValue,
    },
    SetUniformBlock {
        name: String,
        bytes: Vec<u8>,
    },
    BindTexture {
        channel: u32,
        texture: Handle<Texture>,
    },
    UnbindTexture {
        channel: u32,
    },
    Draw(DrawCall),
}

struct FrameBufferRecord {
    desc: FrameBufferDescriptor,
    colors: Vec<Handle<Texture>>,
    depth: Option<Handle<Texture>>,
}

pub struct HeadlessDevice {
    textures: AssetCache<TextureDescriptor, Texture>,
    frame_buffers: Vec<Option<FrameBufferRecord>>,
    shaders: AssetCache<ShaderDescriptor, Shader>,
    bound_target: Option<RenderTarget>,
    bound_shader: Option<Handle<Shader>>,
    channels: BTreeMap<u32, Handle<Texture>>,
    viewport: Viewport,
    raster: RasterState,
    depth: DepthState,
    blend: Option<wgpu::BlendState>,
    commands: Vec<Command>,
}

impl HeadlessDevice {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            textures: AssetCache::new(),
            frame_buffers: Vec::new(),
            shaders: AssetCache::new(),
            bound_target: None,
            bound_shader: None,
            channels: BTreeMap::new(),
            viewport: Viewport::new(width, height),
            raster: RasterState::default(),
            depth: DepthState::default(),
            blend: None,
            commands: Vec::new(),
        }
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    pub fn draws(&self) -> impl Iterator<Item = &DrawCall> + '_ {
        self.commands.iter().filter_map(|command| match command {
            Command::Draw(draw) => Some(draw),
            _ => None,
        })
    }

    pub fn draws_with(&self, program: ShaderProgram) -> impl Iterator<Item = &DrawCall> + '_ {
        self.draws().filter(move |draw| draw.program == program)
    }

    /// Channels currently holding a texture; empty between passes.
    pub fn bound_channels(&self) -> Vec<u32> {
        self.channels.keys().copied().collect()
    }

    /// Live textures, including frame buffer attachments.
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn texture_descriptor(&self, texture: Handle<Texture>) -> Option<&TextureDescriptor> {
        self.textures.get(texture)
    }

    pub fn frame_buffer_descriptor(
        &self,
        frame_buffer: Handle<FrameBuffer>,
    ) -> Option<&FrameBufferDescriptor> {
        self.frame_buffer(frame_buffer).ok().map(|record| &record.desc)
    }

    pub fn shader_program(&self, shader: Handle<Shader>) -> Option<ShaderProgram> {
        self.shaders
            .get(shader)
            .map(|desc| desc.program)
    }

    fn frame_buffer(&self, handle: Handle<FrameBuffer>) -> Result<&FrameBufferRecord> {
        self.frame_buffers
            .get(handle.index())
            .and_then(Option::as_ref)
            .ok_or_else(|| RenderError::unknown("frame buffer", handle))
    }

    fn target_has_depth(&self, target: RenderTarget) -> Result<bool> {
        match target {
            RenderTarget::Screen => Ok(true),
            RenderTarget::FrameBuffer(handle) => Ok(self.frame_buffer(handle)?.depth.is_some()),
        }
    }

    fn require_target(&self) -> Result<RenderTarget> {
        self.bound_target.ok_or(RenderError::NoFrameBufferBound)
    }

    fn require_shader(&self) -> Result<Handle<Shader>> {
        self.bound_shader.ok_or(RenderError::NoShaderBound)
    }

    fn record_draw(&mut self, kind: DrawKind) -> Result<()> {
        let target = self.require_target()?;
        let shader = self.require_shader()?;
        let program = self
            .shader_program(shader)
            .ok_or_else(|| RenderError::unknown("shader", shader))?;
        let draw = DrawCall {
            kind,
            target,
            shader,
            program,
            raster: self.raster,
            depth: self.depth,
            blend: self.blend,
            viewport: self.viewport,
            textures: self.channels.iter().map(|(&c, &t)| (c, t)).collect(),
        };
        self.commands.push(Command::Draw(draw));
        Ok(())
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn create_texture(&mut self, desc: &TextureDescriptor) -> Handle<Texture> {
        self.textures.insert(desc.clone())
    }

    fn create_frame_buffer(&mut self, desc: &FrameBufferDescriptor) -> Handle<FrameBuffer> {
        let colors = desc
            .color_formats
            .iter()
            .enumerate()
            .map(|(i, &format)| {
                self.create_texture(&TextureDescriptor::d2(
                    format!("{}Color{}", desc.label, i),
                    desc.width,
                    desc.height,
                    format,
                ))
            })
            .collect();
        let depth = desc.depth_format.map(|format| {
            self.create_texture(&TextureDescriptor::d2(
                format!("{}Depth", desc.label),
                desc.width,
                desc.height,
                format,
            ))
        });

        log::trace!(
            "Headless frame buffer '{}' {}x{}",
            desc.label,
            desc.width,
            desc.height
        );

        let handle = Handle::new(self.frame_buffers.len());
        self.frame_buffers.push(Some(FrameBufferRecord {
            desc: desc.clone(),
            colors,
            depth,
        }));
        handle
    }

    fn destroy_frame_buffer(&mut self, frame_buffer: Handle<FrameBuffer>) -> Result<()> {
        self.frame_buffer(frame_buffer)?;
        if self.bound_target == Some(RenderTarget::FrameBuffer(frame_buffer)) {
            self.bound_target = None;
        }
        if let Some(record) = self.frame_buffers[frame_buffer.index()].take() {
            for &texture in record.colors.iter().chain(&record.depth) {
                self.textures.remove(texture);
            }
        }
        Ok(())
    }

    fn create_shader(&mut self, desc: &ShaderDescriptor) -> Handle<Shader> {
        self.shaders.insert(desc.clone())
    }

    fn bind_frame_buffer(&mut self, target: RenderTarget) -> Result<()> {
        if let RenderTarget::FrameBuffer(handle) = target {
            self.frame_buffer(handle)?;
        }
        self.bound_target = Some(target);
        self.commands.push(Command::BindFrameBuffer(target));
        Ok(())
    }

    fn unbind_frame_buffer(&mut self) {
        self.bound_target = None;
        self.commands.push(Command::UnbindFrameBuffer);
    }

    fn clear(&mut self, values: &ClearValues) -> Result<()> {
        self.require_target()?;
        self.commands.push(Command::Clear(*values));
        Ok(())
    }

    fn copy_depth(&mut self, source: Handle<FrameBuffer>, destination: RenderTarget) -> Result<()> {
        let record = self.frame_buffer(source)?;
        if record.depth.is_none() {
            return Err(RenderError::MissingAttachment {
                index: source.index(),
                attachment: "depth".to_string(),
            });
        }
        if !self.target_has_depth(destination)? {
            let index = match destination {
                RenderTarget::FrameBuffer(handle) => handle.index(),
                RenderTarget::Screen => 0,
            };
            return Err(RenderError::MissingAttachment {
                index,
                attachment: "depth".to_string(),
            });
        }
        self.commands.push(Command::CopyDepth {
            source,
            destination,
        });
        Ok(())
    }

    fn color_texture(&self, frame_buffer: Handle<FrameBuffer>, index: usize) -> Result<Handle<Texture>> {
        let record = self.frame_buffer(frame_buffer)?;
        record
            .colors
            .get(index)
            .copied()
            .ok_or_else(|| RenderError::MissingAttachment {
                index: frame_buffer.index(),
                attachment: format!("color {index}"),
            })
    }

    fn depth_texture(&self, frame_buffer: Handle<FrameBuffer>) -> Result<Handle<Texture>> {
        self.frame_buffer(frame_buffer)?
            .depth
            .ok_or_else(|| RenderError::MissingAttachment {
                index: frame_buffer.index(),
                attachment: "depth".to_string(),
            })
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.commands.push(Command::SetViewport(viewport));
    }

    fn raster_state(&self) -> RasterState {
        self.raster
    }

    fn set_raster_state(&mut self, state: RasterState) {
        self.raster = state;
        self.commands.push(Command::SetRasterState(state));
    }

    fn depth_state(&self) -> DepthState {
        self.depth
    }

    fn set_depth_state(&mut self, state: DepthState) {
        self.depth = state;
        self.commands.push(Command::SetDepthState(state));
    }

    fn blend_state(&self) -> Option<wgpu::BlendState> {
        self.blend
    }

    fn set_blend_state(&mut self, state: Option<wgpu::BlendState>) {
        self.blend = state;
        self.commands.push(Command::SetBlendState(state));
    }

    fn bind_shader(&mut self, shader: Handle<Shader>) -> Result<()> {
        if !self.shaders.contains(shader) {
            return Err(RenderError::unknown("shader", shader));
        }
        self.bound_shader = Some(shader);
        self.commands.push(Command::BindShader(shader));
        Ok(())
    }

    fn set_uniform(&mut self, name: &str, value: UniformValue) -> Result<()> {
        self.require_shader()?;
        self.commands.push(Command::SetUniform {
            name: name.to_string(),
            value,
        });
        Ok(())
    }

    fn set_uniform_block(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        self.require_shader()?;
        self.commands.push(Command::SetUniformBlock {
            name: name.to_string(),
            bytes: bytes.to_vec(),
        });
        Ok(())
    }

    fn bind_texture(&mut self, channel: u32, texture: Handle<Texture>) -> Result<()> {
        if !self.textures.contains(texture) {
            return Err(RenderError::unknown("texture", texture));
        }
        if self.channels.contains_key(&channel) {
            return Err(RenderError::ChannelAlreadyBound { channel });
        }
        self.channels.insert(channel, texture);
        self.commands.push(Command::BindTexture { channel, texture });
        Ok(())
    }

    fn unbind_texture(&mut self, channel: u32) -> Result<()> {
        if self.channels.remove(&channel).is_none() {
            return Err(RenderError::ChannelNotBound { channel });
        }
        self.commands.push(Command::UnbindTexture { channel });
        Ok(())
    }

    fn draw_mesh(&mut self, handle: Handle<Mesh>, mesh: &Mesh) -> Result<()> {
        log::trace!("Headless draw '{}' ({} indices)", mesh.label, mesh.index_count);
        self.record_draw(DrawKind::Mesh(handle))
    }

    fn draw_fullscreen_quad(&mut self) -> Result<()> {
        self.record_draw(DrawKind::FullscreenQuad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::device::ShaderProgram;

    fn device_with_shader() -> (HeadlessDevice, Handle<Shader>) {
        let mut device = HeadlessDevice::new(64, 64);
        let shader = device.create_shader(&ShaderDescriptor::new("Test", ShaderProgram::Forward));
        (device, shader)
    }

    #[test]
    fn double_binding_a_channel_is_rejected() {
        let (mut device, _) = device_with_shader();
        let texture = device.create_texture(&TextureDescriptor::d2(
            "T",
            4,
            4,
            wgpu::TextureFormat::Rgba8Unorm,
        ));
        device.bind_texture(3, texture).unwrap();
        assert_eq!(
            device.bind_texture(3, texture),
            Err(RenderError::ChannelAlreadyBound { channel: 3 })
        );
        device.unbind_texture(3).unwrap();
        assert_eq!(
            device.unbind_texture(3),
            Err(RenderError::ChannelNotBound { channel: 3 })
        );
    }

    #[test]
    fn drawing_requires_target_and_shader() {
        let (mut device, shader) = device_with_shader();
        assert_eq!(
            device.draw_fullscreen_quad(),
            Err(RenderError::NoFrameBufferBound)
        );
        device.bind_frame_buffer(RenderTarget::Screen).unwrap();
        assert_eq!(device.draw_fullscreen_quad(), Err(RenderError::NoShaderBound));
        assert_eq!(
            device.set_uniform("u_x", UniformValue::Float(1.0)),
            Err(RenderError::NoShaderBound)
        );
        device.bind_shader(shader).unwrap();
        device.draw_fullscreen_quad().unwrap();
        assert_eq!(device.draws().count(), 1);
    }

    #[test]
    fn frame_buffer_attachments_are_queryable() {
        let (mut device, _) = device_with_shader();
        let fb = device.create_frame_buffer(&FrameBufferDescriptor {
            label: "G".into(),
            width: 8,
            height: 8,
            color_formats: vec![
                wgpu::TextureFormat::Rgba8Unorm,
                wgpu::TextureFormat::Rgba16Float,
            ],
            depth_format: None,
        });
        assert!(device.color_texture(fb, 1).is_ok());
        assert!(matches!(
            device.color_texture(fb, 2),
            Err(RenderError::MissingAttachment { .. })
        ));
        assert!(device.depth_texture(fb).is_err());
        assert!(device.copy_depth(fb, RenderTarget::Screen).is_err());
    }

    #[test]
    fn destroyed_frame_buffer_cannot_be_bound() {
        let (mut device, _) = device_with_shader();
        let fb = device.create_frame_buffer(&FrameBufferDescriptor::default());
        device.destroy_frame_buffer(fb).unwrap();
        assert!(matches!(
            device.bind_frame_buffer(RenderTarget::FrameBuffer(fb)),
            Err(RenderError::UnknownResource { .. })
        ));
    }

    #[test]
    fn destroying_a_frame_buffer_frees_its_attachments() {
        let (mut device, _) = device_with_shader();
        let before = device.texture_count();
        let fb = device.create_frame_buffer(&FrameBufferDescriptor::default());
        let color = device.color_texture(fb, 0).unwrap();
        let depth = device.depth_texture(fb).unwrap();
        assert_eq!(device.texture_count(), before + 2);

        device.destroy_frame_buffer(fb).unwrap();
        assert_eq!(device.texture_count(), before);
        assert!(device.texture_descriptor(color).is_none());
        assert!(device.texture_descriptor(depth).is_none());
        assert!(matches!(
            device.bind_texture(0, color),
            Err(RenderError::UnknownResource { .. })
        ));
    }
}
