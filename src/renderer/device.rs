//! Contract between the frame orchestration and the graphics backend.
//!
//! The renderer drives the GPU through [`GraphicsDevice`]: frame buffers,
//! shader programs, named uniforms, fixed texture channels and a handful of
//! fixed-function states. Resource creation takes plain descriptor structs.

use bitflags::bitflags;
use glam::{Mat4, Vec3, Vec4};

use crate::asset::{Handle, Mesh};
use crate::error::Result;

/// Marker for texture handles.
pub enum Texture {}
/// Marker for frame buffer handles.
pub enum FrameBuffer {}
/// Marker for shader program handles.
pub enum Shader {}

/// Depth value frame buffers are cleared to; the lighting pass relies on it.
pub const CLEAR_DEPTH: f32 = 1.0;

#[derive(Clone, Debug, PartialEq)]
pub struct TextureDescriptor {
    pub label: String,
    pub size: wgpu::Extent3d,
    pub format: wgpu::TextureFormat,
    pub dimension: wgpu::TextureViewDimension,
}

impl TextureDescriptor {
    pub fn d2(label: impl Into<String>, width: u32, height: u32, format: wgpu::TextureFormat) -> Self {
        Self {
            label: label.into(),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            format,
            dimension: wgpu::TextureViewDimension::D2,
        }
    }

    pub fn cube(label: impl Into<String>, size: u32, format: wgpu::TextureFormat) -> Self {
        Self {
            label: label.into(),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 6,
            },
            format,
            dimension: wgpu::TextureViewDimension::Cube,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FrameBufferDescriptor {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub color_formats: Vec<wgpu::TextureFormat>,
    pub depth_format: Option<wgpu::TextureFormat>,
}

impl Default for FrameBufferDescriptor {
    fn default() -> Self {
        Self {
            label: "FrameBuffer".to_string(),
            width: 1,
            height: 1,
            color_formats: vec![wgpu::TextureFormat::Rgba8UnormSrgb],
            depth_format: Some(wgpu::TextureFormat::Depth32Float),
        }
    }
}

/// Programs the renderer asks the backend to compile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderProgram {
    ShadowDepth,
    GBuffer,
    LightPass,
    Forward,
    Skybox,
    Particles,
    Bloom,
    ToneMap,
    Fxaa,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderDescriptor {
    pub label: String,
    pub program: ShaderProgram,
}

impl ShaderDescriptor {
    pub fn new(label: impl Into<String>, program: ShaderProgram) -> Self {
        Self {
            label: label.into(),
            program,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderTarget {
    Screen,
    FrameBuffer(Handle<FrameBuffer>),
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ClearFlags: u8 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClearValues {
    pub flags: ClearFlags,
    pub color: wgpu::Color,
    pub depth: f32,
}

impl ClearValues {
    pub fn color_and_depth(color: wgpu::Color) -> Self {
        Self {
            flags: ClearFlags::COLOR | ClearFlags::DEPTH,
            color,
            depth: CLEAR_DEPTH,
        }
    }

    pub fn depth_only() -> Self {
        Self {
            flags: ClearFlags::DEPTH,
            color: wgpu::Color::TRANSPARENT,
            depth: CLEAR_DEPTH,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }
}

/// Rasterizer state: face culling, polygon offset and depth clamping.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RasterState {
    pub cull_mode: Option<wgpu::Face>,
    pub depth_bias: wgpu::DepthBiasState,
    pub depth_clamp: bool,
}

impl Default for RasterState {
    fn default() -> Self {
        Self {
            cull_mode: Some(wgpu::Face::Back),
            depth_bias: wgpu::DepthBiasState::default(),
            depth_clamp: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DepthState {
    pub compare: wgpu::CompareFunction,
    pub write: bool,
}

impl Default for DepthState {
    fn default() -> Self {
        Self {
            compare: wgpu::CompareFunction::Less,
            write: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    UInt(u32),
    Bool(bool),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
}

impl From<f32> for UniformValue {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<u32> for UniformValue {
    fn from(value: u32) -> Self {
        Self::UInt(value)
    }
}

impl From<bool> for UniformValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Vec3> for UniformValue {
    fn from(value: Vec3) -> Self {
        Self::Vec3(value)
    }
}

impl From<Vec4> for UniformValue {
    fn from(value: Vec4) -> Self {
        Self::Vec4(value)
    }
}

impl From<Mat4> for UniformValue {
    fn from(value: Mat4) -> Self {
        Self::Mat4(value)
    }
}

/// Immediate-mode view of the GPU used by every render pass.
///
/// Texture channels are global state: whoever binds a channel unbinds it
/// before returning control. Implementations reject binding an occupied
/// channel.
pub trait GraphicsDevice {
    fn create_texture(&mut self, desc: &TextureDescriptor) -> Handle<Texture>;
    fn create_frame_buffer(&mut self, desc: &FrameBufferDescriptor) -> Handle<FrameBuffer>;
    fn destroy_frame_buffer(&mut self, frame_buffer: Handle<FrameBuffer>) -> Result<()>;
    fn create_shader(&mut self, desc: &ShaderDescriptor) -> Handle<Shader>;

    fn bind_frame_buffer(&mut self, target: RenderTarget) -> Result<()>;
    fn unbind_frame_buffer(&mut self);
    fn clear(&mut self, values: &ClearValues) -> Result<()>;
    /// Copies the depth attachment of `source` into `destination`.
    fn copy_depth(&mut self, source: Handle<FrameBuffer>, destination: RenderTarget) -> Result<()>;
    fn color_texture(&self, frame_buffer: Handle<FrameBuffer>, index: usize) -> Result<Handle<Texture>>;
    fn depth_texture(&self, frame_buffer: Handle<FrameBuffer>) -> Result<Handle<Texture>>;

    fn viewport(&self) -> Viewport;
    fn set_viewport(&mut self, viewport: Viewport);
    fn raster_state(&self) -> RasterState;
    fn set_raster_state(&mut self, state: RasterState);
    fn depth_state(&self) -> DepthState;
    fn set_depth_state(&mut self, state: DepthState);
    fn blend_state(&self) -> Option<wgpu::BlendState>;
    fn set_blend_state(&mut self, state: Option<wgpu::BlendState>);

    fn bind_shader(&mut self, shader: Handle<Shader>) -> Result<()>;
    fn set_uniform(&mut self, name: &str, value: UniformValue) -> Result<()>;
    fn set_uniform_block(&mut self, name: &str, bytes: &[u8]) -> Result<()>;
    fn bind_texture(&mut self, channel: u32, texture: Handle<Texture>) -> Result<()>;
    fn unbind_texture(&mut self, channel: u32) -> Result<()>;

    fn draw_mesh(&mut self, handle: Handle<Mesh>, mesh: &Mesh) -> Result<()>;
    /// Draws a screen-covering quad at the far plane (depth == [`CLEAR_DEPTH`]).
    fn draw_fullscreen_quad(&mut self) -> Result<()>;
}
