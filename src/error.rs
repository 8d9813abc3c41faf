use thiserror::Error;

/// Fatal conditions for the current frame. Nothing here is retried; the caller
/// decides whether to keep running the frame loop.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("no active camera in the scene")]
    MissingCamera,

    #[error("particle emitters cannot be rendered without a camera")]
    ParticlesWithoutCamera,

    #[error("no frame buffer is bound")]
    NoFrameBufferBound,

    #[error("no shader is bound")]
    NoShaderBound,

    #[error("texture channel {channel} is already bound")]
    ChannelAlreadyBound { channel: u32 },

    #[error("texture channel {channel} is not bound")]
    ChannelNotBound { channel: u32 },

    #[error("unknown {kind} handle {index}")]
    UnknownResource { kind: &'static str, index: usize },

    #[error("frame buffer {index} has no {attachment} attachment")]
    MissingAttachment { index: usize, attachment: String },
}

pub type Result<T> = std::result::Result<T, RenderError>;

impl RenderError {
    pub(crate) fn unknown<T>(kind: &'static str, handle: crate::asset::Handle<T>) -> Self {
        Self::UnknownResource {
            kind,
            index: handle.index(),
        }
    }
}
