pub mod asset;
pub mod environment;
pub mod error;
pub mod renderer;
pub mod scene;
pub mod settings;

pub use environment::EnvironmentMaps;
pub use error::{RenderError, Result};
pub use renderer::{FrameOutput, FrameStats, GraphicsDevice, HeadlessDevice, PbrSceneRenderer};
pub use scene::Scene;
pub use settings::RenderSettings;

/// Installs the `env_logger` backend at info level.
pub fn init_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .try_init();
}
