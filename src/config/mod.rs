pub mod load;
pub mod save;
pub mod types;

pub use load::SETTINGS_FILE_NAME;
pub use save::{save_settings, save_settings_to};
pub use types::{OutputVideoEncoder, OutputVideoPreset, PipelineSettings, TempFrameFormat};
