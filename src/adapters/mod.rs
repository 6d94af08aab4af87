// Adapters - External system implementations

pub mod exec_ffmpeg;
pub mod fs_handles;
pub mod toml_config;

// Re-export adapters
pub use exec_ffmpeg::{FfmpegEngineLoader, FfmpegWorkspace};
pub use fs_handles::{DirectorySaveSink, FileHandleRegistry};
pub use toml_config::{AppConfig, TomlConfigAdapter};
