// Adapters - External system implementations

pub mod ffmpeg_export;
pub mod ffmpeg_preview;
pub mod ffprobe;
pub mod headless_surface;
pub mod mock;
pub mod toml_config;

pub use ffmpeg_export::FfmpegExportAdapter;
pub use ffmpeg_preview::FfmpegPreviewAdapter;
pub use ffprobe::FfprobeAdapter;
pub use headless_surface::HeadlessSurface;
pub use toml_config::TomlConfigAdapter;
