// TOML config adapter - Application configuration from files and environment

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::model::ExportSettings;
use crate::domain::rules::PreviewPolicy;
use crate::error::{SegcutError, SegcutResult};
use crate::utils::logging::{LogFormat, LogLevel, LoggingConfig};

/// External tool locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
    /// How long ffmpeg gets to quit on request before it is killed
    pub cancel_grace_ms: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
            cancel_grace_ms: 2000,
        }
    }
}

/// Default export overrides; `original` leaves the source value alone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub resolution: String,
    pub bitrate: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            resolution: "original".to_string(),
            bitrate: "original".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Extensions played without conversion
    pub web_compatible: Vec<String>,
    pub suffix: String,
    pub preset: String,
    pub crf: u8,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            web_compatible: PreviewPolicy::WEB_COMPATIBLE
                .iter()
                .map(|s| s.to_string())
                .collect(),
            suffix: "_preview".to_string(),
            preset: "ultrafast".to_string(),
            crf: 28,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Interval between simulated time-update notifications
    pub time_update_interval_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            time_update_interval_ms: 250,
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub tools: ToolsConfig,
    pub export: ExportConfig,
    pub preview: PreviewConfig,
    pub playback: PlaybackConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Export settings described by the `[export]` section
    pub fn export_settings(&self) -> SegcutResult<ExportSettings> {
        ExportSettings::parse(&self.export.resolution, &self.export.bitrate).map_err(|e| {
            SegcutError::ConfigError {
                path: "export".to_string(),
                message: e.to_string(),
            }
        })
    }

    pub fn validate(&self) -> SegcutResult<()> {
        self.export_settings()?;

        if self.preview.crf > 51 {
            return Err(SegcutError::ConfigError {
                path: "preview.crf".to_string(),
                message: "CRF value cannot exceed 51".to_string(),
            });
        }
        if self.playback.time_update_interval_ms == 0 {
            return Err(SegcutError::ConfigError {
                path: "playback.time_update_interval_ms".to_string(),
                message: "Interval must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Loads [`AppConfig`] from TOML files and `SEGCUT_*` environment variables
pub struct TomlConfigAdapter;

impl TomlConfigAdapter {
    /// Searched in order when no file is given explicitly
    pub const DEFAULT_LOCATIONS: [&'static str; 2] = ["segcut.toml", "config/segcut.toml"];

    pub fn parse(content: &str, origin: &Path) -> SegcutResult<AppConfig> {
        toml::from_str(content).map_err(|e| SegcutError::ConfigError {
            path: origin.display().to_string(),
            message: e.to_string(),
        })
    }

    pub fn load_file(path: &Path) -> SegcutResult<AppConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| SegcutError::ConfigError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse(&content, path)
    }

    /// Explicit file if given (it must exist), else the first default
    /// location present, else built-in defaults
    pub fn discover(explicit: Option<&Path>) -> SegcutResult<(AppConfig, Option<PathBuf>)> {
        if let Some(path) = explicit {
            return Ok((Self::load_file(path)?, Some(path.to_path_buf())));
        }

        for candidate in Self::DEFAULT_LOCATIONS {
            let path = Path::new(candidate);
            if path.is_file() {
                info!("Loading configuration from: {}", path.display());
                return Ok((Self::load_file(path)?, Some(path.to_path_buf())));
            }
        }

        debug!("No configuration file found, using defaults");
        Ok((AppConfig::default(), None))
    }

    /// Overlay environment values read through `lookup`. Returns the
    /// number of overrides applied.
    pub fn apply_env<F>(config: &mut AppConfig, lookup: F) -> SegcutResult<usize>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut applied = 0;
        let mut take = |key: &str| {
            let value = lookup(key).filter(|v| !v.trim().is_empty());
            if value.is_some() {
                debug!("Found environment override: {}", key);
                applied += 1;
            }
            value
        };

        if let Some(v) = take("SEGCUT_FFMPEG") {
            config.tools.ffmpeg = PathBuf::from(v);
        }
        if let Some(v) = take("SEGCUT_FFPROBE") {
            config.tools.ffprobe = PathBuf::from(v);
        }
        if let Some(v) = take("SEGCUT_RESOLUTION") {
            config.export.resolution = v;
        }
        if let Some(v) = take("SEGCUT_BITRATE") {
            config.export.bitrate = v;
        }
        if let Some(v) = take("SEGCUT_WEB_COMPATIBLE") {
            config.preview.web_compatible = v
                .split(',')
                .map(|s| s.trim().trim_start_matches('.').to_lowercase())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(v) = take("SEGCUT_TIME_UPDATE_MS") {
            config.playback.time_update_interval_ms =
                v.trim().parse().map_err(|_| SegcutError::ConfigError {
                    path: "SEGCUT_TIME_UPDATE_MS".to_string(),
                    message: format!("Not a number of milliseconds: {}", v),
                })?;
        }
        if let Some(v) = take("SEGCUT_LOG_LEVEL") {
            config.logging.level = LogLevel::parse(&v)?;
        }
        if let Some(v) = take("SEGCUT_LOG_FORMAT") {
            config.logging.format = LogFormat::parse(&v)?;
        }

        Ok(applied)
    }

    /// Overlay the process environment
    pub fn apply_process_env(config: &mut AppConfig) -> SegcutResult<usize> {
        Self::apply_env(config, |key| std::env::var(key).ok())
    }
}
