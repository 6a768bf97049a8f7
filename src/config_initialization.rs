//! Configuration initialization and hierarchy management

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use crate::adapters::toml_config::{AppConfig, TomlConfigAdapter};
use crate::cli::{Cli, Commands};
use crate::utils::logging::{LogFormat, LogLevel};

/// Effective configuration plus where it came from
#[derive(Debug)]
pub struct LoadedConfiguration {
    pub config: AppConfig,
    pub file: Option<PathBuf>,
    pub env_overrides: usize,
    pub cli_overrides: usize,
}

impl LoadedConfiguration {
    /// Report the sources once logging is up
    pub fn log_sources(&self) {
        match &self.file {
            Some(path) => info!("Configuration file: {}", path.display()),
            None => info!("No configuration file found, using defaults"),
        }
        if self.env_overrides > 0 {
            info!("Applied {} environment variable overrides", self.env_overrides);
        }
        if self.cli_overrides > 0 {
            info!("Applied {} CLI configuration overrides", self.cli_overrides);
        }
    }
}

/// Resolve configuration following precedence: CLI > Env > File > Defaults
pub fn initialize_configuration_hierarchy(cli: &Cli) -> Result<LoadedConfiguration> {
    let (mut config, file) = TomlConfigAdapter::discover(cli.config.as_deref())
        .context("Failed to load configuration file")?;

    let env_overrides = TomlConfigAdapter::apply_process_env(&mut config)
        .context("Invalid environment configuration")?;

    let cli_overrides = apply_cli_configuration_overrides(&mut config, cli)?;

    config.validate().context("Invalid configuration")?;

    Ok(LoadedConfiguration {
        config,
        file,
        env_overrides,
        cli_overrides,
    })
}

/// Apply CLI argument overrides to configuration
fn apply_cli_configuration_overrides(config: &mut AppConfig, cli: &Cli) -> Result<usize> {
    let mut cli_overrides = 0;

    if let Some(level) = &cli.log_level {
        config.logging.level = LogLevel::parse(level)?;
        cli_overrides += 1;
    }
    if let Some(format) = &cli.log_format {
        config.logging.format = LogFormat::parse(format)?;
        cli_overrides += 1;
    }
    if let Some(ffmpeg) = &cli.ffmpeg {
        config.tools.ffmpeg = ffmpeg.clone();
        cli_overrides += 1;
    }
    if let Some(ffprobe) = &cli.ffprobe {
        config.tools.ffprobe = ffprobe.clone();
        cli_overrides += 1;
    }

    if let Commands::Cut(args) = &cli.command {
        if let Some(resolution) = &args.resolution {
            config.export.resolution = resolution.clone();
            cli_overrides += 1;
        }
        if let Some(bitrate) = &args.bitrate {
            config.export.bitrate = bitrate.clone();
            cli_overrides += 1;
        }
    }

    Ok(cli_overrides)
}
