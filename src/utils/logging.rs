//! Logging configuration and progress output

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::error::{SegcutError, SegcutResult};

/// Logging configuration options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Global log level
    pub level: LogLevel,
    /// Output format
    pub format: LogFormat,
}

/// Log level configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Parse log level from string
    pub fn parse(level_str: &str) -> SegcutResult<Self> {
        match level_str.trim().to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(SegcutError::ConfigError {
                path: "log_level".to_string(),
                message: format!(
                    "Invalid log level: {}. Valid levels: trace, debug, info, warn, error",
                    other
                ),
            }),
        }
    }

    fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-line format
    Pretty,
    /// Single-line text format
    Compact,
    /// JSON lines for structured logging
    Json,
}

impl LogFormat {
    pub fn parse(format_str: &str) -> SegcutResult<Self> {
        match format_str.trim().to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(SegcutError::ConfigError {
                path: "log_format".to_string(),
                message: format!("Invalid log format: {}. Valid formats: pretty, compact, json", other),
            }),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
        }
    }
}

/// Logging system manager
pub struct LoggingSystem {
    config: LoggingConfig,
}

impl LoggingSystem {
    /// Create a new logging system with configuration
    pub fn new(config: LoggingConfig) -> Self {
        Self { config }
    }

    /// Install the global subscriber. `RUST_LOG` overrides the configured level.
    /// Logs go to stderr so command output on stdout stays parseable.
    pub fn initialize(&self) -> SegcutResult<()> {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.config.level.as_filter()));

        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr);

        let result = match self.config.format {
            LogFormat::Pretty => builder.pretty().try_init(),
            LogFormat::Compact => builder.compact().try_init(),
            LogFormat::Json => builder.json().try_init(),
        };

        result.map_err(|e| SegcutError::ConfigError {
            path: "logging".to_string(),
            message: e.to_string(),
        })?;

        tracing::debug!(
            level = ?self.config.level,
            format = ?self.config.format,
            "Logging system initialized"
        );
        Ok(())
    }

    /// Log system information
    pub fn log_system_info(&self) {
        tracing::info!(version = env!("CARGO_PKG_VERSION"), "segcut starting");
    }
}

/// Progress reporter for export jobs
pub struct ProgressReporter {
    current_operation: Option<String>,
    start_time: Option<Instant>,
    last_reported: f64,
    step: f64,
}

impl ProgressReporter {
    /// Report at most once per `step` percentage points
    pub fn new(step: f64) -> Self {
        Self {
            current_operation: None,
            start_time: None,
            last_reported: -1.0,
            step: step.max(0.1),
        }
    }

    pub fn start_operation(&mut self, operation: String) {
        tracing::info!("Starting: {}", operation);
        self.current_operation = Some(operation);
        self.start_time = Some(Instant::now());
        self.last_reported = -1.0;
    }

    /// Update progress with a percentage in [0, 100]
    pub fn update_progress(&mut self, percent: f64) {
        if self.last_reported >= 0.0 && (percent - self.last_reported).abs() < self.step {
            return;
        }
        self.last_reported = percent;

        let operation = self.current_operation.as_deref().unwrap_or("export");
        let bar_length = 20;
        let filled = ((percent / 100.0) * bar_length as f64).round() as usize;
        let filled = filled.min(bar_length);
        let bar = "#".repeat(filled) + &"-".repeat(bar_length - filled);

        let mut message = format!("[{}] {} {}", bar, super::time::format_percent(percent), operation);
        if percent > 0.0 {
            if let Some(start_time) = self.start_time {
                let elapsed = start_time.elapsed().as_secs_f64();
                let eta = elapsed / (percent / 100.0) - elapsed;
                if eta > 0.0 {
                    message.push_str(&format!(" (ETA: {:.0}s)", eta));
                }
            }
        }

        tracing::info!("{}", message);
    }

    /// Complete the current operation
    pub fn complete_operation(&mut self, status: &str) {
        if let Some(operation) = self.current_operation.take() {
            match self.start_time.take() {
                Some(start_time) => tracing::info!(
                    "{} {} in {:.2}s",
                    operation,
                    status,
                    start_time.elapsed().as_secs_f64()
                ),
                None => tracing::info!("{} {}", operation, status),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parse() {
        assert_eq!(LogLevel::parse("DEBUG").unwrap(), LogLevel::Debug);
        assert!(LogLevel::parse("loud").is_err());
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("json").unwrap(), LogFormat::Json);
        assert!(LogFormat::parse("xml").is_err());
    }

    #[test]
    fn test_logging_config_from_toml() {
        let config: LoggingConfig = toml::from_str("level = \"warn\"\nformat = \"json\"").unwrap();
        assert_eq!(config.level, LogLevel::Warn);
        assert_eq!(config.format, LogFormat::Json);

        let defaults: LoggingConfig = toml::from_str("").unwrap();
        assert_eq!(defaults, LoggingConfig::default());
    }
}
