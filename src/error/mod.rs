//! Error handling module for segcut

use thiserror::Error;

use crate::domain::errors::DomainError;

/// Infrastructure error type: configuration, processes, I/O
#[derive(Error, Debug)]
pub enum SegcutError {
    /// Configuration file could not be read or parsed
    #[error("Invalid configuration in {path}: {message}")]
    ConfigError { path: String, message: String },

    /// External tool could not be started
    #[error("Failed to launch {tool}: {source}")]
    SpawnError {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// External tool exited unsuccessfully
    #[error("{tool} exited with {status}: {stderr}")]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },

    /// Tool output could not be decoded
    #[error("Failed to parse ffprobe output: {0}")]
    ProbeOutput(#[from] serde_json::Error),

    /// Domain rule violation surfaced through infrastructure code
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type alias for segcut operations
pub type SegcutResult<T> = std::result::Result<T, SegcutError>;
