// Ports - Interface definitions (contracts)

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use crate::domain::errors::*;
use crate::domain::model::*;

/// Port for media file inspection
#[async_trait]
pub trait InspectPort: Send + Sync {
    /// Probe the file and return duration and stream metadata
    async fn inspect(&self, file_path: &Path) -> Result<MediaInfo, DomainError>;
}

/// Port for producing a web-playable proxy of a source file
#[async_trait]
pub trait PreviewPort: Send + Sync {
    /// Convert `source` and return the proxy's path
    async fn convert(&self, source: &Path) -> Result<PathBuf, DomainError>;
}

/// Terminal signal of one export
#[derive(Debug, Clone, PartialEq)]
pub enum ExportOutcome {
    Succeeded,
    Failed(String),
    Cancelled,
}

/// Channels of a started export: best-effort progress plus exactly one
/// terminal outcome
#[derive(Debug)]
pub struct ExportHandle {
    pub progress: mpsc::UnboundedReceiver<ExportProgress>,
    pub outcome: oneshot::Receiver<ExportOutcome>,
}

impl ExportHandle {
    /// Create a handle and the sending halves an adapter keeps
    pub fn channel() -> (
        ExportHandle,
        mpsc::UnboundedSender<ExportProgress>,
        oneshot::Sender<ExportOutcome>,
    ) {
        let (progress_tx, progress_rx) = mpsc::unbounded_channel();
        let (outcome_tx, outcome_rx) = oneshot::channel();
        (
            ExportHandle {
                progress: progress_rx,
                outcome: outcome_rx,
            },
            progress_tx,
            outcome_tx,
        )
    }
}

/// Port for cutting a time range out of a source file
#[async_trait]
pub trait ExportPort: Send + Sync {
    /// Start an export. Errors here mean the job never started.
    async fn start(&self, request: &ExportRequest) -> Result<ExportHandle, DomainError>;

    /// Ask the in-flight export to stop. Best-effort; the terminal outcome
    /// still arrives through the handle.
    async fn cancel(&self) -> Result<(), DomainError>;
}

/// Port for the seekable playback element
#[async_trait]
pub trait PlaybackPort: Send + Sync {
    /// Load a playable file, resetting position to zero
    async fn load(&self, path: &Path) -> Result<(), DomainError>;

    /// Seek to an absolute position in seconds
    async fn seek(&self, position: f64) -> Result<(), DomainError>;

    async fn play(&self) -> Result<(), DomainError>;

    async fn pause(&self) -> Result<(), DomainError>;

    /// Volume in [0, 1]
    async fn set_volume(&self, volume: f64) -> Result<(), DomainError>;

    async fn set_muted(&self, muted: bool) -> Result<(), DomainError>;

    async fn set_fullscreen(&self, fullscreen: bool) -> Result<(), DomainError>;

    /// Absolute position in seconds
    async fn position(&self) -> f64;

    /// Duration reported by the surface's own metadata
    async fn duration(&self) -> Option<f64>;
}
