//! segcut library
//!
//! Segment bookkeeping, segment-constrained playback and ffmpeg-backed
//! export jobs for a single media session.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config_initialization;
pub mod domain;
pub mod error;
pub mod ports;
pub mod utils;

// Re-export commonly used types
pub use app::{JobOrchestrator, Workspace};
pub use domain::errors::DomainError;
pub use domain::model::{BatchReport, Job, JobState, MediaInfo, Segment, SegmentId};
pub use error::{SegcutError, SegcutResult};
