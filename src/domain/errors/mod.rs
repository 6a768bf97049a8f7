// Domain errors - Error types for the domain layer

use std::fmt;

/// Domain-specific error types
#[derive(Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Segment bounds are not a valid `start < end` range
    InvalidRange { start: f64, end: f64 },
    /// No media session is open
    NoActiveSession,
    /// An export job already holds the processing slot
    Busy,
    /// Export service reported a failure
    ExportFailed(String),
    /// Job was cancelled on request
    Cancelled,
    /// Result belongs to a session that has since been replaced
    StaleResult,
    /// Segment id is not in the store
    UnknownSegment(u64),
    /// Session has no playable file yet
    PreviewUnavailable,
    /// Job state machine rejected a transition
    InvalidTransition { from: String, to: String },
    /// Invalid arguments provided
    BadArgs(String),
    /// Media inspection failed
    InspectFailed(String),
    /// Preview conversion failed
    PreviewFailed(String),
    /// Playback surface rejected an operation
    SurfaceFailed(String),
}

impl DomainError {
    /// Validation errors are misuse at the call boundary and must not be retried
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            DomainError::InvalidRange { .. }
                | DomainError::NoActiveSession
                | DomainError::Busy
                | DomainError::BadArgs(_)
        )
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainError::InvalidRange { start, end } => write!(
                f,
                "Invalid range: start ({:.3}s) must be less than end ({:.3}s)",
                start, end
            ),
            DomainError::NoActiveSession => write!(f, "No media session is open"),
            DomainError::Busy => write!(f, "An export is already running"),
            DomainError::ExportFailed(msg) => write!(f, "Export failed: {}", msg),
            DomainError::Cancelled => write!(f, "Export cancelled"),
            DomainError::StaleResult => write!(f, "Result belongs to a previous session"),
            DomainError::UnknownSegment(id) => write!(f, "Unknown segment: {}", id),
            DomainError::PreviewUnavailable => write!(f, "No playable preview is available yet"),
            DomainError::InvalidTransition { from, to } => {
                write!(f, "Invalid job transition: {} -> {}", from, to)
            }
            DomainError::BadArgs(msg) => write!(f, "Bad arguments: {}", msg),
            DomainError::InspectFailed(msg) => write!(f, "Inspection failed: {}", msg),
            DomainError::PreviewFailed(msg) => write!(f, "Preview conversion failed: {}", msg),
            DomainError::SurfaceFailed(msg) => write!(f, "Playback surface error: {}", msg),
        }
    }
}

impl std::error::Error for DomainError {}
