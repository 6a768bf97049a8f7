// Session loader - Inspection and preview preparation for a newly opened file

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::PreviewPolicy;
use crate::ports::*;

/// Inspection result tagged with the session attempt it belongs to
#[derive(Debug, Clone)]
pub struct InspectionOutcome {
    pub ticket: SessionTicket,
    pub result: Result<MediaInfo, DomainError>,
}

/// Preview result tagged with the session attempt it belongs to.
/// `Ok` carries the playable path, which may be the source itself.
#[derive(Debug, Clone)]
pub struct PreviewOutcome {
    pub ticket: SessionTicket,
    pub result: Result<PathBuf, DomainError>,
}

/// Runs the collaborators that prepare a session. Produces tagged outcomes
/// only; deciding whether they still apply is the workspace's job.
#[derive(Clone)]
pub struct SessionLoader {
    inspect_port: Arc<dyn InspectPort>,
    preview_port: Arc<dyn PreviewPort>,
    web_compatible: Vec<String>,
}

impl SessionLoader {
    pub fn new(
        inspect_port: Arc<dyn InspectPort>,
        preview_port: Arc<dyn PreviewPort>,
        web_compatible: Vec<String>,
    ) -> Self {
        Self {
            inspect_port,
            preview_port,
            web_compatible,
        }
    }

    pub async fn inspect(&self, ticket: &SessionTicket) -> InspectionOutcome {
        let result = self.inspect_port.inspect(&ticket.source_path).await;
        match &result {
            Ok(info) => info!(
                path = %ticket.source_path.display(),
                duration = ?info.duration,
                streams = info.streams.len(),
                "Media inspected"
            ),
            Err(e) => warn!(
                path = %ticket.source_path.display(),
                "Media inspection failed, continuing without it: {}",
                e
            ),
        }
        InspectionOutcome {
            ticket: ticket.clone(),
            result,
        }
    }

    /// Pick the playable file. Web-compatible sources play directly; other
    /// sources are converted, unless inspection already failed, in which
    /// case conversion is skipped and playback falls back to the source.
    pub async fn prepare_preview(&self, ticket: &SessionTicket, inspected: bool) -> PreviewOutcome {
        let source = &ticket.source_path;
        let result = if PreviewPolicy::is_web_compatible(source, &self.web_compatible) {
            info!(path = %source.display(), "Source is directly playable");
            Ok(source.clone())
        } else if !inspected {
            Err(DomainError::PreviewFailed(
                "conversion skipped because inspection failed".to_string(),
            ))
        } else {
            info!(path = %source.display(), "Converting source for preview");
            self.preview_port.convert(source).await
        };

        if let Err(e) = &result {
            warn!(path = %source.display(), "Preview unavailable, playing source directly: {}", e);
        }
        PreviewOutcome {
            ticket: ticket.clone(),
            result,
        }
    }

    /// Inspection followed by preview preparation
    pub async fn load(&self, ticket: &SessionTicket) -> (InspectionOutcome, PreviewOutcome) {
        let inspection = self.inspect(ticket).await;
        let preview = self
            .prepare_preview(ticket, inspection.result.is_ok())
            .await;
        (inspection, preview)
    }
}
