// Scripted adapters - In-process stand-ins for the external media services

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot, watch};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Behaviour of the next export the scripted adapter starts
#[derive(Debug, Clone)]
pub enum ScriptedExport {
    /// Report the progress events, then succeed
    Succeed(Vec<ExportProgress>),
    /// Fail with the given reason
    Fail(String),
    /// Refuse to start at all
    RefuseStart(String),
    /// Stay running until `release` or `cancel`
    Hold,
    /// Stay running until `release`; `cancel` is acknowledged but ignored
    HoldIgnoringCancel,
}

struct HeldExport {
    progress: mpsc::UnboundedSender<ExportProgress>,
    outcome: oneshot::Sender<ExportOutcome>,
    honours_cancel: bool,
}

#[derive(Default)]
struct ScriptState {
    script: VecDeque<ScriptedExport>,
    requests: Vec<ExportRequest>,
    held: Option<HeldExport>,
}

/// Export service that plays back a queue of scripted behaviours.
/// Once the script runs out every export succeeds immediately.
pub struct ScriptedExportAdapter {
    state: Mutex<ScriptState>,
    starts: watch::Sender<usize>,
    cancels: watch::Sender<usize>,
}

impl Default for ScriptedExportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedExportAdapter {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ScriptState::default()),
            starts: watch::channel(0).0,
            cancels: watch::channel(0).0,
        }
    }

    pub fn push(&self, behaviour: ScriptedExport) {
        lock(&self.state).script.push_back(behaviour);
    }

    /// Every request received, in order
    pub fn requests(&self) -> Vec<ExportRequest> {
        lock(&self.state).requests.clone()
    }

    pub fn cancel_calls(&self) -> usize {
        *self.cancels.borrow()
    }

    /// Resolve once `count` exports have been started
    pub async fn wait_for_starts(&self, count: usize) {
        let mut starts = self.starts.subscribe();
        let _ = starts.wait_for(|n| *n >= count).await;
    }

    /// Resolve once `count` cancel requests have arrived
    pub async fn wait_for_cancels(&self, count: usize) {
        let mut cancels = self.cancels.subscribe();
        let _ = cancels.wait_for(|n| *n >= count).await;
    }

    /// Send a progress event for the held export
    pub fn emit(&self, progress: ExportProgress) {
        if let Some(held) = lock(&self.state).held.as_ref() {
            let _ = held.progress.send(progress);
        }
    }

    fn hold(
        &self,
        progress: mpsc::UnboundedSender<ExportProgress>,
        outcome: oneshot::Sender<ExportOutcome>,
        honours_cancel: bool,
    ) {
        lock(&self.state).held = Some(HeldExport {
            progress,
            outcome,
            honours_cancel,
        });
    }

    /// Finish the held export with `outcome`
    pub fn release(&self, outcome: ExportOutcome) {
        if let Some(held) = lock(&self.state).held.take() {
            let _ = held.outcome.send(outcome);
        }
    }
}

#[async_trait]
impl ExportPort for ScriptedExportAdapter {
    async fn start(&self, request: &ExportRequest) -> Result<ExportHandle, DomainError> {
        let behaviour = {
            let mut state = lock(&self.state);
            state.requests.push(request.clone());
            state
                .script
                .pop_front()
                .unwrap_or(ScriptedExport::Succeed(Vec::new()))
        };
        let (handle, progress_tx, outcome_tx) = ExportHandle::channel();
        let started = match behaviour {
            ScriptedExport::Succeed(events) => {
                for event in events {
                    let _ = progress_tx.send(event);
                }
                let _ = outcome_tx.send(ExportOutcome::Succeeded);
                Ok(handle)
            }
            ScriptedExport::Fail(reason) => {
                let _ = outcome_tx.send(ExportOutcome::Failed(reason));
                Ok(handle)
            }
            ScriptedExport::RefuseStart(reason) => Err(DomainError::ExportFailed(reason)),
            ScriptedExport::Hold => {
                self.hold(progress_tx, outcome_tx, true);
                Ok(handle)
            }
            ScriptedExport::HoldIgnoringCancel => {
                self.hold(progress_tx, outcome_tx, false);
                Ok(handle)
            }
        };
        // Counted once a held export can be released
        self.starts.send_modify(|n| *n += 1);
        started
    }

    async fn cancel(&self) -> Result<(), DomainError> {
        {
            let mut state = lock(&self.state);
            if state.held.as_ref().is_some_and(|h| h.honours_cancel) {
                if let Some(held) = state.held.take() {
                    let _ = held.outcome.send(ExportOutcome::Cancelled);
                }
            }
        }
        self.cancels.send_modify(|n| *n += 1);
        Ok(())
    }
}

/// Inspection service returning a fixed result
pub struct StaticInspectAdapter {
    result: Result<MediaInfo, DomainError>,
    calls: Mutex<Vec<PathBuf>>,
}

impl StaticInspectAdapter {
    /// Report `duration` with one video and one audio stream
    pub fn with_duration(duration: f64) -> Self {
        Self::with_info(MediaInfo {
            path: String::new(),
            container: "mov,mp4,m4a,3gp,3g2,mj2".to_string(),
            duration: Some(duration),
            bit_rate: Some(4_000_000),
            streams: vec![
                StreamInfo {
                    index: 0,
                    kind: StreamKind::Video,
                    codec: "h264".to_string(),
                    width: Some(1920),
                    height: Some(1080),
                    sample_rate: None,
                    channels: None,
                },
                StreamInfo {
                    index: 1,
                    kind: StreamKind::Audio,
                    codec: "aac".to_string(),
                    width: None,
                    height: None,
                    sample_rate: Some(48_000),
                    channels: Some(2),
                },
            ],
            metadata: Default::default(),
        })
    }

    pub fn with_info(info: MediaInfo) -> Self {
        Self {
            result: Ok(info),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            result: Err(DomainError::InspectFailed(reason.to_string())),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<PathBuf> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl InspectPort for StaticInspectAdapter {
    async fn inspect(&self, file_path: &Path) -> Result<MediaInfo, DomainError> {
        lock(&self.calls).push(file_path.to_path_buf());
        self.result.clone().map(|mut info| {
            info.path = file_path.display().to_string();
            info
        })
    }
}

/// Conversion service that writes nothing and reports the proxy path
pub struct StaticPreviewAdapter {
    suffix: String,
    failure: Option<String>,
    calls: Mutex<Vec<PathBuf>>,
}

impl Default for StaticPreviewAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticPreviewAdapter {
    pub fn new() -> Self {
        Self {
            suffix: "_preview".to_string(),
            failure: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            failure: Some(reason.to_string()),
            ..Self::new()
        }
    }

    pub fn calls(&self) -> Vec<PathBuf> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl PreviewPort for StaticPreviewAdapter {
    async fn convert(&self, source: &Path) -> Result<PathBuf, DomainError> {
        lock(&self.calls).push(source.to_path_buf());
        match &self.failure {
            Some(reason) => Err(DomainError::PreviewFailed(reason.clone())),
            None => Ok(crate::domain::rules::OutputNaming::preview_path(
                source,
                &self.suffix,
            )),
        }
    }
}
