// Job orchestrator - Sequences export jobs through the single processing slot

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::*;
use crate::ports::*;

#[derive(Debug, Default)]
struct ProcessingSlot {
    /// Held for the whole of a single export or batch
    claimed: bool,
    cancel_requested: bool,
    running: Option<JobId>,
}

/// Releases the processing slot when the owning export finishes or its
/// future is dropped
struct SlotGuard<'a> {
    orchestrator: &'a JobOrchestrator,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        {
            let mut slot = self.orchestrator.lock_slot();
            *slot = ProcessingSlot::default();
        }
        self.orchestrator.idle.send_replace(true);
    }
}

/// Owns the processing slot: at most one export job runs at any time
pub struct JobOrchestrator {
    export_port: Arc<dyn ExportPort>,
    slot: Mutex<ProcessingSlot>,
    idle: watch::Sender<bool>,
    progress: watch::Sender<JobProgress>,
    next_job_id: AtomicU64,
    /// Cancel requests that ended a job or halted a batch
    honoured_cancels: AtomicU64,
}

impl JobOrchestrator {
    pub fn new(export_port: Arc<dyn ExportPort>) -> Self {
        let (idle, _) = watch::channel(true);
        let (progress, _) = watch::channel(JobProgress::default());
        Self {
            export_port,
            slot: Mutex::new(ProcessingSlot::default()),
            idle,
            progress,
            next_job_id: AtomicU64::new(1),
            honoured_cancels: AtomicU64::new(0),
        }
    }

    fn lock_slot(&self) -> MutexGuard<'_, ProcessingSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether an export or batch currently holds the slot
    pub fn is_busy(&self) -> bool {
        self.lock_slot().claimed
    }

    /// Id of the job currently running, if any
    pub fn running_job(&self) -> Option<JobId> {
        self.lock_slot().running
    }

    /// Latest relayed progress
    pub fn progress(&self) -> JobProgress {
        *self.progress.borrow()
    }

    /// Receiver for relayed progress updates
    pub fn subscribe_progress(&self) -> watch::Receiver<JobProgress> {
        self.progress.subscribe()
    }

    fn claim(&self) -> Result<SlotGuard<'_>, DomainError> {
        {
            let mut slot = self.lock_slot();
            if slot.claimed {
                return Err(DomainError::Busy);
            }
            slot.claimed = true;
        }
        self.idle.send_replace(false);
        Ok(SlotGuard { orchestrator: self })
    }

    /// Export one segment. Rejects with `Busy` instead of queueing.
    /// Collaborator failures come back as a `Failed` job, not an error.
    pub async fn run_single(
        &self,
        session: Option<&MediaSession>,
        segment: &Segment,
        settings: &ExportSettings,
    ) -> Result<Job, DomainError> {
        let session = session.ok_or(DomainError::NoActiveSession)?;
        let _guard = self.claim()?;

        let request = OutputNaming::export_request(session, segment, settings);
        self.execute(request, segment).await
    }

    /// Export segments one at a time in the given order. The first job that
    /// does not succeed halts the batch; later segments are left unattempted.
    pub async fn run_batch(
        &self,
        session: Option<&MediaSession>,
        segments: Vec<Segment>,
        settings: &ExportSettings,
    ) -> Result<BatchReport, DomainError> {
        let session = session.ok_or(DomainError::NoActiveSession)?;
        let _guard = self.claim()?;

        info!(segments = segments.len(), "Starting batch export");
        let mut report = BatchReport {
            jobs: Vec::with_capacity(segments.len()),
            unattempted: Vec::new(),
            failure: None,
            cancelled: false,
        };

        let mut remaining = segments.into_iter();
        while let Some(segment) = remaining.next() {
            let cancel_requested = self.lock_slot().cancel_requested;
            if cancel_requested {
                self.honoured_cancels.fetch_add(1, Ordering::SeqCst);
                report.cancelled = true;
                report.unattempted = std::iter::once(segment.id)
                    .chain(remaining.by_ref().map(|s| s.id))
                    .collect();
                break;
            }

            let request = OutputNaming::export_request(session, &segment, settings);
            let job = self.execute(request, &segment).await?;

            let halt = match &job.state {
                JobState::Failed(reason) => {
                    report.failure = Some(DomainError::ExportFailed(reason.clone()));
                    true
                }
                JobState::Cancelled => {
                    report.cancelled = true;
                    true
                }
                _ => false,
            };
            report.jobs.push(job);

            if halt {
                report.unattempted = remaining.by_ref().map(|s| s.id).collect();
                break;
            }
        }

        match (&report.failure, report.cancelled) {
            (Some(err), _) => error!(
                completed = report.jobs.len() - 1,
                skipped = report.unattempted.len(),
                "Batch export halted: {}",
                err
            ),
            (None, true) => warn!(
                skipped = report.unattempted.len(),
                "Batch export cancelled"
            ),
            (None, false) => info!(jobs = report.jobs.len(), "Batch export completed"),
        }
        Ok(report)
    }

    /// Ask the running export or batch to stop. Returns once the export
    /// service has reported a terminal outcome and the slot is free again.
    /// `true` when the request took effect: a job ended `Cancelled` or a
    /// batch halted before its next job. A job that finished on its own
    /// first, or an idle slot, yields `false`.
    pub async fn cancel(&self) -> bool {
        let mut idle = self.idle.subscribe();
        let (job, honoured_before) = {
            let mut slot = self.lock_slot();
            if !slot.claimed {
                debug!("Cancel requested with no running job");
                return false;
            }
            slot.cancel_requested = true;
            (slot.running, self.honoured_cancels.load(Ordering::SeqCst))
        };

        if let Some(job) = job {
            info!(job = job.0, "Cancelling export");
            if let Err(e) = self.export_port.cancel().await {
                warn!(job = job.0, "Export service did not acknowledge cancellation: {}", e);
            }
        }

        // The slot only frees once the collaborator's terminal signal arrived
        let _ = idle.wait_for(|idle| *idle).await;
        self.progress.send_replace(JobProgress::default());

        let honoured = self.honoured_cancels.load(Ordering::SeqCst) != honoured_before;
        if !honoured {
            debug!("Export finished before the cancel request reached it");
        }
        honoured
    }

    async fn execute(&self, request: ExportRequest, segment: &Segment) -> Result<Job, DomainError> {
        let id = JobId(self.next_job_id.fetch_add(1, Ordering::Relaxed));
        let mut job = Job::new(id, segment, request.output_path.clone());

        job.transition(JobState::Running)?;
        self.lock_slot().running = Some(id);
        self.progress.send_replace(JobProgress {
            job: Some(id),
            percent: 0.0,
        });

        info!(
            job = id.0,
            segment = %segment.name,
            start = request.start_time,
            end = request.end_time,
            output = %request.output_path.display(),
            "Export started"
        );

        let outcome = match self.export_port.start(&request).await {
            Ok(handle) => {
                // A cancel that raced the start found nothing to stop yet
                let cancel_requested = self.lock_slot().cancel_requested;
                if cancel_requested {
                    if let Err(e) = self.export_port.cancel().await {
                        warn!(job = id.0, "Export service did not acknowledge cancellation: {}", e);
                    }
                }
                self.drive(id, handle, request.duration()).await
            }
            Err(e) => ExportOutcome::Failed(e.to_string()),
        };

        let cancel_requested = {
            let mut slot = self.lock_slot();
            slot.running = None;
            slot.cancel_requested
        };

        let terminal = match outcome {
            _ if cancel_requested => JobState::Cancelled,
            ExportOutcome::Succeeded => JobState::Succeeded,
            ExportOutcome::Failed(reason) => JobState::Failed(reason),
            ExportOutcome::Cancelled => JobState::Cancelled,
        };
        if terminal == JobState::Cancelled {
            self.honoured_cancels.fetch_add(1, Ordering::SeqCst);
        }

        match &terminal {
            JobState::Succeeded => {
                self.progress.send_replace(JobProgress {
                    job: Some(id),
                    percent: 100.0,
                });
                info!(job = id.0, output = %job.output_path.display(), "Export succeeded");
            }
            JobState::Failed(reason) => error!(job = id.0, segment = %segment.name, "Export failed: {}", reason),
            _ => info!(job = id.0, "Export cancelled"),
        }

        job.transition(terminal)?;
        Ok(job)
    }

    /// Relay progress until the terminal signal arrives. Progress never
    /// changes job state.
    async fn drive(&self, id: JobId, mut handle: ExportHandle, total_duration: f64) -> ExportOutcome {
        let mut progress_open = true;
        loop {
            tokio::select! {
                biased;
                outcome = &mut handle.outcome => {
                    while let Ok(update) = handle.progress.try_recv() {
                        self.relay(id, &update, total_duration);
                    }
                    return outcome.unwrap_or_else(|_| {
                        ExportOutcome::Failed("export service dropped the job without a result".to_string())
                    });
                }
                update = handle.progress.recv(), if progress_open => match update {
                    Some(update) => self.relay(id, &update, total_duration),
                    None => progress_open = false,
                },
            }
        }
    }

    fn relay(&self, id: JobId, update: &ExportProgress, total_duration: f64) {
        let percent = ProgressPolicy::percent_of(update, total_duration);
        debug!(job = id.0, percent, "Export progress");
        self.progress.send_replace(JobProgress { job: Some(id), percent });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::{ScriptedExport, ScriptedExportAdapter};
    use std::path::PathBuf;

    fn session() -> MediaSession {
        MediaSession::new(&SessionTicket {
            generation: 1,
            source_path: PathBuf::from("/videos/clip.mp4"),
        })
    }

    fn segment(id: u64, name: &str, start: f64, end: f64) -> Segment {
        Segment {
            id: SegmentId(id),
            start_time: start,
            end_time: end,
            name: name.to_string(),
        }
    }

    fn orchestrator(adapter: &Arc<ScriptedExportAdapter>) -> Arc<JobOrchestrator> {
        Arc::new(JobOrchestrator::new(adapter.clone()))
    }

    #[tokio::test]
    async fn test_run_single_without_session_fails() {
        let adapter = Arc::new(ScriptedExportAdapter::new());
        let orchestrator = orchestrator(&adapter);

        let err = orchestrator
            .run_single(None, &segment(1, "Intro", 0.0, 5.0), &ExportSettings::default())
            .await
            .unwrap_err();
        assert_eq!(err, DomainError::NoActiveSession);
        assert!(adapter.requests().is_empty());
    }

    #[tokio::test]
    async fn test_run_single_delegates_request() {
        let adapter = Arc::new(ScriptedExportAdapter::new());
        let orchestrator = orchestrator(&adapter);
        let settings = ExportSettings::parse("854x480", "1000k").unwrap();

        let job = orchestrator
            .run_single(Some(&session()), &segment(1, "Intro Part", 10.0, 20.0), &settings)
            .await
            .unwrap();

        assert_eq!(job.state, JobState::Succeeded);
        let requests = adapter.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].source_path, PathBuf::from("/videos/clip.mp4"));
        assert_eq!(requests[0].output_path, PathBuf::from("/videos/clip_Intro_Part.mp4"));
        assert_eq!((requests[0].start_time, requests[0].end_time), (10.0, 20.0));
        assert_eq!(requests[0].resolution, Some(Resolution { width: 854, height: 480 }));
        assert_eq!(requests[0].bitrate, Some(Bitrate { kbps: 1000 }));
        assert!(!orchestrator.is_busy());
    }

    #[tokio::test]
    async fn test_repeated_single_export_targets_same_path() {
        let adapter = Arc::new(ScriptedExportAdapter::new());
        let orchestrator = orchestrator(&adapter);
        let seg = segment(1, "Intro Part", 10.0, 20.0);

        let first = orchestrator.run_single(Some(&session()), &seg, &ExportSettings::default()).await.unwrap();
        let second = orchestrator.run_single(Some(&session()), &seg, &ExportSettings::default()).await.unwrap();

        assert_eq!(first.output_path, second.output_path);
        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_run_single_while_running_is_busy() {
        let adapter = Arc::new(ScriptedExportAdapter::new());
        adapter.push(ScriptedExport::Hold);
        let orchestrator = orchestrator(&adapter);

        let running = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move {
                orchestrator
                    .run_single(Some(&session()), &segment(1, "A", 0.0, 5.0), &ExportSettings::default())
                    .await
            })
        };
        adapter.wait_for_starts(1).await;
        assert!(orchestrator.running_job().is_some());

        let err = orchestrator
            .run_single(Some(&session()), &segment(2, "B", 5.0, 9.0), &ExportSettings::default())
            .await
            .unwrap_err();
        assert_eq!(err, DomainError::Busy);
        // Never queued
        assert_eq!(adapter.requests().len(), 1);

        adapter.release(ExportOutcome::Succeeded);
        let job = running.await.unwrap().unwrap();
        assert_eq!(job.state, JobState::Succeeded);
        assert!(!orchestrator.is_busy());
    }

    #[tokio::test]
    async fn test_failed_export_becomes_failed_job() {
        let adapter = Arc::new(ScriptedExportAdapter::new());
        adapter.push(ScriptedExport::Fail("No space left on device".into()));
        let orchestrator = orchestrator(&adapter);

        let job = orchestrator
            .run_single(Some(&session()), &segment(1, "A", 0.0, 5.0), &ExportSettings::default())
            .await
            .unwrap();

        assert_eq!(job.state, JobState::Failed("No space left on device".into()));
        assert!(!orchestrator.is_busy());
    }

    #[tokio::test]
    async fn test_start_error_fails_job_and_frees_slot() {
        let adapter = Arc::new(ScriptedExportAdapter::new());
        adapter.push(ScriptedExport::RefuseStart("ffmpeg not found".into()));
        let orchestrator = orchestrator(&adapter);

        let job = orchestrator
            .run_single(Some(&session()), &segment(1, "A", 0.0, 5.0), &ExportSettings::default())
            .await
            .unwrap();
        assert!(matches!(job.state, JobState::Failed(_)));
        assert!(!orchestrator.is_busy());
    }

    #[tokio::test]
    async fn test_batch_halts_on_first_failure() {
        let adapter = Arc::new(ScriptedExportAdapter::new());
        adapter.push(ScriptedExport::Succeed(vec![]));
        adapter.push(ScriptedExport::Fail("disk full".into()));
        let orchestrator = orchestrator(&adapter);

        let segments = vec![
            segment(1, "A", 0.0, 1.0),
            segment(2, "B", 1.0, 2.0),
            segment(3, "C", 2.0, 3.0),
        ];
        let report = orchestrator
            .run_batch(Some(&session()), segments, &ExportSettings::default())
            .await
            .unwrap();

        assert_eq!(report.job_for(SegmentId(1)).unwrap().state, JobState::Succeeded);
        assert_eq!(
            report.job_for(SegmentId(2)).unwrap().state,
            JobState::Failed("disk full".into())
        );
        // C was never started in any state
        assert!(report.job_for(SegmentId(3)).is_none());
        assert_eq!(report.unattempted, vec![SegmentId(3)]);
        assert_eq!(report.failure, Some(DomainError::ExportFailed("disk full".into())));
        assert_eq!(adapter.requests().len(), 2);
        assert!(!report.is_complete());
    }

    #[tokio::test]
    async fn test_batch_runs_in_given_order() {
        let adapter = Arc::new(ScriptedExportAdapter::new());
        let orchestrator = orchestrator(&adapter);
        let segments = vec![segment(5, "Late", 50.0, 60.0), segment(2, "Early", 0.0, 5.0)];

        let report = orchestrator
            .run_batch(Some(&session()), segments, &ExportSettings::default())
            .await
            .unwrap();

        assert!(report.is_complete());
        let starts: Vec<f64> = adapter.requests().iter().map(|r| r.start_time).collect();
        assert_eq!(starts, vec![50.0, 0.0]);
    }

    #[tokio::test]
    async fn test_empty_batch_is_complete() {
        let adapter = Arc::new(ScriptedExportAdapter::new());
        let orchestrator = orchestrator(&adapter);
        let report = orchestrator
            .run_batch(Some(&session()), vec![], &ExportSettings::default())
            .await
            .unwrap();
        assert!(report.jobs.is_empty());
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn test_single_is_busy_during_batch() {
        let adapter = Arc::new(ScriptedExportAdapter::new());
        adapter.push(ScriptedExport::Hold);
        let orchestrator = orchestrator(&adapter);

        let batch = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move {
                let segments = vec![segment(1, "A", 0.0, 1.0), segment(2, "B", 1.0, 2.0)];
                orchestrator
                    .run_batch(Some(&session()), segments, &ExportSettings::default())
                    .await
            })
        };
        adapter.wait_for_starts(1).await;

        let err = orchestrator
            .run_single(Some(&session()), &segment(3, "C", 2.0, 3.0), &ExportSettings::default())
            .await
            .unwrap_err();
        assert_eq!(err, DomainError::Busy);

        adapter.release(ExportOutcome::Succeeded);
        let report = batch.await.unwrap().unwrap();
        assert!(report.is_complete());
        assert_eq!(report.jobs.len(), 2);
    }

    #[tokio::test]
    async fn test_cancel_when_idle_is_noop() {
        let adapter = Arc::new(ScriptedExportAdapter::new());
        let orchestrator = orchestrator(&adapter);
        assert!(!orchestrator.cancel().await);
        assert_eq!(adapter.cancel_calls(), 0);
    }

    #[tokio::test]
    async fn test_cancel_after_job_finished_reports_false() {
        let adapter = Arc::new(ScriptedExportAdapter::new());
        let orchestrator = orchestrator(&adapter);

        // Slot still claimed, job already done: the window before the guard drops
        let guard = orchestrator.claim().unwrap();
        let cancel = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.cancel().await })
        };
        while !orchestrator.lock_slot().cancel_requested {
            tokio::task::yield_now().await;
        }
        drop(guard);

        assert!(!cancel.await.unwrap());
        assert_eq!(adapter.cancel_calls(), 0);
        assert!(!orchestrator.is_busy());
    }

    #[tokio::test]
    async fn test_cancel_frees_slot_after_terminal_signal() {
        let adapter = Arc::new(ScriptedExportAdapter::new());
        adapter.push(ScriptedExport::Hold);
        let orchestrator = orchestrator(&adapter);

        let running = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move {
                orchestrator
                    .run_single(Some(&session()), &segment(1, "A", 0.0, 5.0), &ExportSettings::default())
                    .await
            })
        };
        adapter.wait_for_starts(1).await;

        assert!(orchestrator.cancel().await);
        assert_eq!(adapter.cancel_calls(), 1);
        assert!(!orchestrator.is_busy());

        let job = running.await.unwrap().unwrap();
        assert_eq!(job.state, JobState::Cancelled);

        // Slot is immediately reusable
        let next = orchestrator
            .run_single(Some(&session()), &segment(2, "B", 5.0, 6.0), &ExportSettings::default())
            .await
            .unwrap();
        assert_eq!(next.state, JobState::Succeeded);
    }

    #[tokio::test]
    async fn test_cancel_wins_over_late_success() {
        let adapter = Arc::new(ScriptedExportAdapter::new());
        adapter.push(ScriptedExport::HoldIgnoringCancel);
        let orchestrator = orchestrator(&adapter);

        let running = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move {
                orchestrator
                    .run_single(Some(&session()), &segment(1, "A", 0.0, 5.0), &ExportSettings::default())
                    .await
            })
        };
        adapter.wait_for_starts(1).await;

        let cancel = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.cancel().await })
        };
        adapter.wait_for_cancels(1).await;
        // The cancel is still waiting on the collaborator
        assert!(orchestrator.is_busy());

        adapter.release(ExportOutcome::Succeeded);
        assert!(cancel.await.unwrap());
        assert_eq!(running.await.unwrap().unwrap().state, JobState::Cancelled);
    }

    #[tokio::test]
    async fn test_cancel_halts_batch() {
        let adapter = Arc::new(ScriptedExportAdapter::new());
        adapter.push(ScriptedExport::Succeed(vec![]));
        adapter.push(ScriptedExport::Hold);
        let orchestrator = orchestrator(&adapter);

        let batch = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move {
                let segments = vec![
                    segment(1, "A", 0.0, 1.0),
                    segment(2, "B", 1.0, 2.0),
                    segment(3, "C", 2.0, 3.0),
                ];
                orchestrator
                    .run_batch(Some(&session()), segments, &ExportSettings::default())
                    .await
            })
        };
        adapter.wait_for_starts(2).await;
        assert!(orchestrator.cancel().await);

        let report = batch.await.unwrap().unwrap();
        assert!(report.cancelled);
        assert!(report.failure.is_none());
        assert_eq!(report.job_for(SegmentId(2)).unwrap().state, JobState::Cancelled);
        assert_eq!(report.unattempted, vec![SegmentId(3)]);
    }

    #[tokio::test]
    async fn test_progress_is_clamped_and_relayed() {
        let adapter = Arc::new(ScriptedExportAdapter::new());
        adapter.push(ScriptedExport::Succeed(vec![
            ExportProgress { percent: Some(-20.0), out_time: None },
            ExportProgress { percent: Some(250.0), out_time: None },
            ExportProgress { percent: None, out_time: None },
        ]));
        let orchestrator = orchestrator(&adapter);
        let mut progress = orchestrator.subscribe_progress();

        let seen = tokio::spawn(async move {
            let mut values = Vec::new();
            while progress.changed().await.is_ok() {
                let percent = progress.borrow_and_update().percent;
                assert!((0.0..=100.0).contains(&percent));
                values.push(percent);
                if values.len() > 16 {
                    break;
                }
            }
            values
        });

        let job = orchestrator
            .run_single(Some(&session()), &segment(1, "A", 0.0, 10.0), &ExportSettings::default())
            .await
            .unwrap();
        assert_eq!(job.state, JobState::Succeeded);
        assert_eq!(orchestrator.progress().percent, 100.0);

        drop(orchestrator);
        let values = seen.await.unwrap();
        assert_eq!(values.last(), Some(&100.0));
    }

    #[tokio::test]
    async fn test_progress_from_out_time() {
        let adapter = Arc::new(ScriptedExportAdapter::new());
        adapter.push(ScriptedExport::Hold);
        let orchestrator = orchestrator(&adapter);

        let running = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move {
                orchestrator
                    .run_single(Some(&session()), &segment(1, "A", 10.0, 30.0), &ExportSettings::default())
                    .await
            })
        };
        adapter.wait_for_starts(1).await;

        let mut progress = orchestrator.subscribe_progress();
        adapter.emit(ExportProgress { percent: None, out_time: Some(5.0) });
        progress.wait_for(|p| p.percent == 25.0).await.unwrap();

        adapter.release(ExportOutcome::Succeeded);
        assert_eq!(running.await.unwrap().unwrap().state, JobState::Succeeded);
    }
}
