// Workspace - One editing session: media, segments, playback and exports

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::app::job_orchestrator::JobOrchestrator;
use crate::app::playback_controller::{PlaybackController, PlaybackState, TimeUpdate};
use crate::app::session_loader::{InspectionOutcome, PreviewOutcome, SessionLoader};
use crate::app::view_coordinator::ViewCoordinator;
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::store::SegmentStore;
use crate::ports::PlaybackPort;

/// Owns the session, its segments and the playback controller. Every
/// mutation goes through here; exports are delegated to the shared
/// orchestrator, which alone owns the processing slot.
pub struct Workspace {
    loader: SessionLoader,
    controller: PlaybackController,
    store: SegmentStore,
    session: Option<MediaSession>,
    generation: u64,
    orchestrator: Arc<JobOrchestrator>,
    settings: ExportSettings,
}

impl Workspace {
    pub fn new(
        loader: SessionLoader,
        surface: Arc<dyn PlaybackPort>,
        orchestrator: Arc<JobOrchestrator>,
        settings: ExportSettings,
    ) -> Self {
        Self {
            loader,
            controller: PlaybackController::new(surface),
            store: SegmentStore::new(),
            session: None,
            generation: 0,
            orchestrator,
            settings,
        }
    }

    pub fn session(&self) -> Option<&MediaSession> {
        self.session.as_ref()
    }

    pub fn segments(&self) -> &[Segment] {
        self.store.list()
    }

    pub fn segment(&self, id: SegmentId) -> Option<&Segment> {
        self.store.get(id)
    }

    pub fn mode(&self) -> ViewMode {
        self.controller.mode()
    }

    pub fn playback(&self) -> &PlaybackState {
        self.controller.state()
    }

    pub fn loader(&self) -> &SessionLoader {
        &self.loader
    }

    pub fn orchestrator(&self) -> Arc<JobOrchestrator> {
        self.orchestrator.clone()
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: ExportSettings) {
        self.settings = settings;
    }

    /// Open `path` as the new session and run inspection and preview
    /// preparation to completion
    pub async fn open(&mut self, path: impl Into<PathBuf>) -> Result<SessionTicket, DomainError> {
        let ticket = self.begin_session(path).await?;
        let (inspection, preview) = self.load(&ticket).await;
        self.apply_inspection(inspection)?;
        self.apply_preview(preview).await?;
        Ok(ticket)
    }

    /// Run inspection and preview preparation for `ticket`. The returned
    /// future owns its collaborators, so the workspace stays usable while it
    /// runs; a newer `begin_session` turns its outcomes stale.
    pub fn load(
        &self,
        ticket: &SessionTicket,
    ) -> impl Future<Output = (InspectionOutcome, PreviewOutcome)> + Send + 'static {
        let loader = self.loader.clone();
        let ticket = ticket.clone();
        async move { loader.load(&ticket).await }
    }

    /// Replace the session. Clears segments and resets playback; results
    /// still in flight for the previous session become stale.
    pub async fn begin_session(&mut self, path: impl Into<PathBuf>) -> Result<SessionTicket, DomainError> {
        if self.orchestrator.is_busy() {
            return Err(DomainError::Busy);
        }

        self.generation += 1;
        let ticket = SessionTicket {
            generation: self.generation,
            source_path: path.into(),
        };
        info!(generation = ticket.generation, path = %ticket.source_path.display(), "Opening session");

        self.session = Some(MediaSession::new(&ticket));
        self.store.clear();
        if let Err(e) = self.controller.reset().await {
            warn!("Playback surface did not reset: {}", e);
        }
        Ok(ticket)
    }

    fn current_session_for(&mut self, ticket: &SessionTicket) -> Result<&mut MediaSession, DomainError> {
        match self.session.as_mut() {
            Some(session)
                if session.generation() == ticket.generation
                    && session.source_path() == ticket.source_path.as_path() =>
            {
                Ok(session)
            }
            _ => {
                debug!(
                    generation = ticket.generation,
                    path = %ticket.source_path.display(),
                    "Discarding result for a replaced session"
                );
                Err(DomainError::StaleResult)
            }
        }
    }

    /// Apply an inspection result. A failed inspection leaves the session
    /// without an inspected duration.
    pub fn apply_inspection(&mut self, outcome: InspectionOutcome) -> Result<(), DomainError> {
        let session = self.current_session_for(&outcome.ticket)?;
        if let Ok(info) = outcome.result {
            session.set_media_info(info);
        }
        Ok(())
    }

    /// Apply a preview result and load the playable file into the surface
    pub async fn apply_preview(&mut self, outcome: PreviewOutcome) -> Result<(), DomainError> {
        let session = self.current_session_for(&outcome.ticket)?;
        session.set_preview(match outcome.result {
            Ok(path) => PreviewState::Ready(path),
            Err(_) => PreviewState::Degraded,
        });

        let Some(playable) = session.playback_path().map(Path::to_path_buf) else {
            return Ok(());
        };
        if let Err(e) = self.controller.load(&playable).await {
            warn!(path = %playable.display(), "Playback surface could not load media: {}", e);
            return Ok(());
        }
        if let Some(duration) = self.controller.surface_duration().await {
            self.on_surface_metadata(duration);
        }
        Ok(())
    }

    /// The surface reported its own duration. Only taken in original mode
    /// and never over an inspected value.
    pub fn on_surface_metadata(&mut self, duration: f64) -> bool {
        if self.controller.mode() != ViewMode::Original {
            return false;
        }
        self.session
            .as_mut()
            .map(|s| s.apply_surface_duration(duration))
            .unwrap_or(false)
    }

    pub fn add_segment(
        &mut self,
        start_time: f64,
        end_time: f64,
        name: Option<String>,
    ) -> Result<Segment, DomainError> {
        let segment = self.store.add(start_time, end_time, name)?;
        info!(segment = %segment.id, name = %segment.name, start = start_time, end = end_time, "Segment added");
        Ok(segment)
    }

    /// Replace a segment's record wholesale, keeping its id
    pub fn replace_segment(
        &mut self,
        id: SegmentId,
        start_time: f64,
        end_time: f64,
        name: String,
    ) -> Result<Segment, DomainError> {
        self.store.replace(id, start_time, end_time, name)
    }

    /// Idempotent. Leaves segment view first if `id` is being previewed.
    pub fn remove_segment(&mut self, id: SegmentId) -> bool {
        let removed = self.store.remove(id);
        if removed {
            self.controller.segment_removed(id);
            info!(segment = %id, "Segment removed");
        }
        removed
    }

    /// Constrain playback to one segment
    pub async fn preview_segment(&mut self, id: SegmentId) -> Result<(), DomainError> {
        let session = self.session.as_ref().ok_or(DomainError::NoActiveSession)?;
        if !session.is_playable() {
            return Err(DomainError::PreviewUnavailable);
        }
        let segment = self
            .store
            .get(id)
            .cloned()
            .ok_or(DomainError::UnknownSegment(id.0))?;
        self.controller.enter_segment(&segment).await
    }

    pub fn return_to_original(&mut self) {
        self.controller.return_to_original();
    }

    /// Feed one surface time-update notification
    pub async fn on_time_update(&mut self, position: f64) -> Result<TimeUpdate, DomainError> {
        self.controller.on_time_update(position, &self.store).await
    }

    pub async fn play(&mut self) -> Result<(), DomainError> {
        self.controller.play().await
    }

    pub async fn pause(&mut self) -> Result<(), DomainError> {
        self.controller.pause().await
    }

    pub async fn toggle_play(&mut self) -> Result<bool, DomainError> {
        self.controller.toggle_play().await
    }

    /// Seek in the current mode's coordinates; returns the absolute position
    pub async fn seek(&mut self, time: f64) -> Result<f64, DomainError> {
        self.controller.seek(time, &self.store).await
    }

    pub async fn stop(&mut self) -> Result<(), DomainError> {
        self.controller.stop(&self.store).await
    }

    pub async fn set_volume(&mut self, volume: f64) -> Result<(), DomainError> {
        self.controller.set_volume(volume).await
    }

    pub async fn toggle_mute(&mut self) -> Result<bool, DomainError> {
        self.controller.toggle_mute().await
    }

    pub async fn toggle_fullscreen(&mut self) -> Result<bool, DomainError> {
        self.controller.toggle_fullscreen().await
    }

    /// What the UI should show for the current surface position
    pub fn clock(&self) -> DisplayClock {
        ViewCoordinator::display_clock(
            self.controller.mode(),
            &self.store,
            self.session.as_ref(),
            self.controller.state().position,
        )
    }

    /// Export one segment as it is right now. The future owns copies of the
    /// session, segment and settings, so playback and segment edits can go on
    /// while it runs.
    pub fn export_segment(
        &self,
        id: SegmentId,
    ) -> impl Future<Output = Result<Job, DomainError>> + Send + 'static {
        let orchestrator = self.orchestrator.clone();
        let session = self.session.clone();
        let segment = self.store.get(id).cloned();
        let settings = self.settings.clone();
        async move {
            let session = session.ok_or(DomainError::NoActiveSession)?;
            let segment = segment.ok_or(DomainError::UnknownSegment(id.0))?;
            orchestrator
                .run_single(Some(&session), &segment, &settings)
                .await
        }
    }

    /// Export every segment in store order as of this call. Later store
    /// mutations do not change the batch.
    pub fn export_all(
        &self,
    ) -> impl Future<Output = Result<BatchReport, DomainError>> + Send + 'static {
        let orchestrator = self.orchestrator.clone();
        let session = self.session.clone();
        let segments = self.store.snapshot();
        let settings = self.settings.clone();
        async move {
            orchestrator
                .run_batch(session.as_ref(), segments, &settings)
                .await
        }
    }
}
