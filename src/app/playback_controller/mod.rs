// Playback controller - Constrains the playback surface to the active view mode

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::store::SegmentStore;
use crate::ports::PlaybackPort;

/// What the controller did with a time-update notification
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeUpdate {
    /// Position recorded, nothing enforced
    Passed,
    /// Segment end reached: paused and rewound to the segment start
    Looped { reset_to: f64 },
    /// Active segment vanished; mode fell back to original
    Detached,
}

/// Controller-side view of the surface
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    pub position: f64,
    pub playing: bool,
    pub volume: f64,
    pub muted: bool,
    pub fullscreen: bool,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            position: 0.0,
            playing: false,
            volume: 1.0,
            muted: false,
            fullscreen: false,
        }
    }
}

/// Drives the playback surface in `Original` or `Segment` mode
pub struct PlaybackController {
    surface: Arc<dyn PlaybackPort>,
    mode: ViewMode,
    state: PlaybackState,
}

impl PlaybackController {
    pub fn new(surface: Arc<dyn PlaybackPort>) -> Self {
        Self {
            surface,
            mode: ViewMode::Original,
            state: PlaybackState::default(),
        }
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    /// Load a new playable file into the surface
    pub async fn load(&mut self, path: &Path) -> Result<(), DomainError> {
        self.surface.load(path).await?;
        self.state.position = 0.0;
        self.state.playing = false;
        Ok(())
    }

    /// Surface duration as reported by its own metadata
    pub async fn surface_duration(&self) -> Option<f64> {
        self.surface.duration().await
    }

    /// Seek to the segment start and constrain playback to it. Does not play.
    pub async fn enter_segment(&mut self, segment: &Segment) -> Result<(), DomainError> {
        self.surface.seek(segment.start_time).await?;
        self.state.position = segment.start_time;
        self.mode = ViewMode::Segment(segment.id);
        debug!(segment = %segment.id, start = segment.start_time, end = segment.end_time, "Entered segment preview");
        Ok(())
    }

    /// Back to whole-session playback; the surface position is left alone
    pub fn return_to_original(&mut self) {
        if self.mode != ViewMode::Original {
            debug!("Returned to original view");
        }
        self.mode = ViewMode::Original;
    }

    /// Synchronous removal notice from the segment store
    pub fn segment_removed(&mut self, id: SegmentId) -> bool {
        if self.mode == ViewMode::Segment(id) {
            self.return_to_original();
            return true;
        }
        false
    }

    /// Handle one time-update notification. Every notification is checked;
    /// the bounds monitor stays armed for as long as the segment mode lasts.
    pub async fn on_time_update(
        &mut self,
        position: f64,
        store: &SegmentStore,
    ) -> Result<TimeUpdate, DomainError> {
        self.state.position = position;

        let ViewMode::Segment(id) = self.mode else {
            return Ok(TimeUpdate::Passed);
        };

        let Some(segment) = store.get(id) else {
            warn!(segment = %id, "Previewed segment no longer exists, leaving segment view");
            self.return_to_original();
            return Ok(TimeUpdate::Detached);
        };

        if position < segment.end_time {
            return Ok(TimeUpdate::Passed);
        }

        let reset_to = segment.start_time;
        self.surface.pause().await?;
        self.state.playing = false;
        self.surface.seek(reset_to).await?;
        self.state.position = reset_to;
        debug!(segment = %id, position, reset_to, "Segment end reached");
        Ok(TimeUpdate::Looped { reset_to })
    }

    /// Seek in the current mode's coordinates: segment-relative in `Segment`
    /// mode (clamped into the segment), absolute otherwise
    pub async fn seek(&mut self, time: f64, store: &SegmentStore) -> Result<f64, DomainError> {
        let absolute = self.to_absolute(time, store);
        self.surface.seek(absolute).await?;
        self.state.position = absolute;
        Ok(absolute)
    }

    fn to_absolute(&self, time: f64, store: &SegmentStore) -> f64 {
        let time = if time.is_finite() { time.max(0.0) } else { 0.0 };
        match self.mode.active_segment().and_then(|id| store.get(id)) {
            Some(segment) => segment.start_time + time.min(segment.duration()),
            None => time,
        }
    }

    pub async fn play(&mut self) -> Result<(), DomainError> {
        match self.surface.play().await {
            Ok(()) => {
                self.state.playing = true;
                Ok(())
            }
            Err(e) => {
                self.state.playing = false;
                Err(e)
            }
        }
    }

    pub async fn pause(&mut self) -> Result<(), DomainError> {
        self.surface.pause().await?;
        self.state.playing = false;
        Ok(())
    }

    pub async fn toggle_play(&mut self) -> Result<bool, DomainError> {
        if self.state.playing {
            self.pause().await?;
        } else {
            self.play().await?;
        }
        Ok(self.state.playing)
    }

    /// Pause and rewind to zero in the current mode's coordinates
    pub async fn stop(&mut self, store: &SegmentStore) -> Result<(), DomainError> {
        self.pause().await?;
        self.seek(0.0, store).await?;
        Ok(())
    }

    /// Volume in [0, 1]. Zero mutes; raising it while muted unmutes.
    pub async fn set_volume(&mut self, volume: f64) -> Result<(), DomainError> {
        let volume = if volume.is_finite() { volume.clamp(0.0, 1.0) } else { 0.0 };
        self.surface.set_volume(volume).await?;
        self.state.volume = volume;

        if volume == 0.0 {
            self.surface.set_muted(true).await?;
            self.state.muted = true;
        } else if self.state.muted {
            self.surface.set_muted(false).await?;
            self.state.muted = false;
        }
        Ok(())
    }

    pub async fn toggle_mute(&mut self) -> Result<bool, DomainError> {
        let muted = !self.state.muted;
        self.surface.set_muted(muted).await?;
        self.state.muted = muted;
        Ok(muted)
    }

    pub async fn toggle_fullscreen(&mut self) -> Result<bool, DomainError> {
        let fullscreen = !self.state.fullscreen;
        self.surface.set_fullscreen(fullscreen).await?;
        self.state.fullscreen = fullscreen;
        Ok(fullscreen)
    }

    /// Session change: stop playback, rewind, leave segment mode
    pub async fn reset(&mut self) -> Result<(), DomainError> {
        self.mode = ViewMode::Original;
        self.state.playing = false;
        self.state.position = 0.0;
        self.surface.pause().await?;
        self.surface.seek(0.0).await?;
        Ok(())
    }
}
