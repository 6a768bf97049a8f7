// Headless playback surface - Virtual clock standing in for a media element

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::errors::*;
use crate::ports::*;

/// Operation recorded by the surface, in call order
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    Load(PathBuf),
    Seek(f64),
    Play,
    Pause,
    SetVolume(f64),
    SetMuted(bool),
    SetFullscreen(bool),
}

#[derive(Debug, Default)]
struct SurfaceState {
    source: Option<PathBuf>,
    position: f64,
    playing: bool,
    volume: f64,
    muted: bool,
    fullscreen: bool,
    duration: Option<f64>,
    calls: Vec<SurfaceCall>,
    fail_next_play: Option<String>,
}

/// Playback surface driven by an explicit clock instead of a decoder
#[derive(Debug)]
pub struct HeadlessSurface {
    state: Mutex<SurfaceState>,
}

impl Default for HeadlessSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SurfaceState {
                volume: 1.0,
                ..Default::default()
            }),
        }
    }

    pub fn with_duration(duration: f64) -> Self {
        let surface = Self::new();
        surface.set_duration(Some(duration));
        surface
    }

    fn lock(&self) -> MutexGuard<'_, SurfaceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Metadata duration the surface reports once a file is loaded
    pub fn set_duration(&self, duration: Option<f64>) {
        self.lock().duration = duration;
    }

    pub fn is_playing(&self) -> bool {
        self.lock().playing
    }

    pub fn is_muted(&self) -> bool {
        self.lock().muted
    }

    pub fn source(&self) -> Option<PathBuf> {
        self.lock().source.clone()
    }

    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.lock().calls.clone()
    }

    /// Make the next `play` fail, like a blocked autoplay
    pub fn fail_next_play(&self, reason: &str) {
        self.lock().fail_next_play = Some(reason.to_string());
    }

    /// Advance the clock by `delta` seconds. Returns the new position when
    /// playing, which is the time-update notification a real element emits.
    /// Playback stops at the end of the media.
    pub fn advance(&self, delta: f64) -> Option<f64> {
        let mut state = self.lock();
        if !state.playing {
            return None;
        }
        state.position += delta.max(0.0);
        if let Some(duration) = state.duration {
            if state.position >= duration {
                state.position = duration;
                state.playing = false;
            }
        }
        Some(state.position)
    }
}

#[async_trait]
impl PlaybackPort for HeadlessSurface {
    async fn load(&self, path: &Path) -> Result<(), DomainError> {
        let mut state = self.lock();
        state.calls.push(SurfaceCall::Load(path.to_path_buf()));
        state.source = Some(path.to_path_buf());
        state.position = 0.0;
        state.playing = false;
        Ok(())
    }

    async fn seek(&self, position: f64) -> Result<(), DomainError> {
        let mut state = self.lock();
        state.calls.push(SurfaceCall::Seek(position));
        let upper = state.duration.unwrap_or(f64::MAX);
        state.position = position.clamp(0.0, upper);
        Ok(())
    }

    async fn play(&self) -> Result<(), DomainError> {
        let mut state = self.lock();
        state.calls.push(SurfaceCall::Play);
        if let Some(reason) = state.fail_next_play.take() {
            state.playing = false;
            return Err(DomainError::SurfaceFailed(reason));
        }
        state.playing = true;
        Ok(())
    }

    async fn pause(&self) -> Result<(), DomainError> {
        let mut state = self.lock();
        state.calls.push(SurfaceCall::Pause);
        state.playing = false;
        Ok(())
    }

    async fn set_volume(&self, volume: f64) -> Result<(), DomainError> {
        let mut state = self.lock();
        state.calls.push(SurfaceCall::SetVolume(volume));
        state.volume = volume;
        Ok(())
    }

    async fn set_muted(&self, muted: bool) -> Result<(), DomainError> {
        let mut state = self.lock();
        state.calls.push(SurfaceCall::SetMuted(muted));
        state.muted = muted;
        Ok(())
    }

    async fn set_fullscreen(&self, fullscreen: bool) -> Result<(), DomainError> {
        let mut state = self.lock();
        state.calls.push(SurfaceCall::SetFullscreen(fullscreen));
        state.fullscreen = fullscreen;
        Ok(())
    }

    async fn position(&self) -> f64 {
        self.lock().position
    }

    async fn duration(&self) -> Option<f64> {
        self.lock().duration
    }
}
