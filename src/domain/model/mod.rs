// Domain models - Core types and data structures

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;

/// Time specification - represents time in seconds with fractional precision
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct TimeSpec {
    pub seconds: f64,
}

impl TimeSpec {
    /// Create a new TimeSpec from seconds
    pub fn from_seconds(seconds: f64) -> Self {
        Self { seconds }
    }

    pub fn as_seconds(&self) -> f64 {
        self.seconds
    }

    /// Parse time string in seconds, MM:SS.ms or HH:MM:SS.ms form
    pub fn parse(time_str: &str) -> Result<Self, DomainError> {
        let trimmed = time_str.trim();

        if let Ok(seconds) = trimmed.parse::<f64>() {
            if !seconds.is_finite() || seconds < 0.0 {
                return Err(DomainError::BadArgs(format!(
                    "Time must be a non-negative number: {}",
                    trimmed
                )));
            }
            return Ok(Self::from_seconds(seconds));
        }

        let parts: Vec<&str> = trimmed.split(':').collect();
        let (hours, minutes, seconds) = match parts.as_slice() {
            [m, s] => (0, parse_component(m, "minutes")?, parse_seconds(s)?),
            [h, m, s] => {
                let minutes = parse_component(m, "minutes")?;
                if minutes >= 60 {
                    return Err(DomainError::BadArgs(
                        "Minutes must be less than 60".to_string(),
                    ));
                }
                (parse_component(h, "hours")?, minutes, parse_seconds(s)?)
            }
            _ => {
                return Err(DomainError::BadArgs(format!(
                    "Invalid time format '{}'. Supported formats: seconds (123.45), MM:SS.ms (2:30.5), HH:MM:SS.ms (1:02:30.5)",
                    trimmed
                )))
            }
        };

        Ok(Self::from_seconds(
            hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds,
        ))
    }

    /// Format as HH:MM:SS.ms, dropping the hours when zero
    pub fn format_hms(&self) -> String {
        let total_ms = (self.seconds * 1000.0).round() as u64;
        let hours = total_ms / 3_600_000;
        let minutes = (total_ms % 3_600_000) / 60_000;
        let seconds = (total_ms % 60_000) / 1000;
        let milliseconds = total_ms % 1000;

        if hours > 0 {
            format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, milliseconds)
        } else {
            format!("{:02}:{:02}.{:03}", minutes, seconds, milliseconds)
        }
    }
}

fn parse_component(part: &str, what: &str) -> Result<u32, DomainError> {
    part.parse::<u32>()
        .map_err(|_| DomainError::BadArgs(format!("Invalid {} format: {}", what, part)))
}

fn parse_seconds(part: &str) -> Result<f64, DomainError> {
    let seconds = part
        .parse::<f64>()
        .map_err(|_| DomainError::BadArgs(format!("Invalid seconds format: {}", part)))?;
    if !(0.0..60.0).contains(&seconds) {
        return Err(DomainError::BadArgs(
            "Seconds must be less than 60".to_string(),
        ));
    }
    Ok(seconds)
}

impl fmt::Display for TimeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_hms())
    }
}

/// Opaque segment identifier, stable for the segment's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SegmentId(pub u64);

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A named `[start_time, end_time)` range of the source media
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: SegmentId,
    pub start_time: f64,
    pub end_time: f64,
    pub name: String,
}

impl Segment {
    /// Check the creation invariant without building a segment
    pub fn validate_range(start_time: f64, end_time: f64) -> Result<(), DomainError> {
        let finite = start_time.is_finite() && end_time.is_finite();
        if !finite || start_time < 0.0 || start_time >= end_time {
            return Err(DomainError::InvalidRange {
                start: start_time,
                end: end_time,
            });
        }
        Ok(())
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// Playback view mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    /// Whole-session playback
    #[default]
    Original,
    /// Playback constrained to one segment
    Segment(SegmentId),
}

impl ViewMode {
    pub fn active_segment(&self) -> Option<SegmentId> {
        match self {
            ViewMode::Original => None,
            ViewMode::Segment(id) => Some(*id),
        }
    }
}

/// Stream kind reported by the inspection service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Video,
    Audio,
    Subtitle,
    Other,
}

/// Stream metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamInfo {
    pub index: usize,
    pub kind: StreamKind,
    pub codec: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u32>,
}

/// Result of inspecting a media file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInfo {
    pub path: String,
    pub container: String,
    pub duration: Option<f64>,
    pub bit_rate: Option<u64>,
    pub streams: Vec<StreamInfo>,
    pub metadata: HashMap<String, String>,
}

impl MediaInfo {
    pub fn video_streams(&self) -> impl Iterator<Item = &StreamInfo> {
        self.streams.iter().filter(|s| s.kind == StreamKind::Video)
    }

    pub fn audio_streams(&self) -> impl Iterator<Item = &StreamInfo> {
        self.streams.iter().filter(|s| s.kind == StreamKind::Audio)
    }
}

/// Where the session duration came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationSource {
    Inspection,
    Surface,
}

/// Identifies one attempt to open a session; results carry it back
#[derive(Debug, Clone, PartialEq)]
pub struct SessionTicket {
    pub generation: u64,
    pub source_path: PathBuf,
}

/// Preview proxy status
#[derive(Debug, Clone, PartialEq)]
pub enum PreviewState {
    /// Inspection or conversion still in flight
    Pending,
    /// Playable file available (may be the source itself)
    Ready(PathBuf),
    /// Conversion failed; playback falls back to the source
    Degraded,
}

/// Currently loaded media
#[derive(Debug, Clone)]
pub struct MediaSession {
    generation: u64,
    source_path: PathBuf,
    preview: PreviewState,
    duration: Option<(f64, DurationSource)>,
    media_info: Option<MediaInfo>,
}

impl MediaSession {
    pub fn new(ticket: &SessionTicket) -> Self {
        Self {
            generation: ticket.generation,
            source_path: ticket.source_path.clone(),
            preview: PreviewState::Pending,
            duration: None,
            media_info: None,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Proxy path once conversion finished successfully
    pub fn preview_path(&self) -> Option<&Path> {
        match &self.preview {
            PreviewState::Ready(path) => Some(path),
            _ => None,
        }
    }

    pub fn preview_state(&self) -> &PreviewState {
        &self.preview
    }

    /// File the playback surface should load, if any is ready
    pub fn playback_path(&self) -> Option<&Path> {
        match &self.preview {
            PreviewState::Pending => None,
            PreviewState::Ready(path) => Some(path),
            PreviewState::Degraded => Some(&self.source_path),
        }
    }

    pub fn is_playable(&self) -> bool {
        self.playback_path().is_some()
    }

    pub fn duration(&self) -> Option<f64> {
        self.duration.map(|(d, _)| d)
    }

    pub fn duration_source(&self) -> Option<DurationSource> {
        self.duration.map(|(_, source)| source)
    }

    pub fn media_info(&self) -> Option<&MediaInfo> {
        self.media_info.as_ref()
    }

    pub fn set_media_info(&mut self, info: MediaInfo) {
        if let Some(duration) = info.duration.filter(|d| d.is_finite() && *d > 0.0) {
            self.duration = Some((duration, DurationSource::Inspection));
        }
        self.media_info = Some(info);
    }

    /// Apply the surface's own duration; never overrides an inspected one
    pub fn apply_surface_duration(&mut self, duration: f64) -> bool {
        if !duration.is_finite() || duration <= 0.0 {
            return false;
        }
        match self.duration {
            Some((_, DurationSource::Inspection)) => false,
            _ => {
                self.duration = Some((duration, DurationSource::Surface));
                true
            }
        }
    }

    pub fn set_preview(&mut self, preview: PreviewState) {
        self.preview = preview;
    }
}

/// Output frame size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// Preset values offered by the UI
    pub const PRESETS: [(&'static str, &'static str); 5] = [
        ("original", "Original"),
        ("1920x1080", "1080p (1920x1080)"),
        ("1280x720", "720p (1280x720)"),
        ("854x480", "480p (854x480)"),
        ("640x360", "360p (640x360)"),
    ];

    /// Parse `WxH`; `original` means no scaling
    pub fn parse(value: &str) -> Result<Option<Self>, DomainError> {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("original") {
            return Ok(None);
        }
        let (w, h) = value
            .split_once(['x', 'X'])
            .ok_or_else(|| DomainError::BadArgs(format!("Invalid resolution: {}", value)))?;
        let width = w
            .parse::<u32>()
            .map_err(|_| DomainError::BadArgs(format!("Invalid resolution width: {}", w)))?;
        let height = h
            .parse::<u32>()
            .map_err(|_| DomainError::BadArgs(format!("Invalid resolution height: {}", h)))?;
        if width == 0 || height == 0 {
            return Err(DomainError::BadArgs(
                "Resolution dimensions cannot be zero".to_string(),
            ));
        }
        Ok(Some(Self { width, height }))
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Video bitrate in kilobits per second
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Bitrate {
    pub kbps: u32,
}

impl Bitrate {
    pub const PRESETS: [(&'static str, &'static str); 5] = [
        ("original", "Original"),
        ("8000k", "High (8 Mbps)"),
        ("4000k", "Medium (4 Mbps)"),
        ("2000k", "Low (2 Mbps)"),
        ("1000k", "Very Low (1 Mbps)"),
    ];

    /// Parse `<n>k`, `<n>M` or plain kbps; `original` keeps the source bitrate
    pub fn parse(value: &str) -> Result<Option<Self>, DomainError> {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("original") {
            return Ok(None);
        }
        let (digits, factor) = if let Some(v) = value.strip_suffix(['k', 'K']) {
            (v, 1)
        } else if let Some(v) = value.strip_suffix(['m', 'M']) {
            (v, 1000)
        } else {
            (value, 1)
        };
        let kbps = digits
            .parse::<u32>()
            .ok()
            .and_then(|n| n.checked_mul(factor))
            .filter(|n| *n > 0)
            .ok_or_else(|| DomainError::BadArgs(format!("Invalid bitrate: {}", value)))?;
        Ok(Some(Self { kbps }))
    }
}

impl fmt::Display for Bitrate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}k", self.kbps)
    }
}

/// Optional output overrides; `None` keeps the source's value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportSettings {
    pub resolution: Option<Resolution>,
    pub bitrate: Option<Bitrate>,
}

impl ExportSettings {
    pub fn parse(resolution: &str, bitrate: &str) -> Result<Self, DomainError> {
        Ok(Self {
            resolution: Resolution::parse(resolution)?,
            bitrate: Bitrate::parse(bitrate)?,
        })
    }
}

/// Everything the export service needs for one cut
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRequest {
    pub source_path: PathBuf,
    pub output_path: PathBuf,
    pub start_time: f64,
    pub end_time: f64,
    pub resolution: Option<Resolution>,
    pub bitrate: Option<Bitrate>,
}

impl ExportRequest {
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// Export job identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct JobId(pub u64);

/// Export job lifecycle state
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Running,
    Succeeded,
    Failed(String),
    Cancelled,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Succeeded | JobState::Failed(_) | JobState::Cancelled
        )
    }

    fn label(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Succeeded => "succeeded",
            JobState::Failed(_) => "failed",
            JobState::Cancelled => "cancelled",
        }
    }

    /// Pending -> Running -> {Succeeded, Failed, Cancelled}
    pub fn can_transition_to(&self, next: &JobState) -> bool {
        matches!(
            (self, next),
            (JobState::Pending, JobState::Running)
                | (JobState::Running, JobState::Succeeded)
                | (JobState::Running, JobState::Failed(_))
                | (JobState::Running, JobState::Cancelled)
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Failed(reason) => write!(f, "failed ({})", reason),
            other => write!(f, "{}", other.label()),
        }
    }
}

/// One export of one segment
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub id: JobId,
    pub segment_id: SegmentId,
    pub segment_name: String,
    pub output_path: PathBuf,
    pub state: JobState,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(id: JobId, segment: &Segment, output_path: PathBuf) -> Self {
        Self {
            id,
            segment_id: segment.id,
            segment_name: segment.name.clone(),
            output_path,
            state: JobState::Pending,
            started_at: None,
            finished_at: None,
        }
    }

    /// Move to `next`, rejecting anything the lifecycle does not allow
    pub fn transition(&mut self, next: JobState) -> Result<(), DomainError> {
        if !self.state.can_transition_to(&next) {
            return Err(DomainError::InvalidTransition {
                from: self.state.label().to_string(),
                to: next.label().to_string(),
            });
        }
        match next {
            JobState::Running => self.started_at = Some(Utc::now()),
            ref terminal if terminal.is_terminal() => self.finished_at = Some(Utc::now()),
            _ => {}
        }
        self.state = next;
        Ok(())
    }
}

/// Outcome of a batch export
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    /// Jobs that were started, in order
    pub jobs: Vec<Job>,
    /// Segments never started because the batch halted
    pub unattempted: Vec<SegmentId>,
    /// The one failure that halted the batch, if any
    #[serde(serialize_with = "serialize_failure")]
    pub failure: Option<DomainError>,
    /// The batch stopped because its running job was cancelled
    pub cancelled: bool,
}

fn serialize_failure<S>(failure: &Option<DomainError>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match failure {
        Some(err) => serializer.serialize_some(&err.to_string()),
        None => serializer.serialize_none(),
    }
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
            && !self.cancelled
            && self.unattempted.is_empty()
            && self.jobs.iter().all(|j| j.state == JobState::Succeeded)
    }

    /// `Err(Cancelled)` for a cancelled run, else the halting failure
    pub fn outcome(&self) -> Result<(), DomainError> {
        if self.cancelled {
            return Err(DomainError::Cancelled);
        }
        match &self.failure {
            Some(failure) => Err(failure.clone()),
            None => Ok(()),
        }
    }

    pub fn job_for(&self, segment_id: SegmentId) -> Option<&Job> {
        self.jobs.iter().find(|j| j.segment_id == segment_id)
    }
}

/// Raw progress notification from the export service
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportProgress {
    pub percent: Option<f64>,
    pub out_time: Option<f64>,
}

/// Relayed progress of the running job
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct JobProgress {
    pub job: Option<JobId>,
    pub percent: f64,
}

/// Time and duration as the UI should render them
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayClock {
    pub time: f64,
    pub duration: f64,
}

#[cfg(test)]
mod tests;
