// Domain rules - Business logic and policies

use std::path::{Path, PathBuf};

use crate::domain::model::*;

/// Naming rules for export targets
pub struct OutputNaming;

impl OutputNaming {
    /// Replace every whitespace run with a single underscore
    pub fn sanitize_name(name: &str) -> String {
        let mut sanitized = String::with_capacity(name.len());
        let mut in_whitespace = false;
        for ch in name.chars() {
            if ch.is_whitespace() {
                if !in_whitespace {
                    sanitized.push('_');
                }
                in_whitespace = true;
            } else {
                sanitized.push(ch);
                in_whitespace = false;
            }
        }
        sanitized
    }

    /// `<source without extension>_<sanitized name>.<extension>`
    ///
    /// Pure: the same source and segment name always map to the same path,
    /// so re-exporting a segment overwrites its previous output.
    pub fn output_path(source: &Path, segment_name: &str) -> PathBuf {
        let suffix = Self::sanitize_name(segment_name);
        let file_name = match (source.file_stem(), source.extension()) {
            (Some(stem), Some(ext)) => format!(
                "{}_{}.{}",
                stem.to_string_lossy(),
                suffix,
                ext.to_string_lossy()
            ),
            (Some(stem), None) => format!("{}_{}", stem.to_string_lossy(), suffix),
            _ => suffix,
        };
        source.with_file_name(file_name)
    }

    /// Proxy file written next to the source: `<stem><suffix>.mp4`
    pub fn preview_path(source: &Path, suffix: &str) -> PathBuf {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "preview".to_string());
        source.with_file_name(format!("{}{}.mp4", stem, suffix))
    }

    /// Build the export request for one segment of a session
    pub fn export_request(
        session: &MediaSession,
        segment: &Segment,
        settings: &ExportSettings,
    ) -> ExportRequest {
        ExportRequest {
            source_path: session.source_path().to_path_buf(),
            output_path: Self::output_path(session.source_path(), &segment.name),
            start_time: segment.start_time,
            end_time: segment.end_time,
            resolution: settings.resolution,
            bitrate: settings.bitrate,
        }
    }
}

/// Rules for relaying collaborator progress
pub struct ProgressPolicy;

impl ProgressPolicy {
    /// Missing or NaN values become 0, anything else is clamped to [0, 100]
    pub fn clamp_percent(raw: Option<f64>) -> f64 {
        match raw {
            Some(p) if p.is_nan() => 0.0,
            Some(p) => p.clamp(0.0, 100.0),
            None => 0.0,
        }
    }

    /// Percentage from a progress event, deriving it from `out_time` when
    /// the collaborator only reports elapsed output time
    pub fn percent_of(progress: &ExportProgress, total_duration: f64) -> f64 {
        let raw = progress.percent.or_else(|| {
            progress
                .out_time
                .filter(|_| total_duration > 0.0)
                .map(|t| t / total_duration * 100.0)
        });
        Self::clamp_percent(raw)
    }
}

/// Rules deciding whether a source needs a preview proxy
pub struct PreviewPolicy;

impl PreviewPolicy {
    /// Default extensions the playback surface renders natively
    pub const WEB_COMPATIBLE: [&'static str; 2] = ["mp4", "webm"];

    pub fn is_web_compatible(path: &Path, compatible: &[String]) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .map(|ext| compatible.iter().any(|c| c.eq_ignore_ascii_case(&ext)))
            .unwrap_or(false)
    }
}

/// Rules for the default segment name
pub struct SegmentNaming;

impl SegmentNaming {
    /// `Segment N`, N being the 1-based ordinal at creation time
    pub fn default_name(existing: usize) -> String {
        format!("Segment {}", existing + 1)
    }
}
