//! ffprobe adapter for media file inspection
//!
//! Runs `ffprobe -print_format json -show_format -show_streams` and maps the
//! JSON report onto [`MediaInfo`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::error::{SegcutError, SegcutResult};
use crate::ports::*;

#[derive(Debug, Deserialize)]
struct ProbeReport {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    index: usize,
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    sample_rate: Option<String>,
    channels: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    format_name: Option<String>,
    duration: Option<String>,
    bit_rate: Option<String>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

/// Decode an ffprobe JSON report
pub fn parse_probe_output(path: &Path, json: &str) -> SegcutResult<MediaInfo> {
    let report: ProbeReport = serde_json::from_str(json)?;
    let format = report.format;

    let streams = report
        .streams
        .into_iter()
        .map(|s| StreamInfo {
            index: s.index,
            kind: match s.codec_type.as_deref() {
                Some("video") => StreamKind::Video,
                Some("audio") => StreamKind::Audio,
                Some("subtitle") => StreamKind::Subtitle,
                _ => StreamKind::Other,
            },
            codec: s.codec_name.unwrap_or_else(|| "unknown".to_string()),
            width: s.width,
            height: s.height,
            sample_rate: s.sample_rate.and_then(|r| r.parse().ok()),
            channels: s.channels,
        })
        .collect();

    let (container, duration, bit_rate, metadata) = match format {
        Some(f) => (
            f.format_name.unwrap_or_else(|| "unknown".to_string()),
            f.duration
                .and_then(|d| d.parse::<f64>().ok())
                .filter(|d| d.is_finite() && *d > 0.0),
            f.bit_rate.and_then(|b| b.parse().ok()),
            f.tags,
        ),
        None => ("unknown".to_string(), None, None, HashMap::new()),
    };

    Ok(MediaInfo {
        path: path.display().to_string(),
        container,
        duration,
        bit_rate,
        streams,
        metadata,
    })
}

/// Inspection service backed by the ffprobe binary
pub struct FfprobeAdapter {
    binary: PathBuf,
}

impl FfprobeAdapter {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    async fn run(&self, file_path: &Path) -> SegcutResult<MediaInfo> {
        let tool = self.binary.display().to_string();
        let output = Command::new(&self.binary)
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(file_path)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| SegcutError::SpawnError {
                tool: tool.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(SegcutError::ToolFailed {
                tool,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_probe_output(file_path, &String::from_utf8_lossy(&output.stdout))
    }
}

#[async_trait]
impl InspectPort for FfprobeAdapter {
    async fn inspect(&self, file_path: &Path) -> Result<MediaInfo, DomainError> {
        debug!(path = %file_path.display(), binary = %self.binary.display(), "Running ffprobe");
        self.run(file_path)
            .await
            .map_err(|e| DomainError::InspectFailed(e.to_string()))
    }
}
