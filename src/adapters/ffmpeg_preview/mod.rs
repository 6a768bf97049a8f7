//! ffmpeg adapter producing web-playable preview proxies

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::domain::errors::*;
use crate::domain::rules::OutputNaming;
use crate::error::{SegcutError, SegcutResult};
use crate::ports::*;

/// Encoder options for the proxy
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewEncoding {
    pub suffix: String,
    pub preset: String,
    pub crf: u8,
}

impl Default for PreviewEncoding {
    fn default() -> Self {
        Self {
            suffix: "_preview".to_string(),
            preset: "ultrafast".to_string(),
            crf: 28,
        }
    }
}

/// Preview service: H.264/AAC MP4 next to the source, fast-start enabled
pub struct FfmpegPreviewAdapter {
    binary: PathBuf,
    encoding: PreviewEncoding,
}

impl FfmpegPreviewAdapter {
    pub fn new(binary: impl Into<PathBuf>, encoding: PreviewEncoding) -> Self {
        Self {
            binary: binary.into(),
            encoding,
        }
    }

    /// Where the proxy for `source` is written
    pub fn output_path(&self, source: &Path) -> PathBuf {
        OutputNaming::preview_path(source, &self.encoding.suffix)
    }

    /// ffmpeg arguments converting `source` into `output`
    pub fn build_args(&self, source: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-hide_banner", "-loglevel", "error", "-y", "-i"]
            .iter()
            .map(OsString::from)
            .collect();
        args.push(source.as_os_str().to_owned());
        args.extend(
            [
                "-c:v".to_string(),
                "libx264".to_string(),
                "-c:a".to_string(),
                "aac".to_string(),
                "-f".to_string(),
                "mp4".to_string(),
                "-movflags".to_string(),
                "faststart".to_string(),
                "-preset".to_string(),
                self.encoding.preset.clone(),
                "-crf".to_string(),
                self.encoding.crf.to_string(),
            ]
            .into_iter()
            .map(OsString::from),
        );
        args.push(output.as_os_str().to_owned());
        args
    }

    async fn run(&self, source: &Path) -> SegcutResult<PathBuf> {
        let output = self.output_path(source);
        let tool = self.binary.display().to_string();
        debug!(source = %source.display(), output = %output.display(), "Running ffmpeg preview conversion");

        let result = Command::new(&self.binary)
            .args(self.build_args(source, &output))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| SegcutError::SpawnError {
                tool: tool.clone(),
                source,
            })?;

        if !result.status.success() {
            return Err(SegcutError::ToolFailed {
                tool,
                status: result.status.to_string(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        info!(output = %output.display(), "Preview proxy ready");
        Ok(output)
    }
}

#[async_trait]
impl PreviewPort for FfmpegPreviewAdapter {
    async fn convert(&self, source: &Path) -> Result<PathBuf, DomainError> {
        self.run(source)
            .await
            .map_err(|e| DomainError::PreviewFailed(e.to_string()))
    }
}
