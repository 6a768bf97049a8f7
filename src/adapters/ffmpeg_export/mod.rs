//! ffmpeg adapter cutting one time range out of a source file
//!
//! Progress comes from `-progress pipe:1` on stdout. Cancellation first asks
//! ffmpeg to quit through stdin and kills it once the grace period runs out.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::error::SegcutError;
use crate::ports::*;

/// Lines of stderr kept for the failure reason
const STDERR_TAIL_LINES: usize = 5;

/// Elapsed output time in seconds from one `-progress` line.
/// `out_time_ms` is in microseconds as well, despite its name.
pub fn parse_out_time(line: &str) -> Option<f64> {
    let (key, value) = line.trim().split_once('=')?;
    match key {
        "out_time_us" | "out_time_ms" => value
            .trim()
            .parse::<i64>()
            .ok()
            .map(|us| us as f64 / 1_000_000.0),
        _ => None,
    }
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

/// Export service backed by the ffmpeg binary
pub struct FfmpegExportAdapter {
    binary: PathBuf,
    cancel_grace: Duration,
    current: Mutex<Option<oneshot::Sender<()>>>,
}

impl FfmpegExportAdapter {
    pub fn new(binary: impl Into<PathBuf>, cancel_grace: Duration) -> Self {
        Self {
            binary: binary.into(),
            cancel_grace,
            current: Mutex::new(None),
        }
    }

    fn lock_current(&self) -> MutexGuard<'_, Option<oneshot::Sender<()>>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// ffmpeg arguments for one cut. Seeks on the input side; resolution
    /// and bitrate are only passed when set.
    pub fn build_args(request: &ExportRequest) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-nostats".into(),
            "-y".into(),
            "-ss".into(),
            format!("{:.3}", request.start_time).into(),
            "-i".into(),
            request.source_path.clone().into_os_string(),
            "-t".into(),
            format!("{:.3}", request.duration()).into(),
        ];

        if let Some(resolution) = request.resolution {
            args.push("-vf".into());
            args.push(format!("scale={}:{}", resolution.width, resolution.height).into());
        }
        if let Some(bitrate) = request.bitrate {
            args.push("-b:v".into());
            args.push(bitrate.to_string().into());
        }

        args.push("-progress".into());
        args.push("pipe:1".into());
        args.push(request.output_path.clone().into_os_string());
        args
    }
}

async fn relay_progress(stdout: ChildStdout, progress: mpsc::UnboundedSender<ExportProgress>) {
    let mut lines = BufReader::new(stdout).lines();
    // Keep draining after the receiver is gone so ffmpeg never blocks on a full pipe
    while let Ok(Some(line)) = lines.next_line().await {
        if let Some(out_time) = parse_out_time(&line) {
            let _ = progress.send(ExportProgress {
                percent: None,
                out_time: Some(out_time),
            });
        }
    }
}

async fn collect_stderr(mut stderr: ChildStderr) -> String {
    let mut buf = Vec::new();
    if let Err(e) = stderr.read_to_end(&mut buf).await {
        debug!("Reading ffmpeg stderr stopped early: {}", e);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

async fn request_quit(child: &mut Child, stdin: Option<ChildStdin>, grace: Duration) {
    if let Some(mut stdin) = stdin {
        let _ = stdin.write_all(b"q\n").await;
        let _ = stdin.flush().await;
    }
    if tokio::time::timeout(grace, child.wait()).await.is_err() {
        warn!(grace_ms = grace.as_millis() as u64, "ffmpeg ignored quit request, killing it");
        let _ = child.kill().await;
    }
}

async fn supervise(
    mut child: Child,
    mut cancel: oneshot::Receiver<()>,
    grace: Duration,
    stderr: Option<JoinHandle<String>>,
    outcome: oneshot::Sender<ExportOutcome>,
) {
    let mut stdin = child.stdin.take();

    let result = tokio::select! {
        status = child.wait() => match status {
            Ok(status) if status.success() => ExportOutcome::Succeeded,
            Ok(status) => {
                let tail = match stderr {
                    Some(task) => task.await.map(|s| stderr_tail(&s)).unwrap_or_default(),
                    None => String::new(),
                };
                let reason = if tail.is_empty() {
                    format!("ffmpeg exited with {}", status)
                } else {
                    format!("ffmpeg exited with {}: {}", status, tail)
                };
                ExportOutcome::Failed(reason)
            }
            Err(e) => ExportOutcome::Failed(format!("Failed to wait for ffmpeg: {}", e)),
        },
        Ok(()) = &mut cancel => {
            request_quit(&mut child, stdin.take(), grace).await;
            ExportOutcome::Cancelled
        }
    };

    debug!(outcome = ?result, "ffmpeg finished");
    let _ = outcome.send(result);
}

#[async_trait]
impl ExportPort for FfmpegExportAdapter {
    async fn start(&self, request: &ExportRequest) -> Result<ExportHandle, DomainError> {
        let tool = self.binary.display().to_string();
        let mut child = Command::new(&self.binary)
            .args(Self::build_args(request))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SegcutError::SpawnError { tool, source })
            .map_err(|e| DomainError::ExportFailed(e.to_string()))?;

        info!(
            pid = child.id(),
            output = %request.output_path.display(),
            "ffmpeg export started"
        );

        let (handle, progress_tx, outcome_tx) = ExportHandle::channel();
        let (cancel_tx, cancel_rx) = oneshot::channel();
        *self.lock_current() = Some(cancel_tx);

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(relay_progress(stdout, progress_tx));
        }
        let stderr = child.stderr.take().map(|s| tokio::spawn(collect_stderr(s)));
        tokio::spawn(supervise(child, cancel_rx, self.cancel_grace, stderr, outcome_tx));

        Ok(handle)
    }

    async fn cancel(&self) -> Result<(), DomainError> {
        let pending = self.lock_current().take();
        match pending {
            Some(cancel) => {
                // The receiver is gone when the process already exited
                let _ = cancel.send(());
            }
            None => debug!("No ffmpeg export to cancel"),
        }
        Ok(())
    }
}
