//! Command implementations

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::adapters::headless_surface::HeadlessSurface;
use crate::app::container::AppContainer;
use crate::app::job_orchestrator::JobOrchestrator;
use crate::app::playback_controller::TimeUpdate;
use crate::app::view_coordinator::ViewCoordinator;
use crate::app::workspace::Workspace;
use crate::cli::args::{CutArgs, InspectArgs, PreviewArgs, SegmentArg};
use crate::domain::errors::DomainError;
use crate::domain::model::{BatchReport, Job, JobProgress, JobState, MediaInfo, TimeSpec};
use crate::utils::logging::ProgressReporter;
use crate::utils::time::format_clock;

fn ensure_input(input: &Path) -> Result<()> {
    if !input.exists() {
        bail!("Input file does not exist: {}", input.display());
    }
    Ok(())
}

fn parse_segments(values: &[String]) -> Result<Vec<SegmentArg>> {
    values
        .iter()
        .map(|v| SegmentArg::parse(v).with_context(|| format!("Invalid segment '{}'", v)))
        .collect()
}

/// Execute the inspect command
pub async fn inspect(container: &dyn AppContainer, args: InspectArgs) -> Result<()> {
    ensure_input(&args.input)?;
    info!("Inspecting {}", args.input.display());

    let info = container
        .inspect_port()
        .inspect(&args.input)
        .await
        .with_context(|| format!("Failed to inspect {}", args.input.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        print_media_info(&info);
    }
    Ok(())
}

fn print_media_info(info: &MediaInfo) {
    println!("File:      {}", info.path);
    println!("Container: {}", info.container);
    match info.duration {
        Some(d) => println!(
            "Duration:  {} ({})",
            TimeSpec::from_seconds(d),
            format_clock(d)
        ),
        None => println!("Duration:  unknown"),
    }
    if let Some(bit_rate) = info.bit_rate {
        println!("Bitrate:   {} kb/s", bit_rate / 1000);
    }
    println!("Streams:");
    for stream in &info.streams {
        let detail = match (stream.width, stream.height, stream.sample_rate) {
            (Some(w), Some(h), _) => format!(" {}x{}", w, h),
            (_, _, Some(rate)) => format!(
                " {} Hz, {} ch",
                rate,
                stream.channels.unwrap_or_default()
            ),
            _ => String::new(),
        };
        println!(
            "  #{} {:?} {}{}",
            stream.index, stream.kind, stream.codec, detail
        );
    }
}

/// Execute the cut command
pub async fn cut(container: &dyn AppContainer, args: CutArgs) -> Result<()> {
    ensure_input(&args.input)?;
    let segments = parse_segments(&args.segments)?;

    let mut workspace = container.workspace(Arc::new(HeadlessSurface::new()));
    let ticket = workspace.begin_session(args.input.clone()).await?;
    // Cutting reads the source directly; only inspection is needed
    let inspection = workspace.loader().inspect(&ticket).await;
    workspace.apply_inspection(inspection)?;
    let duration = workspace.session().and_then(|s| s.duration());

    let mut ids = Vec::with_capacity(segments.len());
    for arg in segments {
        let segment = workspace.add_segment(arg.start, arg.end, arg.name)?;
        if let Some(d) = duration.filter(|d| segment.end_time > *d) {
            warn!(
                segment = %segment.name,
                "Segment ends after the end of the media ({})",
                format_clock(d)
            );
        }
        ids.push(segment.id);
    }

    let orchestrator = workspace.orchestrator();
    let interrupt = tokio::spawn(cancel_on_interrupt(Arc::clone(&orchestrator)));
    let progress = tokio::spawn(report_progress(orchestrator.subscribe_progress()));

    let result = match ids.as_slice() {
        [only] => workspace.export_segment(*only).await.map(single_report),
        _ => workspace.export_all().await,
    };

    interrupt.abort();
    progress.abort();
    let report = result?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, &workspace);
    }

    report.outcome()?;
    Ok(())
}

fn single_report(job: Job) -> BatchReport {
    let failure = match &job.state {
        JobState::Failed(reason) => Some(DomainError::ExportFailed(reason.clone())),
        _ => None,
    };
    let cancelled = job.state == JobState::Cancelled;
    BatchReport {
        jobs: vec![job],
        unattempted: Vec::new(),
        failure,
        cancelled,
    }
}

fn print_report(report: &BatchReport, workspace: &Workspace) {
    for job in &report.jobs {
        println!(
            "{:<10} {} -> {}",
            job.state.to_string(),
            job.segment_name,
            job.output_path.display()
        );
    }
    for id in &report.unattempted {
        let name = workspace
            .segment(*id)
            .map(|s| s.name.as_str())
            .unwrap_or("?");
        println!("{:<10} {}", "skipped", name);
    }
}

async fn cancel_on_interrupt(orchestrator: Arc<JobOrchestrator>) {
    if tokio::signal::ctrl_c().await.is_ok() {
        warn!("Interrupt received, cancelling export");
        if !orchestrator.cancel().await {
            info!("Nothing left to cancel");
        }
    }
}

async fn report_progress(mut progress: watch::Receiver<JobProgress>) {
    let mut reporter = ProgressReporter::new(5.0);
    let mut current = None;
    while progress.changed().await.is_ok() {
        let update = *progress.borrow_and_update();
        let Some(job) = update.job else {
            continue;
        };
        if current != Some(job) {
            if current.is_some() {
                reporter.complete_operation("finished");
            }
            current = Some(job);
            reporter.start_operation(format!("export job {}", job.0));
        }
        reporter.update_progress(update.percent);
    }
}

/// Execute the preview command
pub async fn preview(container: &dyn AppContainer, args: PreviewArgs) -> Result<()> {
    ensure_input(&args.input)?;
    let arg = SegmentArg::parse(&args.segment)
        .with_context(|| format!("Invalid segment '{}'", args.segment))?;
    if !(args.speed.is_finite() && args.speed > 0.0) {
        bail!("Speed must be a positive number");
    }

    let surface = Arc::new(HeadlessSurface::new());
    let mut workspace = container.workspace(surface.clone());
    workspace.open(args.input.clone()).await?;
    surface.set_duration(workspace.session().and_then(|s| s.duration()));

    let segment = workspace.add_segment(arg.start, arg.end, arg.name)?;
    workspace.preview_segment(segment.id).await?;
    workspace.play().await?;
    println!(
        "Previewing {} ({} - {})",
        segment.name,
        format_clock(segment.start_time),
        format_clock(segment.end_time)
    );

    let interval = Duration::from_millis(container.config().playback.time_update_interval_ms);
    let step = interval.as_secs_f64() * args.speed;
    let mut ticker = tokio::time::interval(interval);
    let mut loops = 0;

    while loops < args.loops {
        ticker.tick().await;
        let Some(position) = surface.advance(step) else {
            info!("Playback stopped at the end of the media");
            break;
        };

        match workspace.on_time_update(position).await? {
            TimeUpdate::Passed => println!("{}", ViewCoordinator::format(&workspace.clock())),
            TimeUpdate::Looped { reset_to } => {
                loops += 1;
                println!("Segment end reached, rewound to {}", format_clock(reset_to));
                if loops < args.loops {
                    workspace.play().await?;
                }
            }
            TimeUpdate::Detached => break,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::{ScriptedExport, ScriptedExportAdapter, StaticInspectAdapter, StaticPreviewAdapter};
    use crate::adapters::toml_config::AppConfig;
    use crate::app::container::DefaultAppContainer;
    use std::path::PathBuf;

    fn container(export: Arc<ScriptedExportAdapter>) -> DefaultAppContainer {
        let mut config = AppConfig::default();
        config.playback.time_update_interval_ms = 1;
        DefaultAppContainer::with_ports(
            config,
            Arc::new(StaticInspectAdapter::with_duration(60.0)),
            Arc::new(StaticPreviewAdapter::new()),
            export,
        )
        .unwrap()
    }

    fn input() -> tempfile::NamedTempFile {
        tempfile::Builder::new().suffix(".mp4").tempfile().unwrap()
    }

    #[tokio::test]
    async fn test_cut_batch() {
        let export = Arc::new(ScriptedExportAdapter::new());
        let container = container(export.clone());
        let file = input();

        let args = CutArgs {
            input: file.path().to_path_buf(),
            segments: vec!["0-5=Intro Part".to_string(), "5-9".to_string()],
            resolution: None,
            bitrate: None,
            json: true,
        };
        cut(&container, args).await.unwrap();

        let requests = export.requests();
        assert_eq!(requests.len(), 2);
        let stem = file.path().file_stem().unwrap().to_string_lossy().to_string();
        assert_eq!(
            requests[0].output_path.file_name().map(PathBuf::from),
            Some(PathBuf::from(format!("{}_Intro_Part.mp4", stem)))
        );
    }

    #[tokio::test]
    async fn test_cut_failure_is_error() {
        let export = Arc::new(ScriptedExportAdapter::new());
        export.push(ScriptedExport::Fail("Conversion failed!".into()));
        let container = container(export.clone());
        let file = input();

        let args = CutArgs {
            input: file.path().to_path_buf(),
            segments: vec!["0-5".to_string(), "5-9".to_string()],
            resolution: None,
            bitrate: None,
            json: false,
        };
        let err = cut(&container, args).await.unwrap_err();
        assert!(err.to_string().contains("Conversion failed!"));
        assert_eq!(export.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_cut_cancelled_is_error() {
        let export = Arc::new(ScriptedExportAdapter::new());
        export.push(ScriptedExport::Hold);
        let container = container(export.clone());
        let file = input();

        let orchestrator = container.orchestrator();
        let started = export.clone();
        let canceller = tokio::spawn(async move {
            started.wait_for_starts(1).await;
            orchestrator.cancel().await
        });

        let args = CutArgs {
            input: file.path().to_path_buf(),
            segments: vec!["0-5".to_string(), "5-9".to_string()],
            resolution: None,
            bitrate: None,
            json: false,
        };
        let err = cut(&container, args).await.unwrap_err();
        assert!(canceller.await.unwrap());
        assert_eq!(err.downcast_ref::<DomainError>(), Some(&DomainError::Cancelled));
        assert_eq!(export.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_cut_rejects_bad_segment_before_export() {
        let export = Arc::new(ScriptedExportAdapter::new());
        let container = container(export.clone());
        let file = input();

        let args = CutArgs {
            input: file.path().to_path_buf(),
            segments: vec!["0-5".to_string(), "50-45".to_string()],
            resolution: None,
            bitrate: None,
            json: false,
        };
        assert!(cut(&container, args).await.is_err());
        assert!(export.requests().is_empty());
    }

    #[tokio::test]
    async fn test_preview_loops_once() {
        let container = container(Arc::new(ScriptedExportAdapter::new()));
        let file = input();

        let args = PreviewArgs {
            input: file.path().to_path_buf(),
            segment: "1-1.5".to_string(),
            speed: 100.0,
            loops: 2,
        };
        preview(&container, args).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_input() {
        let container = container(Arc::new(ScriptedExportAdapter::new()));
        let args = InspectArgs {
            input: PathBuf::from("/nonexistent/clip.mp4"),
            json: false,
        };
        let err = inspect(&container, args).await.unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
