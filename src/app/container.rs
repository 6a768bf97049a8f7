use std::sync::Arc;
use std::time::Duration;

use crate::adapters::ffmpeg_export::FfmpegExportAdapter;
use crate::adapters::ffmpeg_preview::{FfmpegPreviewAdapter, PreviewEncoding};
use crate::adapters::ffprobe::FfprobeAdapter;
use crate::adapters::toml_config::AppConfig;
use crate::app::job_orchestrator::JobOrchestrator;
use crate::app::session_loader::SessionLoader;
use crate::app::workspace::Workspace;
use crate::domain::model::ExportSettings;
use crate::error::SegcutResult;
use crate::ports::{ExportPort, InspectPort, PlaybackPort, PreviewPort};

pub trait AppContainer: Send + Sync {
    fn config(&self) -> &AppConfig;
    fn inspect_port(&self) -> Arc<dyn InspectPort>;
    fn orchestrator(&self) -> Arc<JobOrchestrator>;
    fn workspace(&self, surface: Arc<dyn PlaybackPort>) -> Workspace;
}

pub struct DefaultAppContainer {
    config: AppConfig,
    settings: ExportSettings,
    inspect_port: Arc<dyn InspectPort>,
    preview_port: Arc<dyn PreviewPort>,
    orchestrator: Arc<JobOrchestrator>,
}

impl DefaultAppContainer {
    /// Wire the ffmpeg-backed adapters described by `config`
    pub fn new(config: AppConfig) -> SegcutResult<Self> {
        let inspect_port = Arc::new(FfprobeAdapter::new(config.tools.ffprobe.clone()));
        let preview_port = Arc::new(FfmpegPreviewAdapter::new(
            config.tools.ffmpeg.clone(),
            PreviewEncoding {
                suffix: config.preview.suffix.clone(),
                preset: config.preview.preset.clone(),
                crf: config.preview.crf,
            },
        ));
        let export_port = Arc::new(FfmpegExportAdapter::new(
            config.tools.ffmpeg.clone(),
            Duration::from_millis(config.tools.cancel_grace_ms),
        ));

        Self::with_ports(config, inspect_port, preview_port, export_port)
    }

    /// Wire arbitrary adapters, e.g. the scripted ones
    pub fn with_ports(
        config: AppConfig,
        inspect_port: Arc<dyn InspectPort>,
        preview_port: Arc<dyn PreviewPort>,
        export_port: Arc<dyn ExportPort>,
    ) -> SegcutResult<Self> {
        config.validate()?;
        let settings = config.export_settings()?;

        Ok(Self {
            config,
            settings,
            inspect_port,
            preview_port,
            orchestrator: Arc::new(JobOrchestrator::new(export_port)),
        })
    }

    pub fn session_loader(&self) -> SessionLoader {
        SessionLoader::new(
            Arc::clone(&self.inspect_port),
            Arc::clone(&self.preview_port),
            self.config.preview.web_compatible.clone(),
        )
    }
}

impl AppContainer for DefaultAppContainer {
    fn config(&self) -> &AppConfig {
        &self.config
    }

    fn inspect_port(&self) -> Arc<dyn InspectPort> {
        Arc::clone(&self.inspect_port)
    }

    fn orchestrator(&self) -> Arc<JobOrchestrator> {
        Arc::clone(&self.orchestrator)
    }

    /// A workspace sharing this container's orchestrator
    fn workspace(&self, surface: Arc<dyn PlaybackPort>) -> Workspace {
        Workspace::new(
            self.session_loader(),
            surface,
            self.orchestrator(),
            self.settings.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::headless_surface::HeadlessSurface;
    use crate::adapters::mock::{ScriptedExportAdapter, StaticInspectAdapter, StaticPreviewAdapter};

    fn container(config: AppConfig) -> SegcutResult<DefaultAppContainer> {
        DefaultAppContainer::with_ports(
            config,
            Arc::new(StaticInspectAdapter::with_duration(30.0)),
            Arc::new(StaticPreviewAdapter::new()),
            Arc::new(ScriptedExportAdapter::new()),
        )
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = AppConfig::default();
        config.export.bitrate = "fast".to_string();
        assert!(container(config).is_err());
    }

    #[tokio::test]
    async fn test_workspaces_share_orchestrator() {
        let mut config = AppConfig::default();
        config.export.resolution = "640x360".to_string();
        let container = container(config).unwrap();

        let first = container.workspace(Arc::new(HeadlessSurface::new()));
        let second = container.workspace(Arc::new(HeadlessSurface::new()));
        assert!(Arc::ptr_eq(&first.orchestrator(), &second.orchestrator()));
        assert_eq!(
            first.settings().resolution.map(|r| r.to_string()).as_deref(),
            Some("640x360")
        );
    }

    #[test]
    fn test_default_config_builds_ffmpeg_adapters() {
        assert!(DefaultAppContainer::new(AppConfig::default()).is_ok());
    }
}
