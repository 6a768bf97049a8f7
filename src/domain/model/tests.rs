// Unit tests for domain models

#[cfg(test)]
mod tests {
    use crate::domain::errors::*;
    use crate::domain::model::*;
    use std::path::PathBuf;

    fn ticket(path: &str) -> SessionTicket {
        SessionTicket {
            generation: 1,
            source_path: PathBuf::from(path),
        }
    }

    fn media_info(duration: Option<f64>) -> MediaInfo {
        MediaInfo {
            path: "clip.mp4".to_string(),
            container: "mov,mp4,m4a,3gp,3g2,mj2".to_string(),
            duration,
            bit_rate: None,
            streams: vec![],
            metadata: Default::default(),
        }
    }

    #[test]
    fn test_time_spec_parse_seconds() {
        let time = TimeSpec::parse("123.456").unwrap();
        assert_eq!(time.seconds, 123.456);
    }

    #[test]
    fn test_time_spec_parse_mm_ss() {
        let time = TimeSpec::parse("01:30.5").unwrap();
        assert_eq!(time.seconds, 90.5);
    }

    #[test]
    fn test_time_spec_parse_hh_mm_ss() {
        let time = TimeSpec::parse("01:02:03.5").unwrap();
        assert_eq!(time.seconds, 3723.5);
    }

    #[test]
    fn test_time_spec_parse_invalid() {
        assert!(TimeSpec::parse("invalid").is_err());
        assert!(TimeSpec::parse("00:60").is_err());
        assert!(TimeSpec::parse("01:75:00").is_err());
        assert!(TimeSpec::parse("-10").is_err());
        assert!(TimeSpec::parse("1:2:3:4").is_err());
    }

    #[test]
    fn test_time_spec_display() {
        assert_eq!(TimeSpec::from_seconds(3723.456).to_string(), "01:02:03.456");
        assert_eq!(TimeSpec::from_seconds(123.456).to_string(), "02:03.456");
    }

    #[test]
    fn test_segment_range_validation() {
        assert!(Segment::validate_range(10.0, 20.0).is_ok());
        assert_eq!(
            Segment::validate_range(50.0, 45.0),
            Err(DomainError::InvalidRange {
                start: 50.0,
                end: 45.0
            })
        );
        assert!(Segment::validate_range(5.0, 5.0).is_err());
        assert!(Segment::validate_range(-1.0, 5.0).is_err());
        assert!(Segment::validate_range(0.0, f64::NAN).is_err());
    }

    #[test]
    fn test_session_inspection_duration_wins_over_surface() {
        let mut session = MediaSession::new(&ticket("/videos/clip.mp4"));
        session.set_media_info(media_info(Some(120.0)));

        assert!(!session.apply_surface_duration(119.5));
        assert_eq!(session.duration(), Some(120.0));
        assert_eq!(session.duration_source(), Some(DurationSource::Inspection));
    }

    #[test]
    fn test_session_surface_duration_without_inspection() {
        let mut session = MediaSession::new(&ticket("/videos/clip.mp4"));
        session.set_media_info(media_info(None));

        assert!(session.apply_surface_duration(42.0));
        assert!(session.apply_surface_duration(43.0));
        assert_eq!(session.duration(), Some(43.0));
        assert!(!session.apply_surface_duration(f64::NAN));
    }

    #[test]
    fn test_session_playback_path_follows_preview_state() {
        let mut session = MediaSession::new(&ticket("/videos/clip.avi"));
        assert!(!session.is_playable());

        session.set_preview(PreviewState::Degraded);
        assert_eq!(session.playback_path(), Some(PathBuf::from("/videos/clip.avi").as_path()));
        assert_eq!(session.preview_path(), None);

        session.set_preview(PreviewState::Ready(PathBuf::from("/videos/clip_preview.mp4")));
        assert_eq!(
            session.playback_path(),
            Some(PathBuf::from("/videos/clip_preview.mp4").as_path())
        );
    }

    #[test]
    fn test_resolution_parse() {
        assert_eq!(Resolution::parse("original").unwrap(), None);
        assert_eq!(
            Resolution::parse("1280x720").unwrap(),
            Some(Resolution {
                width: 1280,
                height: 720
            })
        );
        assert!(Resolution::parse("1280").is_err());
        assert!(Resolution::parse("0x720").is_err());
        for (value, _) in Resolution::PRESETS {
            assert!(Resolution::parse(value).is_ok());
        }
    }

    #[test]
    fn test_bitrate_parse() {
        assert_eq!(Bitrate::parse("original").unwrap(), None);
        assert_eq!(Bitrate::parse("4000k").unwrap(), Some(Bitrate { kbps: 4000 }));
        assert_eq!(Bitrate::parse("8M").unwrap(), Some(Bitrate { kbps: 8000 }));
        assert_eq!(Bitrate::parse("1500").unwrap(), Some(Bitrate { kbps: 1500 }));
        assert!(Bitrate::parse("fast").is_err());
        assert!(Bitrate::parse("0k").is_err());
        assert_eq!(Bitrate { kbps: 2000 }.to_string(), "2000k");
    }

    #[test]
    fn test_job_lifecycle() {
        let segment = Segment {
            id: SegmentId(1),
            start_time: 0.0,
            end_time: 5.0,
            name: "Intro".to_string(),
        };
        let mut job = Job::new(JobId(1), &segment, PathBuf::from("/tmp/out.mp4"));
        assert_eq!(job.state, JobState::Pending);

        // A job that never started cannot be cancelled
        assert!(job.transition(JobState::Cancelled).is_err());

        job.transition(JobState::Running).unwrap();
        assert!(job.started_at.is_some());
        job.transition(JobState::Succeeded).unwrap();
        assert!(job.finished_at.is_some());

        // Terminal states are final
        assert!(job.transition(JobState::Running).is_err());
        assert!(job.transition(JobState::Failed("late".into())).is_err());
        assert_eq!(job.state, JobState::Succeeded);
    }

    #[test]
    fn test_batch_report_outcome() {
        let mut report = BatchReport {
            jobs: Vec::new(),
            unattempted: vec![SegmentId(2)],
            failure: None,
            cancelled: true,
        };
        assert_eq!(report.outcome(), Err(DomainError::Cancelled));

        report.cancelled = false;
        report.failure = Some(DomainError::ExportFailed("disk full".into()));
        assert_eq!(
            report.outcome(),
            Err(DomainError::ExportFailed("disk full".into()))
        );

        report.failure = None;
        report.unattempted.clear();
        assert_eq!(report.outcome(), Ok(()));
    }

    #[test]
    fn test_validation_errors_classified() {
        assert!(DomainError::Busy.is_validation());
        assert!(DomainError::NoActiveSession.is_validation());
        assert!(!DomainError::ExportFailed("disk full".into()).is_validation());
        assert!(!DomainError::StaleResult.is_validation());
    }
}
