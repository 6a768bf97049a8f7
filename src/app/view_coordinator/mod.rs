// View coordinator - Derives the clock the UI renders

use crate::domain::model::*;
use crate::domain::store::SegmentStore;
use crate::utils::time::format_clock;

/// Single read path for displayed time and duration
pub struct ViewCoordinator;

impl ViewCoordinator {
    /// Segment-relative in `Segment` mode, session-absolute in `Original` mode.
    /// A segment mode whose segment is gone reads as `Original`.
    pub fn display_clock(
        mode: ViewMode,
        store: &SegmentStore,
        session: Option<&MediaSession>,
        surface_time: f64,
    ) -> DisplayClock {
        if let Some(segment) = mode.active_segment().and_then(|id| store.get(id)) {
            return DisplayClock {
                time: surface_time - segment.start_time,
                duration: segment.duration(),
            };
        }

        DisplayClock {
            time: surface_time,
            duration: session.and_then(|s| s.duration()).unwrap_or(0.0),
        }
    }

    /// `m:ss / m:ss`
    pub fn format(clock: &DisplayClock) -> String {
        format!("{} / {}", format_clock(clock.time), format_clock(clock.duration))
    }

    /// Position of a segment on the timeline as (start %, width %) of the session
    pub fn timeline_span(segment: &Segment, session_duration: f64) -> Option<(f64, f64)> {
        if !(session_duration.is_finite() && session_duration > 0.0) {
            return None;
        }
        let start = (segment.start_time / session_duration * 100.0).clamp(0.0, 100.0);
        let width = (segment.duration() / session_duration * 100.0).clamp(0.0, 100.0 - start);
        Some((start, width))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn session(duration: f64) -> MediaSession {
        let mut session = MediaSession::new(&SessionTicket {
            generation: 1,
            source_path: PathBuf::from("/videos/clip.mp4"),
        });
        session.apply_surface_duration(duration);
        session
    }

    #[test]
    fn test_original_mode_is_absolute() {
        let store = SegmentStore::new();
        let session = session(120.0);
        let clock = ViewCoordinator::display_clock(ViewMode::Original, &store, Some(&session), 42.0);
        assert_eq!(clock, DisplayClock { time: 42.0, duration: 120.0 });
    }

    #[test]
    fn test_segment_mode_is_relative() {
        let mut store = SegmentStore::new();
        let segment = store.add(10.0, 20.0, None).unwrap();
        let session = session(120.0);

        let clock = ViewCoordinator::display_clock(
            ViewMode::Segment(segment.id),
            &store,
            Some(&session),
            14.5,
        );
        assert_eq!(clock, DisplayClock { time: 4.5, duration: 10.0 });
    }

    #[test]
    fn test_missing_segment_reads_as_original() {
        let store = SegmentStore::new();
        let clock =
            ViewCoordinator::display_clock(ViewMode::Segment(SegmentId(9)), &store, None, 7.0);
        assert_eq!(clock, DisplayClock { time: 7.0, duration: 0.0 });
    }

    #[test]
    fn test_format() {
        let clock = DisplayClock { time: 65.0, duration: 600.0 };
        assert_eq!(ViewCoordinator::format(&clock), "1:05 / 10:00");
    }

    #[test]
    fn test_timeline_span() {
        let segment = Segment {
            id: SegmentId(1),
            start_time: 30.0,
            end_time: 60.0,
            name: "x".into(),
        };
        assert_eq!(ViewCoordinator::timeline_span(&segment, 120.0), Some((25.0, 25.0)));
        assert_eq!(ViewCoordinator::timeline_span(&segment, 0.0), None);
    }
}
