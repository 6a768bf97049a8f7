//! Time formatting utilities

/// Format seconds as `m:ss` for the playback clock
pub fn format_clock(seconds: f64) -> String {
    let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
    let minutes = (seconds / 60.0).floor() as u64;
    let secs = (seconds % 60.0).floor() as u64;
    format!("{}:{:02}", minutes, secs)
}

/// Format a progress percentage for status lines
pub fn format_percent(percent: f64) -> String {
    format!("{:>5.1}%", percent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0.0), "0:00");
        assert_eq!(format_clock(9.99), "0:09");
        assert_eq!(format_clock(75.2), "1:15");
        assert_eq!(format_clock(3600.0), "60:00");
        assert_eq!(format_clock(-3.0), "0:00");
        assert_eq!(format_clock(f64::NAN), "0:00");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(42.0), " 42.0%");
        assert_eq!(format_percent(100.0), "100.0%");
    }
}
