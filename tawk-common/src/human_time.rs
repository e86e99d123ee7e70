//! Human-readable time formatting
//!
//! Clock-style durations for the mini-player and log lines.

/// Below this many seconds a clock is rendered as `M:SS`
const HOUR_SECONDS: u64 = 3600;

/// Format seconds as a playback clock.
///
/// - `M:SS` below one hour
/// - `H:MM:SS` from one hour up
///
/// Negative and non-finite input renders as `0:00`. Fractions are truncated,
/// so a position never reads ahead of the audio.
///
/// # Examples
///
/// ```
/// use tawk_common::human_time::format_clock;
///
/// assert_eq!(format_clock(0.0), "0:00");
/// assert_eq!(format_clock(65.9), "1:05");
/// assert_eq!(format_clock(3725.0), "1:02:05");
/// ```
pub fn format_clock(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };

    if total < HOUR_SECONDS {
        format!("{}:{:02}", total / 60, total % 60)
    } else {
        let hours = total / HOUR_SECONDS;
        let mins = (total % HOUR_SECONDS) / 60;
        let secs = total % 60;
        format!("{}:{:02}:{:02}", hours, mins, secs)
    }
}

/// Format `position / duration` for progress displays, e.g. `0:42 / 3:10`
pub fn format_progress(position_seconds: f64, duration_seconds: f64) -> String {
    format!(
        "{} / {}",
        format_clock(position_seconds),
        format_clock(duration_seconds)
    )
}
