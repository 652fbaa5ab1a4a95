//! Duration formatting for log lines and simulation reports.

use std::time::Duration;

/// Render a duration compactly, keeping the two most significant units.
///
/// Sub-second durations are shown in milliseconds so short simulation runs
/// do not all print as `0s`.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    match secs {
        0 => format!("{}ms", duration.subsec_millis()),
        1..=59 => format!("{secs}s"),
        60..=3_599 => format!("{}m {}s", secs / 60, secs % 60),
        3_600..=86_399 => format!("{}h {}m", secs / 3_600, (secs % 3_600) / 60),
        _ => format!("{}d {}h", secs / 86_400, (secs % 86_400) / 3_600),
    }
}
