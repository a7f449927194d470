//! Utility functions and helpers.

pub mod http;

use std::time::Duration;

/// Share of `done` in `total` as a percentage; zero when `total` is zero.
pub fn percent(done: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        done as f64 / total as f64 * 100.0
    }
}

/// Render a duration as `1m 05.3s` / `4.2s` for log lines.
pub fn format_elapsed(elapsed: Duration) -> String {
    let tenths = (elapsed.as_secs_f64() * 10.0).round() as u64;
    let minutes = tenths / 600;
    let rest = tenths % 600;
    if minutes > 0 {
        format!("{}m {:02}.{}s", minutes, rest / 10, rest % 10)
    } else {
        format!("{}.{}s", rest / 10, rest % 10)
    }
}
