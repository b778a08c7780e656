//! Formatting functions for command output.
//!
//! Results go to stdout; everything returned here is meant for stderr.

use chrono::Duration;
use colored::Colorize;
use serde_json::Value;

/// What a run cost, for the summary line.
#[derive(Debug, Clone)]
pub(crate) struct RunSummary {
    pub succeeded: bool,
    pub elapsed: Duration,
    /// e.g. "budget 3/20" or "2 iterations"
    pub usage: String,
}

/// Formats a duration for display (e.g., "2m 5s", "340ms").
pub(crate) fn format_duration(duration: &Duration) -> String {
    let total_seconds = duration.num_seconds();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else if seconds > 0 {
        format!("{seconds}s")
    } else {
        format!("{}ms", duration.num_milliseconds())
    }
}

/// Renders a result for stdout: strings raw, anything else as JSON.
pub(crate) fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Formats the one-line run summary.
pub(crate) fn format_summary(summary: &RunSummary) -> String {
    let status = if summary.succeeded {
        format!("{} Done", "✓".green().bold())
    } else {
        format!("{} Failed", "✗".red().bold())
    };
    format!(
        "{status} in {} ({})\n",
        format_duration(&summary.elapsed).cyan(),
        summary.usage.dimmed()
    )
}
