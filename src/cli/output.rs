//! Terminal output for CLI commands
//!
//! Every command renders either pretty JSON or colored human text.
//! `colored` drops the styling when NO_COLOR is set or stdout is not
//! a terminal.

use crate::cli::OutputFormat;
use chrono::{DateTime, Utc};

/// Styles shared by all commands
pub mod colors {
    use colored::{ColoredString, Colorize};

    pub fn label(s: &str) -> ColoredString {
        s.bold()
    }

    /// Logical target ids
    pub fn target(s: &str) -> ColoredString {
        s.cyan()
    }

    /// Physical index locations and record identifiers
    pub fn location(s: &str) -> ColoredString {
        s.blue()
    }

    pub fn identifier(s: &str) -> ColoredString {
        s.blue().underline()
    }

    pub fn number(s: &str) -> ColoredString {
        s.yellow()
    }

    pub fn rank(s: &str) -> ColoredString {
        s.green().bold()
    }

    pub fn success(s: &str) -> ColoredString {
        s.green()
    }

    pub fn error(s: &str) -> ColoredString {
        s.red().bold()
    }

    pub fn dim(s: &str) -> ColoredString {
        s.dimmed()
    }
}

/// Index size with a binary unit, e.g. "1.5 KiB"
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut size = bytes as f64 / 1024.0;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{size:.1} {}", UNITS[unit])
}

/// Query time as reported by the search service
pub fn format_millis(ms: u64) -> String {
    match ms {
        0 => "<1ms".to_string(),
        1..=999 => format!("{ms}ms"),
        _ => format!("{:.2}s", ms as f64 / 1000.0),
    }
}

/// Age of a harvest checkpoint, e.g. "3h ago"
pub fn format_age(at: &DateTime<Utc>, now: DateTime<Utc>) -> String {
    let age = now.signed_duration_since(*at);
    if age.num_seconds() < 0 {
        return "in the future".to_string();
    }
    match (age.num_days(), age.num_hours(), age.num_minutes()) {
        (d, _, _) if d > 0 => format!("{d}d ago"),
        (_, h, _) if h > 0 => format!("{h}h ago"),
        (_, _, m) if m > 0 => format!("{m}m ago"),
        _ => "just now".to_string(),
    }
}

/// Print `data` as JSON, or hand it to `human` for text output
pub fn print_output<T: serde::Serialize>(
    data: &T,
    format: OutputFormat,
    human: impl FnOnce(&T),
) -> Result<(), serde_json::Error> {
    match format {
        OutputFormat::Human => human(data),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(data)?),
    }
    Ok(())
}

pub fn print_header(title: &str) {
    println!("{}", colors::label(title));
}

pub fn print_success(message: &str) {
    println!("{}", colors::success(message));
}

pub fn print_warning(message: &str) {
    eprintln!("{} {}", colors::number("warning:"), message);
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", colors::error("error:"), message);
}
