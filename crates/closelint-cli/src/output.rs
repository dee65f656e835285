// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! CLI output styling.
//!
//! Respects NO_COLOR and FORCE_COLOR environment variables.

use colored::{ColoredString, Colorize};

/// Initialize color support based on environment.
/// Call once at startup.
pub fn init() {
    if std::env::var("NO_COLOR").is_ok() {
        colored::control::set_override(false);
    } else if std::env::var("FORCE_COLOR").is_ok() {
        colored::control::set_override(true);
    }
}

pub fn error_label() -> ColoredString {
    "error".red().bold()
}

pub fn banner_ok(phase: &str) -> String {
    format!("{} {} {}", "===".dimmed(), format!("{} OK", phase).green().bold(), "===".dimmed())
}

pub fn banner_fail(phase: &str, count: usize) -> String {
    let msg = if count == 1 {
        format!("{} FAILED: 1 error", phase)
    } else {
        format!("{} FAILED: {} errors", phase, count)
    };
    format!("{} {} {}", "===".dimmed(), msg.red().bold(), "===".dimmed())
}

/// `N warning(s), M error(s)` with each count colored when non-zero.
pub fn summary(files: usize, warnings: usize, errors: usize) -> String {
    let plural = |n: usize, word: &str| if n == 1 { format!("1 {}", word) } else { format!("{} {}s", n, word) };
    let warnings_text = match warnings {
        0 => plural(0, "warning").normal(),
        n => plural(n, "warning").yellow().bold(),
    };
    let errors_text = match errors {
        0 => plural(0, "error").normal(),
        n => plural(n, "error").red().bold(),
    };
    format!("checked {}: {}, {}", plural(files, "file"), warnings_text, errors_text)
}

pub fn title(name: &str) -> ColoredString {
    name.bold()
}

pub fn section_header(header: &str) -> ColoredString {
    header.yellow().bold()
}

pub fn command(name: &str) -> ColoredString {
    name.green()
}

pub fn arg(name: &str) -> ColoredString {
    name.cyan()
}

pub fn code(code: &str) -> ColoredString {
    code.bold()
}
