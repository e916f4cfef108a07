//! Console output primitives.
//!
//! Human-oriented colored text, not intended for machine parsing.
//! Severity prefixes match the shell scripts this tool replaces.

use owo_colors::OwoColorize;

const RULE: &str = "────────────────────────────────────────────────────";

/// Status level for report lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

impl Level {
    pub fn prefix(&self) -> &'static str {
        match self {
            Level::Info => "[INFO]",
            Level::Success => "✓",
            Level::Warning => "[WARNING]",
            Level::Error => "[ERROR]",
        }
    }
}

/// Print a formatted report header.
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold().cyan());
    println!("{}", RULE.cyan());
    println!();
}

/// Print a section header for one check.
pub fn step(title: &str) {
    println!();
    println!("{}", format!("[{}]", title).cyan().bold());
}

/// Print a horizontal separator.
pub fn separator() {
    println!("{}", RULE.cyan());
}

pub fn info(message: &str) {
    println!("{} {}", Level::Info.prefix().blue(), message);
}

pub fn success(message: &str) {
    println!("{} {}", Level::Success.prefix().green(), message);
}

pub fn warning(message: &str) {
    println!("{} {}", Level::Warning.prefix().yellow(), message);
}

pub fn error(message: &str) {
    println!("{} {}", Level::Error.prefix().red(), message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_prefixes() {
        assert_eq!(Level::Success.prefix(), "✓");
        assert!(Level::Warning.prefix().contains("WARNING"));
        assert!(Level::Error.prefix().contains("ERROR"));
    }
}
