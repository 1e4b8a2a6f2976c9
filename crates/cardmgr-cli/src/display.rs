//! Presentation helpers: colored status lines and key-value tables.
//!
//! Kept deliberately small — the CLI is presentation, not protocol
//! (spec.md §1); it borrows the teacher's section/success/warning idiom
//! rather than inventing a TUI.

use colored::Colorize;
use std::fmt::Display;

/// An underlined section heading.
pub struct SectionTitle(pub &'static str);

impl Display for SectionTitle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "\n{}", self.0.bold().underline())
    }
}

/// Format a section header.
pub fn section(title: &'static str) -> SectionTitle {
    SectionTitle(title)
}

/// Format a success line.
pub fn success(message: &str) -> String {
    format!("{} {}", "OK".green().bold(), message)
}

/// Format a warning line.
pub fn warning(message: &str) -> String {
    format!("{} {}", "WARN".yellow().bold(), message)
}

/// Format an error line.
pub fn error(message: &str) -> String {
    format!("{} {}", "ERROR".red().bold(), message)
}

/// A labeled key/value block, one line per pair.
pub fn key_value_block(title: &str, items: &[(&str, String)]) -> String {
    let mut out = format!("{}", title.bold().underline());
    for (key, value) in items {
        out.push_str(&format!("\n  {}: {}", key.bold(), value));
    }
    out
}

/// Hex-encode bytes for display, upper case, no separators.
pub fn hexdump(bytes: &[u8]) -> String {
    hex::encode_upper(bytes)
}
