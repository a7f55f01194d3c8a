//! Stdout envelope consumed by commit tooling.
//!
//! ```text
//! <<<COMMIT_MESSAGE_START>>>
//! feat(cli): add check mode
//! <<<COMMIT_MESSAGE_END>>>
//! ✗ Subject must be followed by a blank line
//! ⚠ Subject should stay within 50 characters (58 characters)
//! Contract 1.0.0: 1 error, 1 warning
//! ```
//!
//! With an empty report a single blank line follows the end delimiter.

use std::io::{self, Write};

use crate::contract::{ValidationReport, Violation};
use crate::sanitize::SanitizedMessage;

pub const START_DELIMITER: &str = "<<<COMMIT_MESSAGE_START>>>";
pub const END_DELIMITER: &str = "<<<COMMIT_MESSAGE_END>>>";

/// Remove delimiter text from a message that is otherwise emitted as written.
/// Lines left empty by the removal are dropped.
pub fn strip_echoed_delimiters(text: &str) -> String {
    let has_delimiter = |s: &str| s.contains(START_DELIMITER) || s.contains(END_DELIMITER);
    if !has_delimiter(text) {
        return text.to_string();
    }

    text.lines()
        .filter_map(|line| {
            if !has_delimiter(line) {
                return Some(line.to_string());
            }
            let mut cleaned = line.to_string();
            while has_delimiter(&cleaned) {
                cleaned = cleaned.replace(START_DELIMITER, "").replace(END_DELIMITER, "");
            }
            (!cleaned.trim().is_empty()).then_some(cleaned)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Write the delimited message block and flush it.
pub fn emit_message<W: Write>(out: &mut W, message: &SanitizedMessage) -> io::Result<()> {
    writeln!(out, "{}", START_DELIMITER)?;
    writeln!(out, "{}", message)?;
    writeln!(out, "{}", END_DELIMITER)?;
    out.flush()
}

/// Write the report lines: errors, then warnings, then the summary.
pub fn emit_report<W: Write>(out: &mut W, report: &ValidationReport) -> io::Result<()> {
    if report.is_empty() {
        writeln!(out)?;
        return out.flush();
    }

    for violation in report.errors().chain(report.warnings()) {
        writeln!(out, "{}", render_violation(violation))?;
    }
    writeln!(out, "{}", report.summary())?;
    out.flush()
}

pub fn render_violation(violation: &Violation) -> String {
    format!("{} {}", violation.severity.symbol(), violation.description)
}
