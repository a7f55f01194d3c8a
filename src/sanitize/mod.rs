//! Output sanitizer: turns raw model output into a bare commit message.
//!
//! Cleanup is an ordered list of independent steps. Running the sanitizer on
//! its own output changes nothing.

pub mod emoji;
pub mod rules;

use std::fmt;

use tracing::debug;

use crate::error::GenerationError;
use crate::generation::RawOutput;

/// A cleaned, non-empty commit message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedMessage(String);

impl SanitizedMessage {
    /// Wrap text that is used as-is, e.g. a message supplied for checking.
    pub fn verbatim(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First line of the message.
    pub fn subject(&self) -> &str {
        self.0.lines().next().unwrap_or("")
    }
}

impl fmt::Display for SanitizedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One cleanup step, in application order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanitizeStep {
    SubstituteTable,
    StripPreamble,
    StripEmoji,
    StripFences,
    StripDelimiters,
    TrimWhitespace,
}

impl SanitizeStep {
    pub const ORDER: [SanitizeStep; 6] = [
        SanitizeStep::SubstituteTable,
        SanitizeStep::StripPreamble,
        SanitizeStep::StripEmoji,
        SanitizeStep::StripFences,
        SanitizeStep::StripDelimiters,
        SanitizeStep::TrimWhitespace,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SanitizeStep::SubstituteTable => "substitute-table",
            SanitizeStep::StripPreamble => "strip-preamble",
            SanitizeStep::StripEmoji => "strip-emoji",
            SanitizeStep::StripFences => "strip-fences",
            SanitizeStep::StripDelimiters => "strip-delimiters",
            SanitizeStep::TrimWhitespace => "trim-whitespace",
        }
    }

    fn apply(&self, text: &str, table: &str) -> String {
        match self {
            SanitizeStep::SubstituteTable => rules::substitute_table(text, table),
            SanitizeStep::StripPreamble => rules::strip_preamble(text),
            SanitizeStep::StripEmoji => rules::strip_emoji(text),
            SanitizeStep::StripFences => rules::strip_fences(text),
            SanitizeStep::StripDelimiters => rules::strip_delimiters(text),
            SanitizeStep::TrimWhitespace => rules::trim_whitespace(text),
        }
    }
}

/// Sanitizer bound to the staged-files table of the current run.
#[derive(Debug, Clone, Default)]
pub struct Sanitizer {
    table: String,
}

impl Sanitizer {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }

    /// Apply every step in order.
    pub fn clean(&self, text: &str) -> String {
        SanitizeStep::ORDER
            .iter()
            .fold(text.to_string(), |current, step| {
                let next = step.apply(&current, &self.table);
                if next != current {
                    debug!("Sanitizer step {} changed the message", step.name());
                }
                next
            })
    }

    /// Clean raw model output. Output that is empty after cleanup is a
    /// generation failure attributed to the model that produced it.
    pub fn sanitize(&self, raw: &RawOutput) -> Result<SanitizedMessage, GenerationError> {
        let cleaned = self.clean(&raw.text);
        if cleaned.is_empty() {
            return Err(GenerationError::EmptyAfterCleanup {
                model: raw.model.clone(),
            });
        }
        Ok(SanitizedMessage(cleaned))
    }
}
