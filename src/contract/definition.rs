//! Serialized form of a commit-message contract.

use semver::Version;
use serde::Deserialize;

/// Rule severity. Neither level blocks emission of the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    /// Marker printed in front of a violation line.
    pub fn symbol(&self) -> &'static str {
        match self {
            Severity::Error => "✗",
            Severity::Warning => "⚠",
        }
    }
}

/// A versioned rule catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContractDefinition {
    pub version: Version,
    pub rules: Vec<RuleDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RuleDefinition {
    pub id: String,
    pub severity: Severity,
    pub description: String,
    #[serde(flatten)]
    pub check: RuleKind,
}

fn default_trailing_punctuation() -> String {
    ".".to_string()
}

/// What a rule checks, with its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum RuleKind {
    /// `type(scope)!: description`; an empty `types` list accepts any
    /// lowercase type.
    SubjectFormat {
        #[serde(default)]
        types: Vec<String>,
    },
    SubjectMaxLength {
        max: usize,
    },
    SubjectTrailingPunctuation {
        #[serde(default = "default_trailing_punctuation")]
        characters: String,
    },
    SubjectLowercaseDescription,
    BlankLineAfterSubject,
    BodyRequired,
    BodyMaxLineLength {
        max: usize,
        /// Lines starting with one of these are exempt (tables, quoted code).
        #[serde(default)]
        ignore_prefixes: Vec<String>,
    },
    NoTrailingWhitespace,
    ForbiddenPattern {
        pattern: String,
        #[serde(default)]
        case_insensitive: bool,
    },
}
