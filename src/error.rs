//! Error types for scrivener modules using thiserror.

use std::path::PathBuf;

use thiserror::Error;

/// Maximum number of stderr characters carried inside an error.
pub const STDERR_EXCERPT_CHARS: usize = 500;

/// Truncate subprocess stderr to a short, single-allocation excerpt.
pub fn stderr_excerpt(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.chars().count() <= STDERR_EXCERPT_CHARS {
        return trimmed.to_string();
    }
    let mut excerpt: String = trimmed.chars().take(STDERR_EXCERPT_CHARS).collect();
    excerpt.push_str("...");
    excerpt
}

/// Errors from building the change context.
#[derive(Error, Debug)]
pub enum ContextError {
    #[error("No staged changes to describe")]
    NoStagedFiles,

    #[error("Failed to read staged-files report {path}: {source}")]
    ReportUnreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed staged-files report: {0}")]
    ReportMalformed(#[source] serde_json::Error),

    #[error("Failed to read diff file {path}: {source}")]
    DiffUnreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to collect staged diff: {0}")]
    DiffFailed(#[source] git2::Error),

    #[error("Failed to read commit message {path}: {source}")]
    MessageUnreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Commit message to check is empty")]
    EmptyMessage,
}

/// Errors from Claude CLI operations.
#[derive(Error, Debug)]
pub enum ClaudeError {
    #[error("Claude Code CLI not found. Install with: npm install -g @anthropic-ai/claude-code")]
    NotInstalled,

    #[error("Claude Code CLI reported an error: {0}")]
    ExecutionFailed(String),

    #[error("Failed to spawn Claude process: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("Failed to write context to Claude stdin: {0}")]
    StdinFailed(#[source] std::io::Error),

    #[error("Claude process timed out after {0} seconds")]
    Timeout(u64),

    #[error("Claude CLI exited with code {code}: {stderr}")]
    NonZeroExit { code: i32, stderr: String },

    #[error("Claude CLI produced no output")]
    EmptyOutput,
}

impl ClaudeError {
    /// Whether the failure is tied to the model that was requested.
    ///
    /// Launch failures would repeat identically for any model, so they do not
    /// qualify for the fallback attempt.
    pub fn is_model_failure(&self) -> bool {
        match self {
            ClaudeError::ExecutionFailed(_)
            | ClaudeError::Timeout(_)
            | ClaudeError::NonZeroExit { .. }
            | ClaudeError::EmptyOutput => true,
            ClaudeError::NotInstalled | ClaudeError::SpawnFailed(_) | ClaudeError::StdinFailed(_) => {
                false
            }
        }
    }
}

/// Errors from the generation stage (`GenerationFailed`).
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Generation with model '{model}' failed: {source}")]
    ModelFailed {
        model: String,
        #[source]
        source: ClaudeError,
    },

    #[error(
        "Generation failed with both models. '{primary}': {primary_error}. '{fallback}': {fallback_error}"
    )]
    FallbackExhausted {
        primary: String,
        primary_error: ClaudeError,
        fallback: String,
        #[source]
        fallback_error: ClaudeError,
    },

    #[error("Model '{model}' output was empty after cleanup")]
    EmptyAfterCleanup { model: String },
}

/// Errors from loading or compiling a commit-message contract.
#[derive(Error, Debug)]
pub enum ContractError {
    #[error("Failed to read contract {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed contract definition: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("Unsupported contract version {found} (supported: {supported}.x)")]
    UnsupportedVersion { found: semver::Version, supported: u64 },

    #[error("Contract rule '{rule}' has an invalid pattern: {reason}")]
    InvalidPattern { rule: String, reason: String },

    #[error("Contract rule '{rule}' is misconfigured: {reason}")]
    InvalidRule { rule: String, reason: String },
}

/// Errors from project configuration files.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Agent definition {path} has an unterminated front-matter block")]
    UnterminatedFrontMatter { path: PathBuf },

    #[error("Invalid model identifier '{model}': {reason}")]
    InvalidModel { model: String, reason: &'static str },

    #[error("Failed to parse module map {path}: {reason}")]
    ModuleMapInvalid { path: PathBuf, reason: String },
}

/// Fatal pipeline failures.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Empty context: {0}")]
    EmptyContext(#[source] ContextError),

    #[error(transparent)]
    GenerationFailed(#[from] GenerationError),

    #[error("Failed to write output: {0}")]
    Output(#[source] std::io::Error),
}

impl PipelineError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::EmptyContext(_) => 3,
            PipelineError::GenerationFailed(_) => 4,
            PipelineError::Output(_) => 1,
        }
    }
}

impl From<ContextError> for PipelineError {
    fn from(err: ContextError) -> Self {
        PipelineError::EmptyContext(err)
    }
}
