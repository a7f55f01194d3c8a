//! scrivener - A CLI tool that generates contract-validated commit messages from staged changes.
//!
//! # Overview
//!
//! scrivener reads the staged files and their owning modules, asks the Claude
//! Code CLI for a commit message, strips the chatter models wrap around it,
//! and prints it between fixed delimiters followed by an advisory report
//! against a versioned commit-message contract.

pub mod config;
pub mod context;
pub mod contract;
pub mod error;
pub mod generation;
pub mod logging;
pub mod pipeline;
pub mod protocol;
pub mod sanitize;

// Re-export commonly used types
pub use context::{ChangeContext, StagedFile};
pub use contract::{Contract, ContractSource, Severity, ValidationReport, Violation};
pub use error::{ClaudeError, ConfigError, ContextError, ContractError, GenerationError, PipelineError};
pub use generation::{AgentDefinition, ClaudeGenerator, GenerationRequest, Generator, RawOutput};
pub use pipeline::{Pipeline, RunOutcome};
pub use sanitize::{SanitizedMessage, Sanitizer};
