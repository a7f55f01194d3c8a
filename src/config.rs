//! Environment-level settings and project file locations.
//!
//! Environment variables follow one rule: an invalid value is logged and the
//! default is used, so a typo never aborts a commit.

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::context::modules::DEFAULT_MODULES_PATH;
use crate::contract::{ContractSource, DEFAULT_CONTRACT_PATH};
use crate::generation::agent::DEFAULT_AGENT_PATH;

/// Default timeout for Claude subprocess execution (5 minutes).
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Environment variable to override the default timeout.
pub const TIMEOUT_ENV_VAR: &str = "SCRIVENER_CLAUDE_TIMEOUT";

/// Environment variable naming the Claude CLI executable.
pub const PROGRAM_ENV_VAR: &str = "SCRIVENER_CLAUDE_BIN";

/// Executable used when `SCRIVENER_CLAUDE_BIN` is unset.
pub const DEFAULT_PROGRAM: &str = "claude";

/// Environment variable selecting the authentication mode.
pub const AUTH_MODE_ENV_VAR: &str = "SCRIVENER_AUTH_MODE";

/// Credential withheld from the subprocess in subscription mode.
pub const API_KEY_ENV_VAR: &str = "ANTHROPIC_API_KEY";

/// How the Claude CLI authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    /// Logged-in subscription; an ambient API key must not leak into the child.
    #[default]
    Subscription,
    /// Key-based; the environment is passed through untouched.
    ApiKey,
}

impl AuthMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMode::Subscription => "subscription",
            AuthMode::ApiKey => "api-key",
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "subscription" => Ok(AuthMode::Subscription),
            "api-key" | "api_key" | "apikey" => Ok(AuthMode::ApiKey),
            other => Err(format!("Unknown auth mode: {}", other)),
        }
    }
}

/// Get the configured timeout duration.
///
/// Reads from SCRIVENER_CLAUDE_TIMEOUT environment variable if set,
/// otherwise uses the default of 300 seconds.
pub fn get_timeout() -> Duration {
    match env::var(TIMEOUT_ENV_VAR) {
        Ok(v) if !v.is_empty() => match v.parse::<u64>() {
            Ok(secs) => Duration::from_secs(secs),
            Err(_) => {
                warn!(
                    "Invalid {} value '{}', using default {}s",
                    TIMEOUT_ENV_VAR, v, DEFAULT_TIMEOUT_SECS
                );
                Duration::from_secs(DEFAULT_TIMEOUT_SECS)
            }
        },
        _ => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
    }
}

/// Get the Claude CLI executable name or path.
pub fn get_program() -> String {
    match env::var(PROGRAM_ENV_VAR) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => DEFAULT_PROGRAM.to_string(),
    }
}

/// Get the configured authentication mode (default: subscription).
pub fn get_auth_mode() -> AuthMode {
    match env::var(AUTH_MODE_ENV_VAR) {
        Ok(v) if !v.is_empty() => v.parse().unwrap_or_else(|e| {
            warn!("{} ({}), using {}", e, AUTH_MODE_ENV_VAR, AuthMode::default());
            AuthMode::default()
        }),
        _ => AuthMode::default(),
    }
}

/// Project files consulted by a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    pub agent: PathBuf,
    pub contract: ContractSource,
    pub modules: PathBuf,
}

impl ProjectPaths {
    /// Default locations under `root`, each replaceable by an explicit path.
    pub fn resolve(
        root: &Path,
        agent: Option<PathBuf>,
        contract: Option<PathBuf>,
        modules: Option<PathBuf>,
    ) -> Self {
        Self {
            agent: agent.unwrap_or_else(|| root.join(DEFAULT_AGENT_PATH)),
            contract: match contract {
                Some(path) => ContractSource::Explicit(path),
                None => ContractSource::Project(root.join(DEFAULT_CONTRACT_PATH)),
            },
            modules: modules.unwrap_or_else(|| root.join(DEFAULT_MODULES_PATH)),
        }
    }
}
