//! Agent definition: the markdown file whose front matter names the models.
//!
//! ```markdown
//! ---
//! name: commit-message
//! model: opus
//! fallback-model: sonnet
//! ---
//! You write precise commit messages for this repository.
//! ```

use std::path::Path;

use tracing::{debug, warn};

use crate::error::ConfigError;

/// Default location of the agent definition, relative to the repository root.
pub const DEFAULT_AGENT_PATH: &str = ".claude/agents/commit-message.md";

pub const DEFAULT_PRIMARY_MODEL: &str = "sonnet";
pub const DEFAULT_FALLBACK_MODEL: &str = "haiku";

/// Claude Code's "use the caller's model" marker; we have no caller, so it
/// resolves to the default.
const INHERIT_MODEL: &str = "inherit";

const FRONT_MATTER_DELIMITER: &str = "---";

/// Models and instructions for the generation agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentDefinition {
    pub primary_model: String,
    pub fallback_model: String,
    /// Markdown body, appended to the backend's system prompt.
    pub instructions: Option<String>,
}

impl Default for AgentDefinition {
    fn default() -> Self {
        Self {
            primary_model: DEFAULT_PRIMARY_MODEL.to_string(),
            fallback_model: DEFAULT_FALLBACK_MODEL.to_string(),
            instructions: None,
        }
    }
}

impl AgentDefinition {
    /// Load the definition at `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            warn!(
                "No agent definition at {}, using models {} / {}",
                path.display(),
                DEFAULT_PRIMARY_MODEL,
                DEFAULT_FALLBACK_MODEL
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content, path)
    }

    /// Parse a definition. `origin` is only used in error messages.
    pub fn parse(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        let (front_matter, body) = split_front_matter(content, origin)?;

        let mut definition = Self::default();
        for line in front_matter.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = unquote(value.trim());
            if value.is_empty() {
                continue;
            }

            match key.trim() {
                "model" if value != INHERIT_MODEL => {
                    validate_model_id(value)?;
                    definition.primary_model = value.to_string();
                }
                "fallback-model" | "fallback_model" if value != INHERIT_MODEL => {
                    validate_model_id(value)?;
                    definition.fallback_model = value.to_string();
                }
                _ => {}
            }
        }

        let body = body.trim();
        if !body.is_empty() {
            definition.instructions = Some(body.to_string());
        }

        debug!(
            "Agent {}: primary={}, fallback={}",
            origin.display(),
            definition.primary_model,
            definition.fallback_model
        );
        Ok(definition)
    }

    /// Apply command-line model overrides.
    pub fn with_overrides(
        mut self,
        model: Option<String>,
        fallback_model: Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(model) = model {
            validate_model_id(&model)?;
            self.primary_model = model;
        }
        if let Some(fallback) = fallback_model {
            validate_model_id(&fallback)?;
            self.fallback_model = fallback;
        }
        Ok(self)
    }
}

/// Reject identifiers that could be read as flags or split into several args.
pub fn validate_model_id(model: &str) -> Result<(), ConfigError> {
    let reason = if model.is_empty() {
        Some("must not be empty")
    } else if model.starts_with('-') {
        Some("must not start with '-'")
    } else if model.chars().any(char::is_whitespace) {
        Some("must not contain whitespace")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ConfigError::InvalidModel {
            model: model.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Split `---` front matter from the body. No front matter yields an empty one.
fn split_front_matter<'a>(content: &'a str, origin: &Path) -> Result<(&'a str, &'a str), ConfigError> {
    let trimmed = content.trim_start_matches('\u{feff}').trim_start();
    let Some(rest) = trimmed.strip_prefix(FRONT_MATTER_DELIMITER) else {
        return Ok(("", trimmed));
    };
    let Some(rest) = rest.strip_prefix('\n').or_else(|| rest.strip_prefix("\r\n")) else {
        return Ok(("", trimmed));
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == FRONT_MATTER_DELIMITER {
            let front = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Ok((front, body));
        }
        offset += line.len();
    }

    Err(ConfigError::UnterminatedFrontMatter {
        path: origin.to_path_buf(),
    })
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
