//! Module ownership map loaded from `.scrivener/modules.toml`.
//!
//! ```toml
//! [modules.cli]
//! paths = ["src/cli/", "src/main.rs"]
//!
//! [modules.docs]
//! paths = ["docs/**", "*.md"]
//! ```

use std::collections::BTreeSet;
use std::path::Path;

use regex_lite::Regex;
use tracing::debug;

use crate::error::ConfigError;

/// Default location of the module map, relative to the repository root.
pub const DEFAULT_MODULES_PATH: &str = ".scrivener/modules.toml";

#[derive(Debug, Clone)]
enum PathPattern {
    /// `dir/` matches everything below `dir`.
    Prefix(String),
    Exact(String),
    Glob(Regex),
}

impl PathPattern {
    fn parse(pattern: &str) -> Result<Self, String> {
        let pattern = pattern.trim().trim_start_matches("./");
        if pattern.is_empty() {
            return Err("empty path pattern".to_string());
        }
        if pattern.ends_with('/') {
            return Ok(PathPattern::Prefix(pattern.to_string()));
        }
        if pattern.contains(['*', '?']) {
            let re = Regex::new(&glob_to_regex(pattern)).map_err(|e| e.to_string())?;
            return Ok(PathPattern::Glob(re));
        }
        Ok(PathPattern::Exact(pattern.to_string()))
    }

    fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Prefix(prefix) => path.starts_with(prefix.as_str()),
            PathPattern::Exact(exact) => path == exact,
            PathPattern::Glob(re) => re.is_match(path),
        }
    }
}

/// Translate a path glob into an anchored regex.
///
/// `*` stays within a path segment, `**` crosses segments, `?` is one char.
fn glob_to_regex(glob: &str) -> String {
    let mut re = String::from("^");
    let mut chars = glob.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                if chars.peek() == Some(&'/') {
                    chars.next();
                    re.push_str("(?:.*/)?");
                } else {
                    re.push_str(".*");
                }
            }
            '*' => re.push_str("[^/]*"),
            '?' => re.push_str("[^/]"),
            other => re.push_str(&regex_lite::escape(other.encode_utf8(&mut [0u8; 4]))),
        }
    }

    re.push('$');
    re
}

#[derive(Debug, Clone)]
struct ModuleRule {
    name: String,
    patterns: Vec<PathPattern>,
}

/// Maps repository paths to the modules that own them.
#[derive(Debug, Clone, Default)]
pub struct ModuleMap {
    rules: Vec<ModuleRule>,
}

impl ModuleMap {
    /// A map that owns nothing; every file renders as `NONE`.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load the map from `path`. A missing file yields an empty map.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!("No module map at {}, all files unowned", path.display());
            return Ok(Self::empty());
        }
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content, path)
    }

    /// Parse TOML content. `origin` is only used in error messages.
    pub fn parse(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::ModuleMapInvalid {
            path: origin.to_path_buf(),
            reason,
        };

        let doc = content
            .parse::<toml_edit::DocumentMut>()
            .map_err(|e| invalid(format!("Invalid TOML: {}", e)))?;

        let Some(modules) = doc.get("modules") else {
            return Ok(Self::empty());
        };
        let modules = modules
            .as_table_like()
            .ok_or_else(|| invalid("`modules` must be a table".to_string()))?;

        let mut rules = Vec::new();
        for (name, item) in modules.iter() {
            let paths = item
                .get("paths")
                .and_then(|p| p.as_array())
                .ok_or_else(|| invalid(format!("module '{}' needs a `paths` array", name)))?;

            let mut patterns = Vec::new();
            for value in paths.iter() {
                let raw = value
                    .as_str()
                    .ok_or_else(|| invalid(format!("module '{}' has a non-string path", name)))?;
                let pattern = PathPattern::parse(raw)
                    .map_err(|e| invalid(format!("module '{}': {}", name, e)))?;
                patterns.push(pattern);
            }

            rules.push(ModuleRule {
                name: name.to_string(),
                patterns,
            });
        }

        Ok(Self { rules })
    }

    /// Every module with a pattern matching `path`.
    pub fn owners(&self, path: &str) -> BTreeSet<String> {
        self.rules
            .iter()
            .filter(|rule| rule.patterns.iter().any(|p| p.matches(path)))
            .map(|rule| rule.name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
