//! Staged-files report reader.
//!
//! The report is produced by an external collector and is a JSON array:
//!
//! ```json
//! [
//!   {"path": "src/cli/mod.rs", "modules": ["cli", "docs"]},
//!   {"path": "README.md", "modules": "NONE"}
//! ]
//! ```
//!
//! `modules` may be a list or an already-joined `"a, b"` string. A missing
//! key, an empty list, or the `NONE` sentinel all mean the file is unowned.

use std::io::Read;

use serde::Deserialize;

use crate::context::StagedFile;
use crate::error::ContextError;

/// Source name that reads from standard input.
pub const STDIN_SOURCE: &str = "-";

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ModuleList {
    List(Vec<String>),
    Joined(String),
}

impl ModuleList {
    fn into_names(self) -> Vec<String> {
        match self {
            ModuleList::List(names) => names,
            ModuleList::Joined(joined) => joined.split(',').map(str::to_string).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReportEntry {
    path: String,
    #[serde(default)]
    modules: Option<ModuleList>,
}

/// Parse a staged-files report.
///
/// Entries with a blank path are skipped. Order is preserved.
pub fn parse_report(json: &str) -> Result<Vec<StagedFile>, ContextError> {
    let entries: Vec<ReportEntry> =
        serde_json::from_str(json).map_err(ContextError::ReportMalformed)?;

    Ok(entries
        .into_iter()
        .filter(|e| !e.path.trim().is_empty())
        .map(|e| {
            let modules = e.modules.map(ModuleList::into_names).unwrap_or_default();
            StagedFile::new(e.path.trim(), modules)
        })
        .collect())
}

/// Read and parse a report from a file path, or stdin when `source` is `-`.
pub fn read_report(source: &str) -> Result<Vec<StagedFile>, ContextError> {
    let content = read_source(source).map_err(|e| ContextError::ReportUnreadable {
        path: source.to_string(),
        source: e,
    })?;
    parse_report(&content)
}

/// Read a unified diff from a file path, or stdin when `source` is `-`.
pub fn read_diff(source: &str) -> Result<String, ContextError> {
    read_source(source).map_err(|e| ContextError::DiffUnreadable {
        path: source.to_string(),
        source: e,
    })
}

/// Read a file, or stdin when `source` is `-`.
pub fn read_source(source: &str) -> std::io::Result<String> {
    if source == STDIN_SOURCE {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read_to_string(source)
    }
}
