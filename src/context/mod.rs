//! Change context: staged files, their owning modules, and the staged diff.

pub mod assemble;
pub mod collect;
pub mod modules;
pub mod report;

use std::collections::BTreeSet;

pub use assemble::{STAGED_FILES_PLACEHOLDER, assemble_context, render_table};
pub use collect::{collect_staged, staged_diff_text};
pub use modules::ModuleMap;
pub use report::{parse_report, read_diff, read_report};

/// Sentinel rendered for a file no module owns.
pub const NO_MODULE: &str = "NONE";

/// Separator between module names in a multi-module row.
pub const MODULE_SEPARATOR: &str = ", ";

/// A staged file and the modules that own it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub path: String,
    pub owning_modules: BTreeSet<String>,
}

impl StagedFile {
    pub fn new<I, S>(path: impl Into<String>, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let owning_modules = modules
            .into_iter()
            .map(Into::into)
            .map(|m: String| m.trim().to_string())
            .filter(|m| !m.is_empty() && m != NO_MODULE)
            .collect();

        Self {
            path: path.into(),
            owning_modules,
        }
    }

    /// Module column for the staged-files table.
    pub fn modules_label(&self) -> String {
        if self.owning_modules.is_empty() {
            return NO_MODULE.to_string();
        }
        self.owning_modules
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(MODULE_SEPARATOR)
    }
}

/// Everything the pipeline knows about the change being committed.
#[derive(Debug, Clone, Default)]
pub struct ChangeContext {
    pub staged_files: Vec<StagedFile>,
    pub diff_text: String,
}

impl ChangeContext {
    pub fn new(staged_files: Vec<StagedFile>, diff_text: impl Into<String>) -> Self {
        Self {
            staged_files,
            diff_text: diff_text.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.staged_files.is_empty()
    }

    /// Distinct modules touched by the change, `NONE` excluded.
    pub fn affected_modules(&self) -> BTreeSet<&str> {
        self.staged_files
            .iter()
            .flat_map(|f| f.owning_modules.iter().map(String::as_str))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modules_label_joins_with_comma_space() {
        let file = StagedFile::new("src/cli/mod.rs", ["docs", "cli"]);
        assert_eq!(file.modules_label(), "cli, docs");
    }

    #[test]
    fn test_modules_label_unowned_is_sentinel() {
        let file = StagedFile::new("README.md", Vec::<String>::new());
        assert_eq!(file.modules_label(), NO_MODULE);
    }

    #[test]
    fn test_sentinel_and_blank_modules_are_dropped() {
        let file = StagedFile::new("a.rs", ["NONE", " ", "core "]);
        assert_eq!(file.owning_modules.len(), 1);
        assert!(file.owning_modules.contains("core"));
    }

    #[test]
    fn test_affected_modules_are_distinct() {
        let ctx = ChangeContext::new(
            vec![
                StagedFile::new("a.rs", ["core"]),
                StagedFile::new("b.rs", ["core", "cli"]),
                StagedFile::new("c.md", Vec::<String>::new()),
            ],
            "",
        );
        let modules: Vec<_> = ctx.affected_modules().into_iter().collect();
        assert_eq!(modules, vec!["cli", "core"]);
    }
}
