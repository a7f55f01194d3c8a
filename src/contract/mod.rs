//! Commit-message contract: a versioned rule catalogue and its validator.
//!
//! Validation is advisory. A report never blocks emission, and a broken
//! contract shows up as a single `contract-fault` error instead of failing
//! the run.

pub mod definition;
pub mod report;
pub mod rules;

use std::path::{Path, PathBuf};

use semver::Version;
use tracing::{debug, info, warn};

use crate::error::ContractError;
use crate::sanitize::SanitizedMessage;

pub use definition::{ContractDefinition, RuleDefinition, RuleKind, Severity};
pub use report::{CONTRACT_FAULT_RULE, ValidationReport, Violation};
pub use rules::CompiledRule;

/// Project contract override, relative to the repository root.
pub const DEFAULT_CONTRACT_PATH: &str = ".scrivener/contract.json";

/// Only contracts with this major version are understood.
pub const SUPPORTED_MAJOR: u64 = 1;

/// Contract shipped with the binary.
pub const EMBEDDED_CONTRACT: &str = include_str!("default_contract.json");

/// Where the contract for a run comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractSource {
    /// Project default location; the embedded contract applies when absent.
    Project(PathBuf),
    /// Explicitly requested file; it must exist.
    Explicit(PathBuf),
}

/// A compiled contract.
#[derive(Debug, Clone)]
pub struct Contract {
    version: Version,
    rules: Vec<CompiledRule>,
}

impl Contract {
    /// Parse and compile a contract definition.
    pub fn parse(json: &str) -> Result<Self, ContractError> {
        let definition: ContractDefinition =
            serde_json::from_str(json).map_err(ContractError::Malformed)?;
        Self::compile(definition)
    }

    pub fn compile(definition: ContractDefinition) -> Result<Self, ContractError> {
        if definition.version.major != SUPPORTED_MAJOR {
            return Err(ContractError::UnsupportedVersion {
                found: definition.version,
                supported: SUPPORTED_MAJOR,
            });
        }

        let mut rules = Vec::with_capacity(definition.rules.len());
        for rule in &definition.rules {
            if rules.iter().any(|r: &CompiledRule| r.id == rule.id) {
                return Err(ContractError::InvalidRule {
                    rule: rule.id.clone(),
                    reason: "duplicate rule id".to_string(),
                });
            }
            rules.push(CompiledRule::compile(rule)?);
        }

        Ok(Self {
            version: definition.version,
            rules,
        })
    }

    /// The contract shipped with the binary.
    pub fn embedded() -> Result<Self, ContractError> {
        Self::parse(EMBEDDED_CONTRACT)
    }

    pub fn load(source: &ContractSource) -> Result<Self, ContractError> {
        let path = source.path();
        if matches!(source, ContractSource::Project(_)) && !path.exists() {
            debug!("No contract at {}, using embedded contract", path.display());
            return Self::embedded();
        }

        let json = std::fs::read_to_string(path).map_err(|e| ContractError::Unreadable {
            path: path.to_path_buf(),
            source: e,
        })?;
        let contract = Self::parse(&json)?;
        info!("Using contract {} from {}", contract.version, path.display());
        Ok(contract)
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    /// Check `message` against every rule, in catalogue order.
    pub fn validate(&self, message: &SanitizedMessage) -> ValidationReport {
        let violations: Vec<Violation> = self
            .rules
            .iter()
            .filter_map(|rule| rule.check(message.as_str()))
            .collect();

        let report = ValidationReport::new(self.version.to_string(), violations);
        debug!(
            "Contract {}: {} errors, {} warnings",
            report.contract_version,
            report.error_count(),
            report.warning_count()
        );
        report
    }
}

/// Load the contract and validate `message`. Never fails: contract faults
/// become a `contract-fault` report.
pub fn validate_message(source: &ContractSource, message: &SanitizedMessage) -> ValidationReport {
    match Contract::load(source) {
        Ok(contract) => contract.validate(message),
        Err(e) => {
            warn!("Contract fault: {}", e);
            ValidationReport::fault(&e)
        }
    }
}

impl ContractSource {
    /// File the contract is read from.
    pub fn path(&self) -> &Path {
        match self {
            ContractSource::Project(path) | ContractSource::Explicit(path) => path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(text: &str) -> SanitizedMessage {
        SanitizedMessage::verbatim(text)
    }

    fn ids(report: &ValidationReport) -> Vec<&str> {
        report.violations.iter().map(|v| v.rule_id.as_str()).collect()
    }

    #[test]
    fn test_embedded_contract_compiles() {
        let contract = Contract::embedded().unwrap();
        assert_eq!(contract.version(), &Version::new(1, 0, 0));
        assert!(contract.rules().len() >= 9);
    }

    #[test]
    fn test_clean_message_has_no_violations() {
        let contract = Contract::embedded().unwrap();
        let report = contract.validate(&message(
            "feat(cli): add check mode\n\nValidate a message without generating one.",
        ));
        assert!(report.is_empty(), "unexpected: {:?}", report.violations);
    }

    #[test]
    fn test_bad_message_reports_errors_and_warnings() {
        let contract = Contract::embedded().unwrap();
        let report = contract.validate(&message("Added Stuff.\nno blank line"));
        let ids = ids(&report);
        assert!(ids.contains(&"subject-format"));
        assert!(ids.contains(&"blank-line-after-subject"));
        assert!(ids.contains(&"subject-trailing-punctuation"));
        assert!(report.error_count() >= 2);
    }

    #[test]
    fn test_unresolved_placeholder_is_error() {
        let contract = Contract::embedded().unwrap();
        let report = contract.validate(&message("docs: x\n\n{{STAGED_FILES_TABLE}}"));
        assert!(ids(&report).contains(&"unresolved-placeholder"));
    }

    #[test]
    fn test_long_subject_hits_both_length_rules() {
        let contract = Contract::embedded().unwrap();
        let subject = format!("feat: {}", "a".repeat(70));
        let report = contract.validate(&message(&format!("{}\n\nbody", subject)));
        let ids = ids(&report);
        assert!(ids.contains(&"subject-max-length"));
        assert!(ids.contains(&"subject-recommended-length"));
    }

    #[test]
    fn test_unsupported_major_version() {
        let result = Contract::parse(r#"{"version":"2.0.0","rules":[]}"#);
        assert!(matches!(result, Err(ContractError::UnsupportedVersion { supported: 1, .. })));
    }

    #[test]
    fn test_minor_versions_are_accepted() {
        let contract = Contract::parse(r#"{"version":"1.4.2","rules":[]}"#).unwrap();
        assert_eq!(contract.version().to_string(), "1.4.2");
    }

    #[test]
    fn test_duplicate_rule_ids_rejected() {
        let json = r#"{"version":"1.0.0","rules":[
            {"id":"a","severity":"error","description":"d","check":"body_required"},
            {"id":"a","severity":"warning","description":"d","check":"no_trailing_whitespace"}
        ]}"#;
        assert!(matches!(Contract::parse(json), Err(ContractError::InvalidRule { .. })));
    }

    #[test]
    fn test_missing_project_contract_uses_embedded() {
        let source = ContractSource::Project(PathBuf::from("/nonexistent/contract.json"));
        let contract = Contract::load(&source).unwrap();
        assert_eq!(contract.version(), &Version::new(1, 0, 0));
    }

    #[test]
    fn test_missing_explicit_contract_is_fault() {
        let source = ContractSource::Explicit(PathBuf::from("/nonexistent/contract.json"));
        let report = validate_message(&source, &message("fix: x"));
        assert_eq!(ids(&report), vec![CONTRACT_FAULT_RULE]);
    }

    #[test]
    fn test_malformed_project_contract_is_fault() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("contract.json");
        std::fs::write(&path, "{ not json").unwrap();

        let report = validate_message(&ContractSource::Project(path), &message("fix: x"));
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].severity, Severity::Error);
        assert!(report.violations[0].description.contains("Malformed"));
    }

    #[test]
    fn test_invalid_rule_pattern_is_fault() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("contract.json");
        std::fs::write(
            &path,
            r#"{"version":"1.0.0","rules":[{"id":"p","severity":"warning","description":"d","check":"forbidden_pattern","pattern":"(["}]}"#,
        )
        .unwrap();

        let report = validate_message(&ContractSource::Explicit(path), &message("fix: x"));
        assert_eq!(ids(&report), vec![CONTRACT_FAULT_RULE]);
        assert!(report.violations[0].description.contains("'p'"));
    }

    #[test]
    fn test_project_contract_overrides_embedded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("contract.json");
        std::fs::write(
            &path,
            r#"{"version":"1.1.0","rules":[{"id":"short","severity":"warning","description":"Keep it short","check":"subject_max_length","max":5}]}"#,
        )
        .unwrap();

        let report = validate_message(&ContractSource::Project(path), &message("fix: longer"));
        assert_eq!(report.contract_version, "1.1.0");
        assert_eq!(ids(&report), vec!["short"]);
    }
}
