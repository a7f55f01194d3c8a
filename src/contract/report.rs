//! Validation results.

use crate::contract::definition::Severity;
use crate::error::ContractError;

/// Rule id of the single entry reported when the contract itself is broken.
pub const CONTRACT_FAULT_RULE: &str = "contract-fault";

/// Version label used when a fault prevents reading the version.
pub const UNKNOWN_VERSION: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub rule_id: String,
    pub severity: Severity,
    pub description: String,
}

/// Advisory outcome of validating one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub contract_version: String,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn new(contract_version: impl Into<String>, violations: Vec<Violation>) -> Self {
        Self {
            contract_version: contract_version.into(),
            violations,
        }
    }

    /// Report standing in for a contract that could not be used.
    pub fn fault(err: &ContractError) -> Self {
        let version = match err {
            ContractError::UnsupportedVersion { found, .. } => found.to_string(),
            _ => UNKNOWN_VERSION.to_string(),
        };
        Self::new(
            version,
            vec![Violation {
                rule_id: CONTRACT_FAULT_RULE.to_string(),
                severity: Severity::Error,
                description: format!("Contract could not be applied: {}", err),
            }],
        )
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Violation> {
        self.with_severity(Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Violation> {
        self.with_severity(Severity::Warning)
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    /// `Contract 1.0.0: 1 error, 2 warnings`
    pub fn summary(&self) -> String {
        format!(
            "Contract {}: {}, {}",
            self.contract_version,
            plural(self.error_count(), "error"),
            plural(self.warning_count(), "warning")
        )
    }

    fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &Violation> {
        self.violations
            .iter()
            .filter(move |v| v.severity == severity)
    }
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("1 {}", noun)
    } else {
        format!("{} {}s", count, noun)
    }
}
