//! Compiled rule checks.

use regex_lite::Regex;

use crate::contract::definition::{RuleDefinition, RuleKind, Severity};
use crate::contract::report::Violation;
use crate::error::ContractError;

/// A rule ready to run against a message.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub id: String,
    pub severity: Severity,
    pub description: String,
    check: Check,
}

#[derive(Debug, Clone)]
enum Check {
    SubjectFormat(Regex),
    SubjectMaxLength(usize),
    SubjectTrailingPunctuation(Vec<char>),
    SubjectLowercaseDescription,
    BlankLineAfterSubject,
    BodyRequired,
    BodyMaxLineLength {
        max: usize,
        ignore_prefixes: Vec<String>,
    },
    NoTrailingWhitespace,
    ForbiddenPattern(Regex),
}

impl CompiledRule {
    pub fn compile(rule: &RuleDefinition) -> Result<Self, ContractError> {
        if rule.id.trim().is_empty() {
            return Err(invalid(rule, "rule id must not be empty"));
        }

        let check = match &rule.check {
            RuleKind::SubjectFormat { types } => Check::SubjectFormat(subject_regex(rule, types)?),
            RuleKind::SubjectMaxLength { max } => {
                if *max == 0 {
                    return Err(invalid(rule, "max must be greater than zero"));
                }
                Check::SubjectMaxLength(*max)
            }
            RuleKind::SubjectTrailingPunctuation { characters } => {
                if characters.is_empty() {
                    return Err(invalid(rule, "characters must not be empty"));
                }
                Check::SubjectTrailingPunctuation(characters.chars().collect())
            }
            RuleKind::SubjectLowercaseDescription => Check::SubjectLowercaseDescription,
            RuleKind::BlankLineAfterSubject => Check::BlankLineAfterSubject,
            RuleKind::BodyRequired => Check::BodyRequired,
            RuleKind::BodyMaxLineLength {
                max,
                ignore_prefixes,
            } => {
                if *max == 0 {
                    return Err(invalid(rule, "max must be greater than zero"));
                }
                Check::BodyMaxLineLength {
                    max: *max,
                    ignore_prefixes: ignore_prefixes.clone(),
                }
            }
            RuleKind::NoTrailingWhitespace => Check::NoTrailingWhitespace,
            RuleKind::ForbiddenPattern {
                pattern,
                case_insensitive,
            } => {
                let source = if *case_insensitive {
                    format!("(?i){}", pattern)
                } else {
                    pattern.clone()
                };
                let re = Regex::new(&source).map_err(|e| ContractError::InvalidPattern {
                    rule: rule.id.clone(),
                    reason: e.to_string(),
                })?;
                Check::ForbiddenPattern(re)
            }
        };

        Ok(Self {
            id: rule.id.clone(),
            severity: rule.severity,
            description: rule.description.clone(),
            check,
        })
    }

    /// Run the check; `None` when the message satisfies the rule.
    pub fn check(&self, message: &str) -> Option<Violation> {
        let detail = self.detail(message)?;
        let description = match detail {
            Some(detail) => format!("{} ({})", self.description, detail),
            None => self.description.clone(),
        };
        Some(Violation {
            rule_id: self.id.clone(),
            severity: self.severity,
            description,
        })
    }

    /// `None`: passed. `Some(None)`: failed. `Some(Some(d))`: failed, with detail.
    fn detail(&self, message: &str) -> Option<Option<String>> {
        let mut lines = message.lines();
        let subject = lines.next().unwrap_or("");
        let body: Vec<&str> = lines.collect();

        match &self.check {
            Check::SubjectFormat(re) => (!re.is_match(subject)).then_some(None),
            Check::SubjectMaxLength(max) => {
                let len = subject.chars().count();
                (len > *max).then(|| Some(format!("{} characters", len)))
            }
            Check::SubjectTrailingPunctuation(chars) => subject
                .trim_end()
                .chars()
                .last()
                .filter(|c| chars.contains(c))
                .map(|c| Some(format!("ends with '{}'", c))),
            Check::SubjectLowercaseDescription => {
                let (_, description) = subject.split_once(": ")?;
                description
                    .chars()
                    .next()
                    .filter(|c| c.is_uppercase())
                    .map(|_| None)
            }
            Check::BlankLineAfterSubject => body
                .first()
                .filter(|line| !line.trim().is_empty())
                .map(|_| None),
            Check::BodyRequired => body.iter().all(|line| line.trim().is_empty()).then_some(None),
            Check::BodyMaxLineLength {
                max,
                ignore_prefixes,
            } => {
                let long: Vec<usize> = body
                    .iter()
                    .enumerate()
                    .filter(|(_, line)| {
                        line.chars().count() > *max
                            && !ignore_prefixes.iter().any(|p| line.starts_with(p.as_str()))
                    })
                    // 1-based, counting the subject
                    .map(|(i, _)| i + 2)
                    .collect();
                (!long.is_empty()).then(|| Some(describe_lines(&long)))
            }
            Check::NoTrailingWhitespace => {
                let lines: Vec<usize> = message
                    .lines()
                    .enumerate()
                    .filter(|(_, line)| line.len() != line.trim_end().len())
                    .map(|(i, _)| i + 1)
                    .collect();
                (!lines.is_empty()).then(|| Some(describe_lines(&lines)))
            }
            Check::ForbiddenPattern(re) => re
                .find(message)
                .map(|m| Some(format!("found '{}'", m.as_str().trim()))),
        }
    }
}

fn invalid(rule: &RuleDefinition, reason: &str) -> ContractError {
    ContractError::InvalidRule {
        rule: rule.id.clone(),
        reason: reason.to_string(),
    }
}

fn subject_regex(rule: &RuleDefinition, types: &[String]) -> Result<Regex, ContractError> {
    let type_pattern = if types.is_empty() {
        "[a-z]+".to_string()
    } else {
        if types.iter().any(|t| t.trim().is_empty()) {
            return Err(invalid(rule, "types must not contain empty entries"));
        }
        let alternatives: Vec<String> = types.iter().map(|t| regex_lite::escape(t.trim())).collect();
        format!("(?:{})", alternatives.join("|"))
    };

    Regex::new(&format!(r"^{}(?:\([^()\s]+\))?!?: \S", type_pattern)).map_err(|e| {
        ContractError::InvalidPattern {
            rule: rule.id.clone(),
            reason: e.to_string(),
        }
    })
}

fn describe_lines(lines: &[usize]) -> String {
    let numbers: Vec<String> = lines.iter().map(|n| n.to_string()).collect();
    if lines.len() == 1 {
        format!("line {}", numbers[0])
    } else {
        format!("lines {}", numbers.join(", "))
    }
}
