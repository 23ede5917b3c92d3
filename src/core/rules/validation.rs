//! Save-time rule checks.

use super::types::{Condition, SortRule};
use crate::error::ValidationError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Component, Path};

/// Non-fatal problems with a rule set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleWarning {
    /// More than one enabled default rule; only `winner` can ever match
    MultipleDefaults { rule_ids: Vec<String>, winner: String },
}

/// Check a single rule
pub fn validate_rule(rule: &SortRule) -> Result<(), ValidationError> {
    if rule.name.trim().is_empty() {
        return Err(ValidationError::EmptyName {
            rule_id: rule.id.clone(),
        });
    }

    let folder = rule.destination_folder.trim();
    if folder.is_empty() {
        return Err(ValidationError::EmptyDestination {
            rule: rule.name.clone(),
        });
    }

    let escapes = Path::new(folder)
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(ValidationError::DestinationEscapesRoot {
            rule: rule.name.clone(),
            folder: rule.destination_folder.clone(),
        });
    }

    for condition in &rule.conditions {
        match condition {
            Condition::Extension(extensions) if extensions.is_empty() => {
                return Err(ValidationError::EmptyExtensionSet {
                    rule: rule.name.clone(),
                });
            }
            Condition::NameRegex(pattern) => {
                if let Err(e) = Regex::new(pattern) {
                    return Err(ValidationError::InvalidRegex {
                        rule: rule.name.clone(),
                        pattern: pattern.clone(),
                        reason: e.to_string(),
                    });
                }
            }
            _ => {}
        }
    }

    Ok(())
}

/// Check every rule plus id uniqueness
pub fn validate_rules(rules: &[SortRule]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for rule in rules {
        if !seen.insert(rule.id.as_str()) {
            return Err(ValidationError::DuplicateRuleId {
                rule_id: rule.id.clone(),
            });
        }
        validate_rule(rule)?;
    }
    Ok(())
}

pub fn rule_warnings(rules: &[SortRule]) -> Vec<RuleWarning> {
    let mut defaults: Vec<String> = rules
        .iter()
        .filter(|r| r.enabled && r.is_default)
        .map(|r| r.id.clone())
        .collect();

    if defaults.len() < 2 {
        return Vec::new();
    }

    defaults.sort();
    let winner = defaults[0].clone();
    vec![RuleWarning::MultipleDefaults {
        rule_ids: defaults,
        winner,
    }]
}
