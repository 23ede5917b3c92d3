//! Rule editing commands.

use super::sorter::AutoSorter;
use crate::core::rules::{match_rule, rule_warnings, validate_rule, FileMetadata, RuleWarning, SortRule};
use crate::error::{AutoSortError, ValidationError};

impl AutoSorter {
    /// Rules in stored order
    pub fn rules(&self) -> Vec<SortRule> {
        self.config().rules
    }

    pub fn add_rule(&self, rule: SortRule) -> Result<(), AutoSortError> {
        validate_rule(&rule)?;
        self.edit_config(|config| {
            if config.rules.iter().any(|r| r.id == rule.id) {
                return Err(ValidationError::DuplicateRuleId { rule_id: rule.id }.into());
            }
            tracing::info!(rule = %rule.name, "Added rule");
            config.rules.push(rule);
            Ok(())
        })
    }

    /// Replace the rule with the same id
    pub fn update_rule(&self, rule: SortRule) -> Result<(), AutoSortError> {
        validate_rule(&rule)?;
        self.edit_config(|config| {
            let slot = config
                .rules
                .iter_mut()
                .find(|r| r.id == rule.id)
                .ok_or_else(|| ValidationError::RuleNotFound {
                    rule_id: rule.id.clone(),
                })?;
            *slot = rule;
            Ok(())
        })
    }

    pub fn delete_rule(&self, id: &str) -> Result<(), AutoSortError> {
        self.edit_config(|config| {
            let before = config.rules.len();
            config.rules.retain(|r| r.id != id);
            if config.rules.len() == before {
                return Err(ValidationError::RuleNotFound {
                    rule_id: id.to_string(),
                }
                .into());
            }
            Ok(())
        })
    }

    /// Give the listed rules descending priorities in the order given
    ///
    /// The first of `n` ids gets priority `n * 10`, the last gets 10. Unknown
    /// ids are skipped; unlisted rules keep their priority.
    pub fn reorder_rules(&self, ids: &[String]) -> Result<(), AutoSortError> {
        self.edit_config(|config| {
            let n = ids.len();
            for (index, id) in ids.iter().enumerate() {
                if let Some(rule) = config.rules.iter_mut().find(|r| &r.id == id) {
                    rule.priority = i32::try_from((n - index) * 10).unwrap_or(i32::MAX);
                }
            }
            config
                .rules
                .sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.id.cmp(&b.id)));
            Ok(())
        })
    }

    /// Destination folder `rules` would send `file_name` to
    ///
    /// The file is assumed to be empty, so size conditions are evaluated
    /// against 0 bytes.
    pub fn test_rule(file_name: &str, rules: &[SortRule]) -> Option<String> {
        match_rule(&FileMetadata::new(file_name, 0), rules).map(|rule| rule.destination_folder)
    }

    /// Problems with the current rules that do not block saving
    pub fn rule_warnings(&self) -> Vec<RuleWarning> {
        rule_warnings(&self.rules())
    }
}
