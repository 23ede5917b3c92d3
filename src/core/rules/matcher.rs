//! Rule selection by priority.

use super::evaluator::CompiledCondition;
use super::types::{FileMetadata, SortRule};
use std::cmp::Ordering;

/// An enabled rule with its conditions compiled
#[derive(Debug, Clone)]
struct CompiledRule {
    rule: SortRule,
    conditions: Vec<CompiledCondition>,
}

impl CompiledRule {
    fn matches(&self, file: &FileMetadata) -> bool {
        // Defaults and condition-less rules match everything
        self.rule.is_default || self.conditions.iter().all(|c| c.matches(file))
    }
}

/// The enabled rules in evaluation order.
///
/// Build one per rule edit; matching is then lock-free and allocation-free
/// apart from the extension lookup.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    pub fn new(rules: &[SortRule]) -> Self {
        let mut enabled: Vec<&SortRule> = rules.iter().filter(|r| r.enabled).collect();
        enabled.sort_by(|a, b| evaluation_order(a, b));

        let defaults: Vec<&str> = enabled
            .iter()
            .filter(|r| r.is_default)
            .map(|r| r.id.as_str())
            .collect();
        if defaults.len() > 1 {
            tracing::warn!(
                rule_ids = ?defaults,
                "Multiple default rules are enabled; only {} will ever match",
                defaults[0]
            );
        }

        let rules = enabled
            .into_iter()
            .map(|rule| {
                let conditions: Vec<CompiledCondition> =
                    rule.conditions.iter().map(CompiledCondition::compile).collect();
                if conditions.iter().any(CompiledCondition::is_broken) {
                    tracing::warn!(
                        rule = %rule.name,
                        "Rule has an invalid name pattern and will not match any file"
                    );
                }
                CompiledRule {
                    rule: rule.clone(),
                    conditions,
                }
            })
            .collect();

        Self { rules }
    }

    /// The first rule, in evaluation order, whose conditions all hold
    pub fn match_file(&self, file: &FileMetadata) -> Option<&SortRule> {
        self.rules
            .iter()
            .find(|compiled| compiled.matches(file))
            .map(|compiled| &compiled.rule)
    }

    /// Enabled rules in the order they are evaluated
    pub fn ordered(&self) -> impl Iterator<Item = &SortRule> {
        self.rules.iter().map(|c| &c.rule)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Non-defaults by priority descending then id; defaults last, by id alone
fn evaluation_order(a: &SortRule, b: &SortRule) -> Ordering {
    match (a.is_default, b.is_default) {
        (false, true) => Ordering::Less,
        (true, false) => Ordering::Greater,
        (true, true) => a.id.cmp(&b.id),
        (false, false) => b.priority.cmp(&a.priority).then_with(|| a.id.cmp(&b.id)),
    }
}

/// One-shot match without keeping a compiled rule set around
pub fn match_rule(file: &FileMetadata, rules: &[SortRule]) -> Option<SortRule> {
    RuleSet::new(rules).match_file(file).cloned()
}
