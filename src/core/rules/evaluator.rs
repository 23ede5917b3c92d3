//! Condition evaluation.

use super::types::{Condition, FileMetadata};
use regex::Regex;
use std::collections::HashSet;

/// A condition prepared for repeated evaluation.
///
/// Extension sets are normalized (lowercase, no leading dot) and regexes are
/// compiled once. A pattern that fails to compile never matches.
#[derive(Debug, Clone)]
pub enum CompiledCondition {
    Extension(HashSet<String>),
    NameContains(String),
    NameRegex(Option<Regex>),
    SizeGreaterThan(u64),
    SizeLessThan(u64),
}

impl CompiledCondition {
    pub fn compile(condition: &Condition) -> Self {
        match condition {
            Condition::Extension(extensions) => Self::Extension(
                extensions
                    .iter()
                    .map(|ext| ext.trim_start_matches('.').to_lowercase())
                    .collect(),
            ),
            Condition::NameContains(needle) => Self::NameContains(needle.clone()),
            Condition::NameRegex(pattern) => Self::NameRegex(Regex::new(pattern).ok()),
            Condition::SizeGreaterThan(n) => Self::SizeGreaterThan(*n),
            Condition::SizeLessThan(n) => Self::SizeLessThan(*n),
        }
    }

    /// True when the pattern of a `NameRegex` failed to compile
    pub fn is_broken(&self) -> bool {
        matches!(self, Self::NameRegex(None))
    }

    pub fn matches(&self, file: &FileMetadata) -> bool {
        match self {
            Self::Extension(set) => set.contains(&file.extension()),
            Self::NameContains(needle) => file.name.contains(needle.as_str()),
            Self::NameRegex(Some(re)) => re.is_match(&file.name),
            Self::NameRegex(None) => false,
            Self::SizeGreaterThan(n) => file.size > *n,
            Self::SizeLessThan(n) => file.size < *n,
        }
    }
}

/// Evaluate one condition against a file.
///
/// Pure: the same inputs always give the same answer.
pub fn evaluate(condition: &Condition, file: &FileMetadata) -> bool {
    CompiledCondition::compile(condition).matches(file)
}
