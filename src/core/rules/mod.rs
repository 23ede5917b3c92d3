//! # Rules Module
//!
//! Decides where a newly arrived file belongs.
//!
//! ## Pieces
//! - `types` - `Condition`, `SortRule` and the `FileMetadata` they are evaluated against
//! - `evaluator` - Pure predicate evaluation for a single condition
//! - `matcher` - Priority ordering and first-match selection over a rule set
//! - `validation` - Save-time checks for user-edited rules
//! - `defaults` - The built-in rule set shipped on first run
//!
//! ## Example
//! ```rust,ignore
//! use autosort::core::rules::{default_rules, FileMetadata, RuleSet};
//!
//! let rules = RuleSet::new(&default_rules());
//! let file = FileMetadata::new("holiday.JPG", 2_400_000);
//! assert_eq!(rules.match_file(&file).map(|r| r.destination_folder.as_str()), Some("Images"));
//! ```

mod defaults;
mod evaluator;
mod matcher;
mod types;
mod validation;

pub use defaults::default_rules;
pub use evaluator::{evaluate, CompiledCondition};
pub use matcher::{match_rule, RuleSet};
pub use types::{Condition, FileMetadata, SortRule};
pub use validation::{rule_warnings, validate_rule, validate_rules, RuleWarning};
