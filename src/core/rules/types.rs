//! Types for sorting rules.

use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// A single predicate over a file's name or size.
///
/// Conditions inside one rule are combined with logical AND.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Condition {
    /// Lowercase extensions without a leading dot
    Extension(Vec<String>),
    /// Case-sensitive literal substring of the file name
    NameContains(String),
    /// Regular expression matched anywhere in the file name
    NameRegex(String),
    /// Strictly larger than this many bytes
    SizeGreaterThan(u64),
    /// Strictly smaller than this many bytes
    SizeLessThan(u64),
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Condition::Extension(extensions) => write!(f, "extension in [{}]", extensions.join(", ")),
            Condition::NameContains(text) => write!(f, "name contains \"{}\"", text),
            Condition::NameRegex(pattern) => write!(f, "name matches /{}/", pattern),
            Condition::SizeGreaterThan(bytes) => write!(f, "size > {} bytes", bytes),
            Condition::SizeLessThan(bytes) => write!(f, "size < {} bytes", bytes),
        }
    }
}

/// A user-editable sorting rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortRule {
    pub id: String,
    pub name: String,
    pub enabled: bool,
    /// Higher priorities are evaluated first
    pub priority: i32,
    pub conditions: Vec<Condition>,
    /// Folder relative to the destination root
    pub destination_folder: String,
    /// Matches unconditionally and is always evaluated after every other rule
    pub is_default: bool,
}

impl SortRule {
    /// Create an enabled rule with a fresh id and no conditions
    pub fn new(name: impl Into<String>, destination_folder: impl Into<String>, priority: i32) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            enabled: true,
            priority,
            conditions: Vec::new(),
            destination_folder: destination_folder.into(),
            is_default: false,
        }
    }

    /// Shorthand for a rule matching a set of extensions
    pub fn for_extensions(name: &str, extensions: &[&str], destination: &str, priority: i32) -> Self {
        Self::new(name, destination, priority).with_condition(Condition::Extension(
            extensions.iter().map(|e| e.to_string()).collect(),
        ))
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }
}

/// What the rule engine knows about a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    /// File name without any directory component
    pub name: String,
    /// Size in bytes
    pub size: u64,
}

impl FileMetadata {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }

    /// Read name and size from disk
    ///
    /// Returns `None` for paths without a UTF-8 file name. A file whose
    /// metadata cannot be read (still being written, already gone) is
    /// reported with size 0.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_string();
        let size = path.metadata().map(|m| m.len()).unwrap_or(0);
        Some(Self { name, size })
    }

    /// Text after the last `.`, lowercased; empty when there is none
    pub fn extension(&self) -> String {
        match self.name.rfind('.') {
            Some(idx) => self.name[idx + 1..].to_lowercase(),
            None => String::new(),
        }
    }
}
