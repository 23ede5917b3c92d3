//! Decides which file names are worth sorting.

use std::path::Path;

const ARTIFACT_SUFFIXES: [&str; 4] = [".crdownload", ".part", ".tmp", ".download"];

/// Rejects hidden files and partially downloaded files
#[derive(Debug, Clone)]
pub struct ArtifactFilter {
    /// Suffixes of files still being written, lowercase
    suffixes: Vec<String>,
    /// Whether to include hidden files
    include_hidden: bool,
}

impl ArtifactFilter {
    pub fn new() -> Self {
        Self {
            suffixes: ARTIFACT_SUFFIXES.iter().map(|s| s.to_string()).collect(),
            include_hidden: false,
        }
    }

    /// Include hidden files (starting with .)
    pub fn with_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    /// Also reject names ending in `suffix`
    pub fn with_suffix(mut self, suffix: &str) -> Self {
        self.suffixes.push(suffix.to_lowercase());
        self
    }

    /// Check if a path names a file that can be sorted
    pub fn should_include(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };

        if !self.include_hidden && name.starts_with('.') {
            return false;
        }

        let lower = name.to_lowercase();
        !self.suffixes.iter().any(|suffix| lower.ends_with(suffix.as_str()))
    }
}

impl Default for ArtifactFilter {
    fn default() -> Self {
        Self::new()
    }
}

/// Shorthand for the default filter
pub fn is_candidate(path: &Path) -> bool {
    ArtifactFilter::new().should_include(path)
}
