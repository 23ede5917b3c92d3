//! The settings document.

use crate::core::rules::{default_rules, validate_rules, SortRule};
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// What to do when the destination file already exists
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum ConflictResolution {
    /// Probe `name (1).ext`, `name (2).ext`, ... for a free name
    #[default]
    Rename,
    /// Leave the file where it is
    Skip,
    /// Replace the existing file
    Overwrite,
    /// Defer to an external decision-maker
    Ask,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub watch_folder: PathBuf,
    pub destination_root: PathBuf,
    pub grace_period_seconds: u64,
    pub rules: Vec<SortRule>,
    pub run_on_startup: bool,
    pub minimize_to_tray: bool,
    pub show_notifications: bool,
    pub dark_mode: bool,
    pub conflict_resolution: ConflictResolution,
    pub history_limit: usize,
    /// All-time count of files moved (persisted, not capped by history_limit)
    #[serde(default)]
    pub total_files_moved: u64,
}

impl Default for Config {
    fn default() -> Self {
        let downloads = dirs::download_dir().unwrap_or_else(|| PathBuf::from("."));

        Self {
            watch_folder: downloads.clone(),
            destination_root: downloads,
            grace_period_seconds: 30,
            rules: default_rules(),
            run_on_startup: false,
            minimize_to_tray: true,
            show_notifications: true,
            dark_mode: false,
            conflict_resolution: ConflictResolution::Rename,
            history_limit: 100,
            total_files_moved: 0,
        }
    }
}

/// One week
pub const MAX_GRACE_PERIOD_SECONDS: u64 = 7 * 24 * 60 * 60;

impl Config {
    /// Config rooted at the given folders, keeping every other default
    pub fn with_folders(watch_folder: impl Into<PathBuf>, destination_root: impl Into<PathBuf>) -> Self {
        Self {
            watch_folder: watch_folder.into(),
            destination_root: destination_root.into(),
            ..Self::default()
        }
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_seconds)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.grace_period_seconds > MAX_GRACE_PERIOD_SECONDS {
            return Err(ValidationError::InvalidConfig(format!(
                "Grace period must be at most {} seconds",
                MAX_GRACE_PERIOD_SECONDS
            )));
        }
        if self.history_limit == 0 {
            return Err(ValidationError::InvalidConfig(
                "History limit must be at least 1".to_string(),
            ));
        }
        validate_rules(&self.rules)
    }
}
