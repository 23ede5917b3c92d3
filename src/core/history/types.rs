//! Types for move history storage.

use crate::error::HistoryError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// A completed move
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub id: String,
    pub original_path: PathBuf,
    pub new_path: PathBuf,
    pub rule_name: String,
    pub timestamp: DateTime<Utc>,
    pub file_size: u64,
    /// Cleared once the move is undone, or when undo could never restore the
    /// original state (overwrite)
    pub can_undo: bool,
}

impl MoveRecord {
    pub fn new(
        original_path: PathBuf,
        new_path: PathBuf,
        rule_name: impl Into<String>,
        file_size: u64,
        can_undo: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            original_path,
            new_path,
            rule_name: rule_name.into(),
            timestamp: Utc::now(),
            file_size,
            can_undo,
        }
    }
}

/// Derived counts; never stored
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryStats {
    /// Records currently in the ledger
    pub total: usize,
    /// Records from the current local calendar day
    pub today: usize,
    /// Records from the current local calendar week (Monday start)
    pub this_week: usize,
    /// Files moved since install, minus undone moves
    pub lifetime_moved: u64,
}

/// What a store hands back on startup
#[derive(Debug, Clone, Default)]
pub struct StoredHistory {
    /// Newest first
    pub records: Vec<MoveRecord>,
    pub lifetime_moved: u64,
}

/// Persistence backend for the ledger
pub trait HistoryStore: Send + Sync {
    fn load(&self) -> Result<StoredHistory, HistoryError>;

    fn insert(&self, record: &MoveRecord) -> Result<(), HistoryError>;

    /// Drop evicted records
    fn remove(&self, ids: &[String]) -> Result<(), HistoryError>;

    fn set_can_undo(&self, id: &str, can_undo: bool) -> Result<(), HistoryError>;

    fn clear(&self) -> Result<(), HistoryError>;

    fn save_lifetime_moved(&self, count: u64) -> Result<(), HistoryError>;
}
