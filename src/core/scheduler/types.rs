//! Pending file data and its state tag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::RwLock;
use std::time::SystemTime;

use super::timer::CancellationToken;

/// A file waiting out its grace period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingFile {
    /// Stable for the life of the entry, including across renames
    pub id: String,
    pub source_path: PathBuf,
    pub file_name: String,
    /// Relative to the destination root
    pub matched_destination_folder: String,
    pub matched_rule_name: String,
    pub added_at: DateTime<Utc>,
    /// When the timer fires; never before `added_at`
    pub move_at: DateTime<Utc>,
    pub file_size: u64,
}

/// Where an entry is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum PendingState {
    Scheduled = 0,
    Moving = 1,
    Cancelled = 2,
    Moved = 3,
    Failed = 4,
    /// Resolved by the `Skip` policy; the file stayed where it was
    Skipped = 5,
}

impl PendingState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => PendingState::Scheduled,
            1 => PendingState::Moving,
            2 => PendingState::Cancelled,
            3 => PendingState::Moved,
            5 => PendingState::Skipped,
            _ => PendingState::Failed,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PendingState::Cancelled
                | PendingState::Moved
                | PendingState::Failed
                | PendingState::Skipped
        )
    }
}

/// Size and modification time of whatever sits at a path
///
/// Two different files that reuse a name almost never share both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FileStamp {
    len: u64,
    modified: Option<SystemTime>,
}

impl FileStamp {
    pub(crate) fn of(path: &Path) -> Option<Self> {
        let metadata = std::fs::metadata(path).ok()?;
        Some(Self {
            len: metadata.len(),
            modified: metadata.modified().ok(),
        })
    }
}

/// One slot in the pending arena
pub(crate) struct PendingEntry {
    file: RwLock<PendingFile>,
    state: AtomicU8,
    pub(crate) token: CancellationToken,
}

impl PendingEntry {
    pub(crate) fn new(file: PendingFile) -> Self {
        Self {
            file: RwLock::new(file),
            state: AtomicU8::new(PendingState::Scheduled as u8),
            token: CancellationToken::new(),
        }
    }

    pub(crate) fn snapshot(&self) -> PendingFile {
        self.file
            .read()
            .map(|f| f.clone())
            .unwrap_or_else(|p| p.into_inner().clone())
    }

    pub(crate) fn is_at(&self, path: &Path) -> bool {
        self.file
            .read()
            .map(|f| f.source_path == path)
            .unwrap_or_else(|p| p.into_inner().source_path == path)
    }

    pub(crate) fn update(&self, f: impl FnOnce(&mut PendingFile)) {
        let mut file = self.file.write().unwrap_or_else(|p| p.into_inner());
        f(&mut file);
    }

    pub(crate) fn state(&self) -> PendingState {
        PendingState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Atomically move from `from` to `to`; false if another caller got there first
    pub(crate) fn transition(&self, from: PendingState, to: PendingState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Record the final state of an entry already in `Moving`
    pub(crate) fn finish(&self, state: PendingState) {
        self.state.store(state as u8, Ordering::Release);
    }
}
