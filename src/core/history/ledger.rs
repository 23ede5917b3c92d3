//! The in-memory ledger in front of a history store.

use super::memory::MemoryHistoryStore;
use super::types::{HistoryStats, HistoryStore, MoveRecord};
use crate::core::mover::relocate;
use crate::error::{HistoryError, UndoError};
use chrono::{DateTime, Datelike, Duration, Local};
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Capped, newest-first record of completed moves
pub struct HistoryLedger {
    records: RwLock<VecDeque<MoveRecord>>,
    limit: AtomicUsize,
    lifetime_moved: AtomicU64,
    /// Ids with an undo in flight
    undoing: Mutex<HashSet<String>>,
    store: Box<dyn HistoryStore>,
}

impl HistoryLedger {
    /// Load the ledger from a store, dropping anything past `limit`
    pub fn open(store: Box<dyn HistoryStore>, limit: usize) -> Result<Self, HistoryError> {
        let stored = store.load()?;
        let limit = limit.max(1);

        let mut records: VecDeque<MoveRecord> = stored.records.into();
        let keep = limit.min(records.len());
        let evicted: Vec<String> = records.drain(keep..).map(|r| r.id).collect();
        store.remove(&evicted)?;

        Ok(Self {
            records: RwLock::new(records),
            limit: AtomicUsize::new(limit),
            lifetime_moved: AtomicU64::new(stored.lifetime_moved),
            undoing: Mutex::new(HashSet::new()),
            store,
        })
    }

    /// A ledger that forgets everything on exit
    pub fn in_memory(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            records: RwLock::new(VecDeque::with_capacity(limit)),
            limit: AtomicUsize::new(limit),
            lifetime_moved: AtomicU64::new(0),
            undoing: Mutex::new(HashSet::new()),
            store: Box::new(MemoryHistoryStore::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, VecDeque<MoveRecord>> {
        self.records.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, VecDeque<MoveRecord>> {
        self.records.write().unwrap_or_else(|p| p.into_inner())
    }

    /// Record a completed move, evicting the oldest records past the cap
    ///
    /// The in-memory ledger is always updated; a store failure is returned
    /// so the caller can report it.
    pub fn append(&self, record: MoveRecord) -> Result<(), HistoryError> {
        let mut records = self.write();
        let limit = self.limit.load(Ordering::SeqCst);

        let mut result = self.store.insert(&record);
        records.push_front(record);

        let mut evicted = Vec::new();
        while records.len() > limit {
            if let Some(old) = records.pop_back() {
                evicted.push(old.id);
            }
        }
        if let Err(e) = self.store.remove(&evicted) {
            result = result.and(Err(e));
        }

        let total = self.lifetime_moved.fetch_add(1, Ordering::SeqCst) + 1;
        if let Err(e) = self.store.save_lifetime_moved(total) {
            result = result.and(Err(e));
        }
        result
    }

    /// Most recent first, optionally capped at `limit` records
    pub fn list(&self, limit: Option<usize>) -> Vec<MoveRecord> {
        let records = self.read();
        let take = limit.unwrap_or(records.len());
        records.iter().take(take).cloned().collect()
    }

    pub fn find(&self, id: &str) -> Option<MoveRecord> {
        self.read().iter().find(|r| r.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit.load(Ordering::SeqCst)
    }

    pub fn lifetime_moved(&self) -> u64 {
        self.lifetime_moved.load(Ordering::SeqCst)
    }

    /// Change the cap, evicting immediately if the ledger is now too long
    pub fn set_limit(&self, limit: usize) -> Result<(), HistoryError> {
        let limit = limit.max(1);
        let mut records = self.write();
        self.limit.store(limit, Ordering::SeqCst);

        let keep = limit.min(records.len());
        let evicted: Vec<String> = records.drain(keep..).map(|r| r.id).collect();
        self.store.remove(&evicted)
    }

    pub fn stats(&self) -> HistoryStats {
        self.stats_at(Local::now())
    }

    /// Bucket records by the local calendar day and Monday-start week of `now`
    pub fn stats_at(&self, now: DateTime<Local>) -> HistoryStats {
        let today = now.date_naive();
        let week_start = today - Duration::days(i64::from(now.weekday().num_days_from_monday()));

        let records = self.read();
        let mut stats = HistoryStats {
            total: records.len(),
            lifetime_moved: self.lifetime_moved(),
            ..HistoryStats::default()
        };

        for record in records.iter() {
            let day = record.timestamp.with_timezone(&Local).date_naive();
            if day == today {
                stats.today += 1;
            }
            if day >= week_start && day <= today {
                stats.this_week += 1;
            }
        }

        stats
    }

    /// Move a file back to where it was detected
    ///
    /// Fails without touching the ledger if the record is gone, already
    /// undone, the moved file is missing, or the original spot is taken.
    /// Once the file is back, a store write failure is logged rather than
    /// returned; the in-memory ledger already reflects the undo.
    pub fn undo(&self, id: &str) -> Result<MoveRecord, UndoError> {
        let _guard = UndoGuard::acquire(&self.undoing, id)?;

        let record = self.find(id).ok_or_else(|| UndoError::NotFound { id: id.to_string() })?;
        if !record.can_undo {
            return Err(UndoError::NotUndoable { id: id.to_string() });
        }
        if !record.new_path.exists() {
            return Err(UndoError::SourceMissing {
                path: record.new_path.clone(),
            });
        }
        if record.original_path.exists() {
            return Err(UndoError::DestinationOccupied {
                path: record.original_path.clone(),
            });
        }

        if let Some(parent) = record.original_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| UndoError::Io {
                path: record.original_path.clone(),
                source,
            })?;
        }
        relocate(&record.new_path, &record.original_path).map_err(|source| UndoError::Io {
            path: record.original_path.clone(),
            source,
        })?;

        tracing::info!(
            from = %record.new_path.display(),
            to = %record.original_path.display(),
            "Undid move"
        );

        {
            let mut records = self.write();
            if let Some(entry) = records.iter_mut().find(|r| r.id == id) {
                entry.can_undo = false;
            }
        }
        let remaining = self
            .lifetime_moved
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_sub(1)))
            .unwrap_or(0)
            .saturating_sub(1);

        if let Err(e) = self.store.set_can_undo(id, false) {
            tracing::error!(id, "Failed to persist undo: {}", e);
        }
        if let Err(e) = self.store.save_lifetime_moved(remaining) {
            tracing::error!("Failed to persist lifetime counter: {}", e);
        }

        Ok(MoveRecord {
            can_undo: false,
            ..record
        })
    }

    /// Forget every record; the lifetime counter is kept
    pub fn clear(&self) -> Result<(), HistoryError> {
        let mut records = self.write();
        records.clear();
        self.store.clear()
    }
}

/// Marks an id as being undone for the guard's lifetime
struct UndoGuard<'a> {
    set: &'a Mutex<HashSet<String>>,
    id: String,
}

impl<'a> UndoGuard<'a> {
    fn acquire(set: &'a Mutex<HashSet<String>>, id: &str) -> Result<Self, UndoError> {
        let mut in_flight = set.lock().unwrap_or_else(|p| p.into_inner());
        if !in_flight.insert(id.to_string()) {
            return Err(UndoError::InProgress { id: id.to_string() });
        }
        Ok(Self {
            set,
            id: id.to_string(),
        })
    }
}

impl Drop for UndoGuard<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.set.lock().unwrap_or_else(|p| p.into_inner());
        in_flight.remove(&self.id);
    }
}
