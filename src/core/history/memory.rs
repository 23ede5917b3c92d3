//! In-memory history store for testing.

use super::types::{HistoryStore, MoveRecord, StoredHistory};
use crate::error::HistoryError;
use std::sync::Mutex;

/// Keeps records for the life of the process only
#[derive(Default)]
pub struct MemoryHistoryStore {
    state: Mutex<StoredHistory>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut StoredHistory) -> T) -> Result<T, HistoryError> {
        let mut state = self.state.lock().map_err(|_| HistoryError::Poisoned)?;
        Ok(f(&mut state))
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn load(&self) -> Result<StoredHistory, HistoryError> {
        self.with_state(|state| state.clone())
    }

    fn insert(&self, record: &MoveRecord) -> Result<(), HistoryError> {
        self.with_state(|state| state.records.insert(0, record.clone()))
    }

    fn remove(&self, ids: &[String]) -> Result<(), HistoryError> {
        self.with_state(|state| state.records.retain(|r| !ids.contains(&r.id)))
    }

    fn set_can_undo(&self, id: &str, can_undo: bool) -> Result<(), HistoryError> {
        self.with_state(|state| {
            if let Some(record) = state.records.iter_mut().find(|r| r.id == id) {
                record.can_undo = can_undo;
            }
        })
    }

    fn clear(&self) -> Result<(), HistoryError> {
        self.with_state(|state| state.records.clear())
    }

    fn save_lifetime_moved(&self, count: u64) -> Result<(), HistoryError> {
        self.with_state(|state| state.lifetime_moved = count)
    }
}
