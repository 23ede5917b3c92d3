//! # Move History Module
//!
//! Records every completed move so it can be listed, counted and undone.
//!
//! ## Features
//! - Capped ring buffer, newest first, oldest evicted past `history_limit`
//! - Persistent storage using SQLite
//! - Today / this week / all-time statistics computed at query time
//! - Undo with a per-record guard against concurrent attempts

mod ledger;
mod memory;
mod repository;
mod types;

pub use ledger::HistoryLedger;
pub use memory::MemoryHistoryStore;
pub use repository::SqliteHistoryStore;
pub use types::{HistoryStats, HistoryStore, MoveRecord, StoredHistory};
