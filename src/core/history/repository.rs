//! SQLite-backed history store.

use super::types::{HistoryStore, MoveRecord, StoredHistory};
use crate::error::HistoryError;
use chrono::DateTime;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

const LIFETIME_KEY: &str = "lifetime_moved";

/// Persistent move history
pub struct SqliteHistoryStore {
    conn: Mutex<Connection>,
}

impl SqliteHistoryStore {
    /// Open or create the history database
    pub fn open(path: &Path) -> Result<Self, HistoryError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| HistoryError::OpenFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        }

        let conn = Connection::open(path).map_err(|e| HistoryError::OpenFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        // Enable WAL mode
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(query_failed)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS move_history (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                original_path TEXT NOT NULL,
                new_path TEXT NOT NULL,
                rule_name TEXT NOT NULL,
                moved_at INTEGER NOT NULL,
                file_size INTEGER NOT NULL,
                can_undo INTEGER NOT NULL
            )",
            [],
        )
        .map_err(query_failed)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS history_meta (
                key TEXT PRIMARY KEY,
                value INTEGER NOT NULL
            )",
            [],
        )
        .map_err(query_failed)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, HistoryError> {
        self.conn.lock().map_err(|_| HistoryError::Poisoned)
    }
}

fn query_failed(e: rusqlite::Error) -> HistoryError {
    HistoryError::QueryFailed(e.to_string())
}

impl HistoryStore for SqliteHistoryStore {
    fn load(&self) -> Result<StoredHistory, HistoryError> {
        let conn = self.conn()?;

        let mut stmt = conn
            .prepare(
                "SELECT id, original_path, new_path, rule_name, moved_at, file_size, can_undo
                 FROM move_history
                 ORDER BY seq DESC",
            )
            .map_err(query_failed)?;

        let records: Vec<MoveRecord> = stmt
            .query_map([], |row| {
                let id: String = row.get(0)?;
                let original_path: String = row.get(1)?;
                let new_path: String = row.get(2)?;
                let rule_name: String = row.get(3)?;
                let moved_at: i64 = row.get(4)?;
                let file_size: i64 = row.get(5)?;
                let can_undo: bool = row.get(6)?;

                Ok(MoveRecord {
                    id,
                    original_path: PathBuf::from(original_path),
                    new_path: PathBuf::from(new_path),
                    rule_name,
                    timestamp: DateTime::from_timestamp_millis(moved_at).unwrap_or_default(),
                    file_size: file_size as u64,
                    can_undo,
                })
            })
            .map_err(query_failed)?
            .filter_map(|r| r.ok())
            .collect();

        let lifetime_moved: Option<i64> = conn
            .query_row(
                "SELECT value FROM history_meta WHERE key = ?",
                [LIFETIME_KEY],
                |row| row.get(0),
            )
            .optional()
            .map_err(query_failed)?;

        Ok(StoredHistory {
            records,
            lifetime_moved: lifetime_moved.unwrap_or(0).max(0) as u64,
        })
    }

    fn insert(&self, record: &MoveRecord) -> Result<(), HistoryError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO move_history
             (id, original_path, new_path, rule_name, moved_at, file_size, can_undo)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                record.id,
                record.original_path.to_string_lossy(),
                record.new_path.to_string_lossy(),
                record.rule_name,
                record.timestamp.timestamp_millis(),
                record.file_size as i64,
                record.can_undo,
            ],
        )
        .map_err(query_failed)?;
        Ok(())
    }

    fn remove(&self, ids: &[String]) -> Result<(), HistoryError> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_failed)?;
        for id in ids {
            tx.execute("DELETE FROM move_history WHERE id = ?", [id])
                .map_err(query_failed)?;
        }
        tx.commit().map_err(query_failed)
    }

    fn set_can_undo(&self, id: &str, can_undo: bool) -> Result<(), HistoryError> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE move_history SET can_undo = ? WHERE id = ?",
            params![can_undo, id],
        )
        .map_err(query_failed)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), HistoryError> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM move_history", [])
            .map_err(query_failed)?;
        Ok(())
    }

    fn save_lifetime_moved(&self, count: u64) -> Result<(), HistoryError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO history_meta (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![LIFETIME_KEY, count as i64],
        )
        .map_err(query_failed)?;
        Ok(())
    }
}
