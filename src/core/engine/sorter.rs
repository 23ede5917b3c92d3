//! The engine facade.

use super::builder::AutoSorterBuilder;
use crate::core::config::{Config, ConfigStore, JsonConfigStore};
use crate::core::history::{HistoryLedger, HistoryStats, MoveRecord, SqliteHistoryStore};
use crate::core::mover::{MoveExecutor, MoveOutcome};
use crate::core::scheduler::{Detection, PendingFile, PendingScheduler};
use crate::core::watcher::{FolderWatcher, WatchEvent};
use crate::error::{AutoSortError, UndoError};
use crate::events::{Event, EventSender, HistoryEvent, WatcherEvent};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

/// Whether the watcher is running and whether moves are held
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatcherStatus {
    pub is_running: bool,
    pub is_paused: bool,
}

/// Watches one folder and sorts what lands in it
pub struct AutoSorter {
    store: Box<dyn ConfigStore>,
    config: RwLock<Config>,
    /// Held across every load-change-save of the config
    edits: Mutex<()>,
    executor: Arc<MoveExecutor>,
    ledger: Arc<HistoryLedger>,
    scheduler: Arc<PendingScheduler>,
    watcher: Mutex<Option<FolderWatcher>>,
    /// Cleared by the watcher itself if its backend dies
    running: Arc<AtomicBool>,
    events: EventSender,
}

impl AutoSorter {
    pub fn builder() -> AutoSorterBuilder {
        AutoSorterBuilder::new()
    }

    /// Engine backed by `config.json` and `history.db` inside `data_dir`
    pub fn open(data_dir: &Path) -> Result<Self, AutoSortError> {
        Self::open_with_events(data_dir, crate::events::null_sender())
    }

    pub fn open_with_events(data_dir: &Path, events: EventSender) -> Result<Self, AutoSortError> {
        let history = SqliteHistoryStore::open(&data_dir.join("history.db"))?;
        Self::builder()
            .config_store(Box::new(JsonConfigStore::new(data_dir.join("config.json"))))
            .history_store(Box::new(history))
            .events(events)
            .build()
    }

    pub(super) fn assemble(
        store: Box<dyn ConfigStore>,
        config: Config,
        executor: Arc<MoveExecutor>,
        ledger: Arc<HistoryLedger>,
        scheduler: Arc<PendingScheduler>,
        events: EventSender,
    ) -> Self {
        Self {
            store,
            config: RwLock::new(config),
            edits: Mutex::new(()),
            executor,
            ledger,
            scheduler,
            watcher: Mutex::new(None),
            running: Arc::new(AtomicBool::new(false)),
            events,
        }
    }

    /// Current config, with the lifetime counter filled in from history
    pub fn config(&self) -> Config {
        let mut config = self
            .config
            .read()
            .map(|c| c.clone())
            .unwrap_or_else(|p| p.into_inner().clone());
        config.total_files_moved = self.ledger.lifetime_moved();
        config
    }

    /// Validate, persist and apply a new config
    ///
    /// The incoming `total_files_moved` is ignored. A changed watch folder
    /// restarts a running watcher; pending entries keep the grace period and
    /// destination they were scheduled with.
    pub fn save_config(&self, config: Config) -> Result<(), AutoSortError> {
        let _edit = self.edits.lock().unwrap_or_else(|p| p.into_inner());
        self.apply_config(config)
    }

    /// Change the current config in place and save it, with no other edit
    /// in between
    pub(super) fn edit_config<T>(
        &self,
        edit: impl FnOnce(&mut Config) -> Result<T, AutoSortError>,
    ) -> Result<T, AutoSortError> {
        let _edit = self.edits.lock().unwrap_or_else(|p| p.into_inner());
        let mut config = self.config();
        let value = edit(&mut config)?;
        self.apply_config(config)?;
        Ok(value)
    }

    fn apply_config(&self, mut config: Config) -> Result<(), AutoSortError> {
        config.validate()?;
        config.total_files_moved = self.ledger.lifetime_moved();
        self.store.save(&config)?;

        let previous_watch = {
            let mut slot = self.config.write().unwrap_or_else(|p| p.into_inner());
            let previous = slot.watch_folder.clone();
            *slot = config.clone();
            previous
        };

        self.executor.set_destination_root(config.destination_root.clone());
        self.scheduler.set_rules(&config.rules);
        self.scheduler.set_grace_period(config.grace_period());
        self.scheduler.set_conflict_policy(config.conflict_resolution);
        self.ledger.set_limit(config.history_limit)?;

        if previous_watch != config.watch_folder && self.running.load(Ordering::SeqCst) {
            tracing::info!(
                from = %previous_watch.display(),
                to = %config.watch_folder.display(),
                "Watch folder changed, restarting watcher"
            );
            self.stop();
            self.start()?;
        }
        Ok(())
    }

    /// Start watching the configured folder; a no-op if already running
    ///
    /// Starting also clears a pause.
    pub fn start(&self) -> Result<(), AutoSortError> {
        let mut slot = self.watcher.lock().unwrap_or_else(|p| p.into_inner());
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }

        let folder = self.config().watch_folder;
        let scheduler = Arc::clone(&self.scheduler);
        let running = Arc::clone(&self.running);
        let events = self.events.clone();

        let mut watcher = FolderWatcher::new(move |event| match event {
            WatchEvent::Created(path) => {
                if !scheduler.is_paused() {
                    scheduler.detect(&path, Detection::Watch);
                }
            }
            WatchEvent::Renamed { from, to } => {
                if !scheduler.is_paused() || scheduler.is_pending_at(&from) {
                    scheduler.renamed(&from, &to);
                }
            }
            WatchEvent::Removed(path) => scheduler.removed(&path),
            WatchEvent::Error { message, fatal } => {
                if fatal {
                    tracing::error!("Watcher failed: {}", message);
                    running.store(false, Ordering::SeqCst);
                    events.send(Event::Watcher(WatcherEvent::Failed { message }));
                } else {
                    tracing::warn!("Watcher error: {}", message);
                }
            }
        })?;
        watcher.watch(&folder)?;

        *slot = Some(watcher);
        self.running.store(true, Ordering::SeqCst);
        if self.scheduler.is_paused() {
            self.scheduler.resume();
        }

        tracing::info!(path = %folder.display(), "Watching folder");
        self.events
            .send(Event::Watcher(WatcherEvent::Started { path: folder }));
        Ok(())
    }

    /// Stop noticing new files; already scheduled moves still happen
    pub fn stop(&self) {
        let watcher = self
            .watcher
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take();
        let was_running = self.running.swap(false, Ordering::SeqCst);

        if let Some(watcher) = watcher {
            let paths = watcher.watched_paths();
            drop(watcher);
            if was_running {
                for path in paths {
                    tracing::info!(path = %path.display(), "Stopped watching folder");
                    self.events
                        .send(Event::Watcher(WatcherEvent::Stopped { path }));
                }
            }
        }
    }

    /// Ignore new files and hold due moves
    pub fn pause(&self) {
        self.scheduler.pause();
        tracing::info!("Paused");
        self.events.send(Event::Watcher(WatcherEvent::Paused));
    }

    /// Pick up new files again and run every move that came due while paused
    pub fn resume(&self) {
        self.scheduler.resume();
        tracing::info!("Resumed");
        self.events.send(Event::Watcher(WatcherEvent::Resumed));
    }

    pub fn status(&self) -> WatcherStatus {
        WatcherStatus {
            is_running: self.running.load(Ordering::SeqCst),
            is_paused: self.scheduler.is_paused(),
        }
    }

    /// Files waiting to move, soonest first
    pub fn pending(&self) -> Vec<PendingFile> {
        self.scheduler.pending()
    }

    pub fn cancel(&self, id: &str) -> bool {
        self.scheduler.cancel(id)
    }

    pub fn move_now(&self, id: &str) -> Result<MoveOutcome, AutoSortError> {
        Ok(self.scheduler.move_now(id)?)
    }

    /// Schedule files already sitting in the watch folder
    pub fn scan(&self) -> Result<Vec<PendingFile>, AutoSortError> {
        let folder = self.config().watch_folder;
        Ok(self.scheduler.scan(&folder)?)
    }

    /// Every record in the ledger, newest first
    pub fn history(&self) -> Vec<MoveRecord> {
        self.ledger.list(None)
    }

    pub fn recent_history(&self, count: usize) -> Vec<MoveRecord> {
        self.ledger.list(Some(count))
    }

    pub fn stats(&self) -> HistoryStats {
        self.ledger.stats()
    }

    /// Put a moved file back where it came from
    pub fn undo(&self, id: &str) -> Result<MoveRecord, AutoSortError> {
        let original = self
            .ledger
            .find(id)
            .map(|record| record.original_path)
            .ok_or_else(|| UndoError::NotFound { id: id.to_string() })?;

        // Marked first so the watcher never sees the file come back
        let newly_marked = self.scheduler.mark_restored(&original);
        match self.ledger.undo(id) {
            Ok(record) => {
                self.scheduler.confirm_restored(&original);
                self.events.send(Event::History(HistoryEvent::Undone {
                    record_id: record.id.clone(),
                    restored_to: record.original_path.clone(),
                }));
                Ok(record)
            }
            Err(e) => {
                if newly_marked {
                    self.scheduler.forget_restored(&original);
                } else {
                    self.scheduler.confirm_restored(&original);
                }
                Err(e.into())
            }
        }
    }

    pub fn clear_history(&self) -> Result<(), AutoSortError> {
        self.ledger.clear()?;
        tracing::info!("Cleared move history");
        self.events.send(Event::History(HistoryEvent::Cleared));
        Ok(())
    }
}

impl Drop for AutoSorter {
    fn drop(&mut self) {
        self.stop();
    }
}
