//! The pending set and everything that can happen to an entry in it.

use super::timer::TimerWheel;
use super::types::{FileStamp, PendingEntry, PendingFile, PendingState};
use crate::core::config::{ConflictResolution, MAX_GRACE_PERIOD_SECONDS};
use crate::core::history::HistoryLedger;
use crate::core::mover::{MoveExecutor, MoveOutcome};
use crate::core::rules::{FileMetadata, RuleSet, SortRule};
use crate::core::scanner::{ArtifactFilter, FolderScanner};
use crate::error::{MoveError, ScanError};
use crate::events::{Event, EventSender, MoveEvent, PendingEvent};
use chrono::Utc;
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Where a detection came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    /// A live filesystem event
    Watch,
    /// An on-demand folder scan; files skipped this session are left alone
    Scan,
}

/// Paths with the stamp of the file they were recorded for
///
/// `None` means the file is still arriving (an undo in flight) and the path
/// is held regardless of what is there.
type Marks = Mutex<HashMap<PathBuf, Option<FileStamp>>>;

#[derive(Debug, Clone, Copy)]
struct Settings {
    grace_period: Duration,
    policy: ConflictResolution,
}

/// Owns every file between detection and its move or cancellation
pub struct PendingScheduler {
    entries: RwLock<HashMap<String, Arc<PendingEntry>>>,
    rules: RwLock<Arc<RuleSet>>,
    settings: RwLock<Settings>,
    executor: Arc<MoveExecutor>,
    ledger: Arc<HistoryLedger>,
    events: EventSender,
    filter: ArtifactFilter,
    /// Only changed with `deferred` locked
    paused: AtomicBool,
    /// Timer fires that arrived while paused
    deferred: Mutex<Vec<String>>,
    /// Files the `Skip` policy left in place
    settled: Marks,
    /// Files put back by undo
    restored: Marks,
    timers: TimerWheel,
}

impl PendingScheduler {
    /// Create a scheduler with no rules, a 30 second grace period and the
    /// `Rename` conflict policy
    pub fn new(
        executor: Arc<MoveExecutor>,
        ledger: Arc<HistoryLedger>,
        events: EventSender,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Self>| {
            let weak = weak.clone();
            let timers = TimerWheel::start(move |id| {
                if let Some(scheduler) = weak.upgrade() {
                    rayon::spawn(move || {
                        scheduler.fire(&id);
                    });
                }
            });

            Self {
                entries: RwLock::new(HashMap::new()),
                rules: RwLock::new(Arc::new(RuleSet::new(&[]))),
                settings: RwLock::new(Settings {
                    grace_period: Duration::from_secs(30),
                    policy: ConflictResolution::Rename,
                }),
                executor,
                ledger,
                events,
                filter: ArtifactFilter::new(),
                paused: AtomicBool::new(false),
                deferred: Mutex::new(Vec::new()),
                settled: Mutex::new(HashMap::new()),
                restored: Mutex::new(HashMap::new()),
                timers,
            }
        })
    }

    fn read_entries(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<PendingEntry>>> {
        self.entries.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write_entries(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<PendingEntry>>> {
        self.entries.write().unwrap_or_else(|p| p.into_inner())
    }

    fn settings(&self) -> Settings {
        *self.settings.read().unwrap_or_else(|p| p.into_inner())
    }

    fn rule_set(&self) -> Arc<RuleSet> {
        self.rules.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    fn entry(&self, id: &str) -> Option<Arc<PendingEntry>> {
        self.read_entries().get(id).cloned()
    }

    fn entry_at(&self, path: &Path) -> Option<(String, Arc<PendingEntry>)> {
        self.read_entries()
            .iter()
            .find(|(_, entry)| entry.is_at(path))
            .map(|(id, entry)| (id.clone(), entry.clone()))
    }

    /// Whether `path` still holds the file it was marked for
    ///
    /// A mark whose file has been replaced or deleted is dropped.
    fn is_marked(marks: &Marks, path: &Path) -> bool {
        let mut marks = marks.lock().unwrap_or_else(|p| p.into_inner());
        let recorded = match marks.get(path) {
            None => return false,
            Some(None) => return true,
            Some(Some(stamp)) => *stamp,
        };
        if FileStamp::of(path) == Some(recorded) {
            return true;
        }
        marks.remove(path);
        false
    }

    /// Replace the rules used for new detections and renames
    pub fn set_rules(&self, rules: &[SortRule]) {
        let compiled = Arc::new(RuleSet::new(rules));
        *self.rules.write().unwrap_or_else(|p| p.into_inner()) = compiled;
    }

    /// Applies to entries created from now on
    pub fn set_grace_period(&self, grace_period: Duration) {
        let grace_period = grace_period.min(Duration::from_secs(MAX_GRACE_PERIOD_SECONDS));
        self.settings
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .grace_period = grace_period;
    }

    /// Applies to every move that starts from now on
    pub fn set_conflict_policy(&self, policy: ConflictResolution) {
        self.settings.write().unwrap_or_else(|p| p.into_inner()).policy = policy;
    }

    /// Match a file and schedule it if a rule claims it
    ///
    /// Returns `None` when the file is filtered out, already pending, or no
    /// rule matches. Unmatched files stay where they are. A file restored by
    /// undo is ignored until something else takes its place.
    pub fn detect(&self, path: &Path, origin: Detection) -> Option<PendingFile> {
        if !self.filter.should_include(path) || !path.is_file() {
            return None;
        }
        if Self::is_marked(&self.restored, path) {
            tracing::debug!(path = %path.display(), "Ignoring file restored by undo");
            return None;
        }
        if origin == Detection::Scan && Self::is_marked(&self.settled, path) {
            return None;
        }

        let metadata = FileMetadata::from_path(path)?;
        let rules = self.rule_set();
        let Some(rule) = rules.match_file(&metadata) else {
            tracing::debug!(file = %metadata.name, "No rule matched, leaving file in place");
            return None;
        };

        let settings = self.settings();
        let added_at = Utc::now();
        let grace = chrono::Duration::from_std(settings.grace_period)
            .unwrap_or_else(|_| chrono::Duration::zero());
        let file = PendingFile {
            id: Uuid::new_v4().to_string(),
            source_path: path.to_path_buf(),
            file_name: metadata.name,
            matched_destination_folder: rule.destination_folder.clone(),
            matched_rule_name: rule.name.clone(),
            added_at,
            move_at: added_at + grace,
            file_size: metadata.size,
        };

        let entry = Arc::new(PendingEntry::new(file.clone()));
        {
            let mut entries = self.write_entries();
            if entries.values().any(|e| e.is_at(path)) {
                return None;
            }
            entries.insert(file.id.clone(), entry.clone());
        }

        self.timers.arm(
            file.id.clone(),
            Instant::now() + settings.grace_period,
            entry.token.clone(),
        );

        tracing::info!(
            file = %file.file_name,
            rule = %file.matched_rule_name,
            move_at = %file.move_at,
            "Scheduled move"
        );
        self.events
            .send(Event::Pending(PendingEvent::Scheduled(file.clone())));
        Some(file)
    }

    /// Schedule every unhandled file directly inside `folder`
    ///
    /// Returns only the entries this call created.
    pub fn scan(&self, folder: &Path) -> Result<Vec<PendingFile>, ScanError> {
        let result = FolderScanner::with_filter(self.filter.clone()).scan(folder)?;

        let mut created: Vec<PendingFile> = result
            .files
            .par_iter()
            .filter_map(|path| self.detect(path, Detection::Scan))
            .collect();
        created.sort_by(|a, b| a.file_name.cmp(&b.file_name));

        tracing::info!(
            folder = %folder.display(),
            found = result.files.len(),
            scheduled = created.len(),
            "Scan complete"
        );
        Ok(created)
    }

    /// Take an entry out of `Scheduled` without moving it
    fn retire(&self, id: &str, entry: &PendingEntry) -> bool {
        if !entry.transition(PendingState::Scheduled, PendingState::Cancelled) {
            return false;
        }
        entry.token.cancel();
        self.write_entries().remove(id);
        true
    }

    /// Cancel a scheduled move
    ///
    /// Returns false if the id is unknown or the entry already left
    /// `Scheduled` (moving, moved, or cancelled).
    pub fn cancel(&self, id: &str) -> bool {
        let Some(entry) = self.entry(id) else {
            return false;
        };
        if !self.retire(id, &entry) {
            return false;
        }

        let file = entry.snapshot();
        tracing::info!(file = %file.file_name, "Cancelled pending move");
        self.events.send(Event::Pending(PendingEvent::Cancelled {
            id: file.id,
            file_name: file.file_name,
        }));
        true
    }

    /// Move a scheduled file right away, on the caller's thread
    pub fn move_now(&self, id: &str) -> Result<MoveOutcome, MoveError> {
        let entry = self.entry(id).ok_or_else(|| MoveError::NotFound { id: id.to_string() })?;
        if !entry.transition(PendingState::Scheduled, PendingState::Moving) {
            return Err(MoveError::NotScheduled { id: id.to_string() });
        }
        entry.token.cancel();
        self.run_move(id, &entry)
    }

    /// Timer expiry for `id`; returns whether this call performed the move
    ///
    /// A fire for an entry that was cancelled or moved by hand is a no-op.
    /// While paused the fire is held until [`resume`](Self::resume).
    pub(crate) fn fire(&self, id: &str) -> bool {
        let Some(entry) = self.entry(id) else {
            tracing::debug!(id, "Stale timer fire");
            return false;
        };
        {
            let mut deferred = self.deferred.lock().unwrap_or_else(|p| p.into_inner());
            if self.paused.load(Ordering::SeqCst) {
                deferred.push(id.to_string());
                tracing::debug!(id, "Paused, deferring move");
                return false;
            }
        }
        if !entry.transition(PendingState::Scheduled, PendingState::Moving) {
            tracing::debug!(id, state = ?entry.state(), "Stale timer fire");
            return false;
        }

        let _ = self.run_move(id, &entry);
        true
    }

    fn run_move(&self, id: &str, entry: &PendingEntry) -> Result<MoveOutcome, MoveError> {
        let file = entry.snapshot();
        let policy = self.settings().policy;
        let result = self.executor.execute(&file, policy);
        self.write_entries().remove(id);

        match &result {
            Ok(MoveOutcome::Moved(record)) => {
                entry.finish(PendingState::Moved);
                if let Err(e) = self.ledger.append(record.clone()) {
                    tracing::error!("Failed to persist history record: {}", e);
                }
                self.events.send(Event::Move(MoveEvent::Completed {
                    record: record.clone(),
                }));
            }
            Ok(MoveOutcome::Skipped { destination, .. }) => {
                entry.finish(PendingState::Skipped);
                self.settled
                    .lock()
                    .unwrap_or_else(|p| p.into_inner())
                    .insert(file.source_path.clone(), FileStamp::of(&file.source_path));
                self.events.send(Event::Move(MoveEvent::Skipped {
                    pending_id: file.id.clone(),
                    file_name: file.file_name.clone(),
                    destination: destination.clone(),
                }));
            }
            Err(e) => {
                entry.finish(PendingState::Failed);
                tracing::error!(file = %file.file_name, "Move failed: {}", e);
                self.events.send(Event::Move(MoveEvent::Failed {
                    pending_id: file.id.clone(),
                    file_name: file.file_name.clone(),
                    message: e.to_string(),
                }));
            }
        }

        result
    }

    /// Follow a rename inside the watch folder
    ///
    /// A pending entry keeps its id and is re-matched under the new name; if
    /// nothing matches any more it is cancelled. A rename of a file we were
    /// not tracking (a finished download, say) is treated as a new file.
    pub fn renamed(&self, from: &Path, to: &Path) {
        let Some((id, entry)) = self.entry_at(from) else {
            self.detect(to, Detection::Watch);
            return;
        };
        if entry.state() != PendingState::Scheduled {
            return;
        }

        let matched = if self.filter.should_include(to) {
            FileMetadata::from_path(to).and_then(|metadata| {
                self.rule_set()
                    .match_file(&metadata)
                    .map(|rule| (metadata, rule.destination_folder.clone(), rule.name.clone()))
            })
        } else {
            None
        };

        match matched {
            Some((metadata, folder, rule_name)) => {
                entry.update(|file| {
                    file.source_path = to.to_path_buf();
                    file.file_name = metadata.name;
                    file.file_size = metadata.size;
                    file.matched_destination_folder = folder;
                    file.matched_rule_name = rule_name;
                });
                let file = entry.snapshot();
                tracing::info!(file = %file.file_name, "Pending file renamed");
                self.events.send(Event::Pending(PendingEvent::Renamed(file)));
            }
            None => {
                tracing::info!(path = %to.display(), "Renamed file no longer matches a rule");
                self.cancel(&id);
            }
        }
    }

    /// Drop the entry for a file that disappeared before its move
    pub fn removed(&self, path: &Path) {
        for marks in [&self.settled, &self.restored] {
            let mut marks = marks.lock().unwrap_or_else(|p| p.into_inner());
            if matches!(marks.get(path), Some(Some(_))) {
                marks.remove(path);
            }
        }

        let Some((id, entry)) = self.entry_at(path) else {
            return;
        };
        if !self.retire(&id, &entry) {
            return;
        }

        let file = entry.snapshot();
        tracing::info!(file = %file.file_name, "Pending file vanished");
        self.events.send(Event::Pending(PendingEvent::Vanished {
            id: file.id,
            file_name: file.file_name,
        }));
    }

    /// Keep the watcher from picking up a file that undo is putting back
    ///
    /// Holds the path until [`confirm_restored`](Self::confirm_restored) or
    /// [`forget_restored`](Self::forget_restored). Returns false if the path
    /// was already marked.
    pub fn mark_restored(&self, path: &Path) -> bool {
        self.restored
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(path.to_path_buf(), None)
            .is_none()
    }

    /// The restored file is in place; remember which file it is
    pub fn confirm_restored(&self, path: &Path) {
        let mut restored = self.restored.lock().unwrap_or_else(|p| p.into_inner());
        match FileStamp::of(path) {
            Some(stamp) => {
                restored.insert(path.to_path_buf(), Some(stamp));
            }
            None => {
                restored.remove(path);
            }
        }
    }

    /// Undo did not happen after all
    pub fn forget_restored(&self, path: &Path) {
        self.restored
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(path);
    }

    /// Whether a live entry points at `path`
    pub fn is_pending_at(&self, path: &Path) -> bool {
        self.entry_at(path).is_some()
    }

    /// Snapshot of the pending set, soonest move first
    pub fn pending(&self) -> Vec<PendingFile> {
        let mut files: Vec<PendingFile> = self
            .read_entries()
            .values()
            .filter(|entry| entry.state() == PendingState::Scheduled)
            .map(|entry| entry.snapshot())
            .collect();
        files.sort_by(|a, b| a.move_at.cmp(&b.move_at).then_with(|| a.id.cmp(&b.id)));
        files
    }

    pub fn get(&self, id: &str) -> Option<PendingFile> {
        self.entry(id).map(|entry| entry.snapshot())
    }

    pub fn len(&self) -> usize {
        self.read_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_entries().is_empty()
    }

    /// Hold due moves until [`resume`](Self::resume)
    pub fn pause(&self) {
        let _deferred = self.deferred.lock().unwrap_or_else(|p| p.into_inner());
        self.paused.store(true, Ordering::SeqCst);
    }

    /// Release held moves; each runs on the worker pool
    pub fn resume(self: &Arc<Self>) {
        let deferred = {
            let mut deferred = self.deferred.lock().unwrap_or_else(|p| p.into_inner());
            self.paused.store(false, Ordering::SeqCst);
            std::mem::take(&mut *deferred)
        };
        for id in deferred {
            let scheduler = Arc::clone(self);
            rayon::spawn(move || {
                scheduler.fire(&id);
            });
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}
