//! Executes a single pending move under a conflict policy.

use super::conflict::{ConflictDecision, ConflictPrompt, ConflictResolver};
use super::fs_ops::{relocate, unique_path, SizeMismatch};
use crate::core::config::ConflictResolution;
use crate::core::history::MoveRecord;
use crate::core::scheduler::PendingFile;
use crate::error::MoveError;
use crate::events::{ConflictEvent, Event, EventSender, null_sender};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;

/// How long an `Ask` conflict waits for an answer by default
pub const DEFAULT_ASK_TIMEOUT: Duration = Duration::from_secs(60);

/// What happened to a file handed to the executor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The file now lives at `record.new_path`
    Moved(MoveRecord),
    /// A file already occupied the destination and the policy said to leave it
    Skipped { source: PathBuf, destination: PathBuf },
}

/// Moves files into `destination_root / folder / name`
pub struct MoveExecutor {
    destination_root: RwLock<PathBuf>,
    /// One lock per destination folder; probe-and-move happens under it
    folder_locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
    resolver: Option<Arc<dyn ConflictResolver>>,
    ask_timeout: Duration,
    events: EventSender,
}

impl MoveExecutor {
    pub fn new(destination_root: impl Into<PathBuf>) -> Self {
        Self {
            destination_root: RwLock::new(destination_root.into()),
            folder_locks: Mutex::new(HashMap::new()),
            resolver: None,
            ask_timeout: DEFAULT_ASK_TIMEOUT,
            events: null_sender(),
        }
    }

    /// Answer `Ask` conflicts through `resolver`, waiting at most `timeout`
    pub fn with_resolver(mut self, resolver: Arc<dyn ConflictResolver>, timeout: Duration) -> Self {
        self.resolver = Some(resolver);
        self.ask_timeout = timeout;
        self
    }

    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = events;
        self
    }

    pub fn destination_root(&self) -> PathBuf {
        self.destination_root
            .read()
            .map(|root| root.clone())
            .unwrap_or_else(|p| p.into_inner().clone())
    }

    pub fn set_destination_root(&self, root: impl Into<PathBuf>) {
        let mut slot = self
            .destination_root
            .write()
            .unwrap_or_else(|p| p.into_inner());
        *slot = root.into();
    }

    fn folder_lock(&self, folder: &Path) -> Arc<Mutex<()>> {
        let mut locks = self.folder_locks.lock().unwrap_or_else(|p| p.into_inner());
        locks
            .entry(folder.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Move one pending file
    ///
    /// The destination folder is created if needed. Filesystem failures are
    /// returned and never retried.
    pub fn execute(
        &self,
        pending: &PendingFile,
        policy: ConflictResolution,
    ) -> Result<MoveOutcome, MoveError> {
        let source = &pending.source_path;
        // Size may have grown since detection if the download was still finishing
        let file_size = fs::metadata(source)
            .map_err(|_| MoveError::SourceMissing {
                path: source.clone(),
            })?
            .len();

        let dest_dir = self
            .destination_root()
            .join(&pending.matched_destination_folder);
        fs::create_dir_all(&dest_dir).map_err(|e| MoveError::CreateDirectory {
            path: dest_dir.clone(),
            source: e,
        })?;

        let lock = self.folder_lock(&dest_dir);
        let mut guard = lock_folder(&lock);
        let target = dest_dir.join(&pending.file_name);

        let mut overwrote = false;
        let final_path = if target.exists() {
            let decision = match policy {
                ConflictResolution::Rename => ConflictDecision::Rename,
                ConflictResolution::Skip => ConflictDecision::Skip,
                ConflictResolution::Overwrite => ConflictDecision::Overwrite,
                ConflictResolution::Ask => {
                    // Other moves into this folder keep going while we wait
                    drop(guard);
                    let decision = self.ask(pending, &target)?;
                    guard = lock_folder(&lock);
                    decision
                }
            };

            if !target.exists() {
                // Freed up while we were waiting for a decision
                target
            } else {
                match decision {
                    ConflictDecision::Rename => unique_path(&target),
                    ConflictDecision::Overwrite => {
                        overwrote = true;
                        target
                    }
                    ConflictDecision::Skip => {
                        tracing::info!(
                            file = %pending.file_name,
                            destination = %target.display(),
                            "Destination exists, skipping"
                        );
                        return Ok(MoveOutcome::Skipped {
                            source: source.clone(),
                            destination: target,
                        });
                    }
                }
            }
        } else {
            target
        };

        relocate(source, &final_path).map_err(|e| {
            match e.get_ref().and_then(|inner| inner.downcast_ref::<SizeMismatch>()) {
                Some(mismatch) => MoveError::CopyVerification {
                    path: final_path.clone(),
                    expected: mismatch.expected,
                    actual: mismatch.actual,
                },
                None => MoveError::Io {
                    from: source.clone(),
                    to: final_path.clone(),
                    source: e,
                },
            }
        })?;
        drop(guard);

        tracing::info!(
            file = %pending.file_name,
            to = %final_path.display(),
            rule = %pending.matched_rule_name,
            "Moved file"
        );

        Ok(MoveOutcome::Moved(MoveRecord::new(
            source.clone(),
            final_path,
            pending.matched_rule_name.clone(),
            file_size,
            !overwrote,
        )))
    }

    fn ask(&self, pending: &PendingFile, existing: &Path) -> Result<ConflictDecision, MoveError> {
        let Some(resolver) = &self.resolver else {
            tracing::warn!(file = %pending.file_name, "Conflict needs a decision but no resolver is attached");
            return Err(MoveError::DecisionRequired {
                destination: existing.to_path_buf(),
            });
        };

        let prompt = ConflictPrompt {
            pending_id: pending.id.clone(),
            file_name: pending.file_name.clone(),
            source: pending.source_path.clone(),
            destination: existing.to_path_buf(),
        };
        self.events
            .send(Event::Conflict(ConflictEvent::DecisionRequested(prompt.clone())));

        resolver
            .decide(&prompt, self.ask_timeout)
            .ok_or_else(|| MoveError::DecisionTimedOut {
                destination: existing.to_path_buf(),
            })
    }
}

fn lock_folder(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
    lock.lock().unwrap_or_else(|p| p.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mover::ChannelResolver;
    use chrono::Utc;
    use std::thread;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        watch: PathBuf,
        dest: PathBuf,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let watch = temp.path().join("downloads");
        let dest = temp.path().join("sorted");
        fs::create_dir_all(&watch).unwrap();
        Fixture {
            _temp: temp,
            watch,
            dest,
        }
    }

    fn pending(dir: &Path, name: &str, content: &[u8], folder: &str) -> PendingFile {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        let now = Utc::now();
        PendingFile {
            id: uuid::Uuid::new_v4().to_string(),
            source_path: path,
            file_name: name.to_string(),
            matched_destination_folder: folder.to_string(),
            matched_rule_name: folder.to_string(),
            added_at: now,
            move_at: now,
            file_size: content.len() as u64,
        }
    }

    #[test]
    fn moves_into_created_folder() {
        let fx = fixture();
        let executor = MoveExecutor::new(&fx.dest);
        let file = pending(&fx.watch, "report.pdf", b"pdf", "Docs/2024");

        let outcome = executor.execute(&file, ConflictResolution::Rename).unwrap();
        let MoveOutcome::Moved(record) = outcome else {
            panic!("expected a move");
        };

        assert_eq!(record.new_path, fx.dest.join("Docs/2024/report.pdf"));
        assert_eq!(record.original_path, file.source_path);
        assert!(record.can_undo);
        assert!(!file.source_path.exists());
    }

    #[test]
    fn rename_policy_finds_next_free_name() {
        let fx = fixture();
        let docs = fx.dest.join("Docs");
        fs::create_dir_all(&docs).unwrap();
        fs::write(docs.join("report.pdf"), b"one").unwrap();
        fs::write(docs.join("report (1).pdf"), b"two").unwrap();

        let executor = MoveExecutor::new(&fx.dest);
        let file = pending(&fx.watch, "report.pdf", b"three", "Docs");
        let MoveOutcome::Moved(record) = executor.execute(&file, ConflictResolution::Rename).unwrap() else {
            panic!("expected a move");
        };

        assert_eq!(record.new_path, docs.join("report (2).pdf"));
        assert_eq!(fs::read(docs.join("report.pdf")).unwrap(), b"one");
    }

    #[test]
    fn skip_policy_leaves_file_in_place() {
        let fx = fixture();
        let docs = fx.dest.join("Docs");
        fs::create_dir_all(&docs).unwrap();
        fs::write(docs.join("report.pdf"), b"old").unwrap();

        let executor = MoveExecutor::new(&fx.dest);
        let file = pending(&fx.watch, "report.pdf", b"new", "Docs");
        let outcome = executor.execute(&file, ConflictResolution::Skip).unwrap();

        assert!(matches!(outcome, MoveOutcome::Skipped { .. }));
        assert!(file.source_path.exists());
        assert_eq!(fs::read(docs.join("report.pdf")).unwrap(), b"old");
    }

    #[test]
    fn overwrite_policy_replaces_and_disables_undo() {
        let fx = fixture();
        let docs = fx.dest.join("Docs");
        fs::create_dir_all(&docs).unwrap();
        fs::write(docs.join("report.pdf"), b"old").unwrap();

        let executor = MoveExecutor::new(&fx.dest);
        let file = pending(&fx.watch, "report.pdf", b"new", "Docs");
        let MoveOutcome::Moved(record) = executor.execute(&file, ConflictResolution::Overwrite).unwrap() else {
            panic!("expected a move");
        };

        assert!(!record.can_undo);
        assert_eq!(fs::read(docs.join("report.pdf")).unwrap(), b"new");
    }

    #[test]
    fn overwrite_without_conflict_stays_undoable() {
        let fx = fixture();
        let executor = MoveExecutor::new(&fx.dest);
        let file = pending(&fx.watch, "report.pdf", b"new", "Docs");
        let MoveOutcome::Moved(record) = executor.execute(&file, ConflictResolution::Overwrite).unwrap() else {
            panic!("expected a move");
        };
        assert!(record.can_undo);
    }

    #[test]
    fn missing_source_is_reported() {
        let fx = fixture();
        let executor = MoveExecutor::new(&fx.dest);
        let file = pending(&fx.watch, "gone.pdf", b"x", "Docs");
        fs::remove_file(&file.source_path).unwrap();

        assert!(matches!(
            executor.execute(&file, ConflictResolution::Rename),
            Err(MoveError::SourceMissing { .. })
        ));
    }

    #[test]
    fn ask_without_resolver_requires_decision() {
        let fx = fixture();
        let docs = fx.dest.join("Docs");
        fs::create_dir_all(&docs).unwrap();
        fs::write(docs.join("report.pdf"), b"old").unwrap();

        let executor = MoveExecutor::new(&fx.dest);
        let file = pending(&fx.watch, "report.pdf", b"new", "Docs");
        assert!(matches!(
            executor.execute(&file, ConflictResolution::Ask),
            Err(MoveError::DecisionRequired { .. })
        ));
        assert!(file.source_path.exists());
    }

    #[test]
    fn ask_applies_the_answer() {
        let fx = fixture();
        let docs = fx.dest.join("Docs");
        fs::create_dir_all(&docs).unwrap();
        fs::write(docs.join("report.pdf"), b"old").unwrap();

        let (resolver, requests) = ChannelResolver::new();
        let executor =
            MoveExecutor::new(&fx.dest).with_resolver(Arc::new(resolver), Duration::from_secs(5));
        let ui = thread::spawn(move || {
            requests.recv().unwrap().respond(ConflictDecision::Rename);
        });

        let file = pending(&fx.watch, "report.pdf", b"new", "Docs");
        let MoveOutcome::Moved(record) = executor.execute(&file, ConflictResolution::Ask).unwrap() else {
            panic!("expected a move");
        };
        ui.join().unwrap();

        assert_eq!(record.new_path, docs.join("report (1).pdf"));
    }

    #[test]
    fn ask_times_out() {
        let fx = fixture();
        let docs = fx.dest.join("Docs");
        fs::create_dir_all(&docs).unwrap();
        fs::write(docs.join("report.pdf"), b"old").unwrap();

        let (resolver, _requests) = ChannelResolver::new();
        let executor =
            MoveExecutor::new(&fx.dest).with_resolver(Arc::new(resolver), Duration::from_millis(20));

        let file = pending(&fx.watch, "report.pdf", b"new", "Docs");
        assert!(matches!(
            executor.execute(&file, ConflictResolution::Ask),
            Err(MoveError::DecisionTimedOut { .. })
        ));
    }

    #[test]
    fn concurrent_same_name_moves_never_collide() {
        let fx = fixture();
        let executor = Arc::new(MoveExecutor::new(&fx.dest));
        let barrier = Arc::new(std::sync::Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let dir = fx.watch.join(format!("batch{i}"));
                fs::create_dir_all(&dir).unwrap();
                let file = pending(&dir, "report.pdf", format!("{i}").as_bytes(), "Docs");
                let executor = executor.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    executor.execute(&file, ConflictResolution::Rename)
                })
            })
            .collect();

        let mut destinations: Vec<PathBuf> = handles
            .into_iter()
            .map(|h| match h.join().unwrap().unwrap() {
                MoveOutcome::Moved(record) => record.new_path,
                MoveOutcome::Skipped { .. } => panic!("rename never skips"),
            })
            .collect();
        destinations.sort();
        destinations.dedup();

        assert_eq!(destinations.len(), 8);
        assert_eq!(fs::read_dir(fx.dest.join("Docs")).unwrap().count(), 8);
    }
}
