//! # Folder Watcher Module
//!
//! Monitors the watch folder for files arriving, being renamed, or
//! disappearing.
//!
//! Only the top level of the folder is watched. Events for hidden files and
//! download artifacts still come through on rename so a finished download
//! (`report.pdf.crdownload` -> `report.pdf`) can be picked up.
//!
//! ## Example
//! ```rust,ignore
//! use autosort::core::watcher::{FolderWatcher, WatchEvent};
//!
//! let mut watcher = FolderWatcher::new(|event| match event {
//!     WatchEvent::Created(path) => println!("New: {:?}", path),
//!     WatchEvent::Renamed { from, to } => println!("{:?} -> {:?}", from, to),
//!     WatchEvent::Removed(path) => println!("Gone: {:?}", path),
//!     WatchEvent::Error { message, fatal } => eprintln!("{} (fatal: {})", message, fatal),
//! })?;
//! watcher.watch("/Users/me/Downloads")?;
//! ```

use crate::error::WatcherError;
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Filesystem changes the sorter cares about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WatchEvent {
    /// A file appeared (created or moved in)
    Created(PathBuf),
    /// A file was renamed within the folder
    Renamed { from: PathBuf, to: PathBuf },
    /// A file was deleted or moved out
    Removed(PathBuf),
    /// The backend reported a problem; `fatal` means watching has stopped
    Error { message: String, fatal: bool },
}

/// Watches folders for file changes
pub struct FolderWatcher {
    watcher: RecommendedWatcher,
    watched_paths: Arc<Mutex<HashSet<PathBuf>>>,
}

impl FolderWatcher {
    /// Create a new folder watcher that hands events to `event_handler`
    ///
    /// The handler runs on the notify backend's thread.
    pub fn new<F>(event_handler: F) -> Result<Self, WatcherError>
    where
        F: Fn(WatchEvent) + Send + 'static,
    {
        let watched_paths = Arc::new(Mutex::new(HashSet::new()));
        let roots = Arc::clone(&watched_paths);

        let watcher = notify::recommended_watcher(move |result: Result<Event, notify::Error>| {
            match result {
                Ok(event) => {
                    for watch_event in Self::process_event(event, &roots) {
                        event_handler(watch_event);
                    }
                }
                Err(e) => {
                    let fatal = matches!(
                        e.kind,
                        notify::ErrorKind::PathNotFound
                            | notify::ErrorKind::WatchNotFound
                            | notify::ErrorKind::MaxFilesWatch
                    );
                    event_handler(WatchEvent::Error {
                        message: e.to_string(),
                        fatal,
                    });
                }
            }
        })
        .map_err(|e| WatcherError::InitFailed(e.to_string()))?;

        Ok(Self {
            watcher,
            watched_paths,
        })
    }

    /// Convert a notify event into zero or more watch events
    fn process_event(event: Event, roots: &Mutex<HashSet<PathBuf>>) -> Vec<WatchEvent> {
        let is_root = |path: &Path| {
            roots
                .lock()
                .map(|roots| roots.contains(path))
                .unwrap_or(false)
        };

        match event.kind {
            EventKind::Remove(_) if event.paths.iter().any(|p| is_root(p.as_path())) => {
                vec![WatchEvent::Error {
                    message: "Watch folder was removed".to_string(),
                    fatal: true,
                }]
            }
            EventKind::Create(_) => event.paths.into_iter().map(WatchEvent::Created).collect(),
            EventKind::Remove(_) => event.paths.into_iter().map(WatchEvent::Removed).collect(),
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if event.paths.len() == 2 => {
                let mut paths = event.paths.into_iter();
                match (paths.next(), paths.next()) {
                    (Some(from), Some(to)) => vec![WatchEvent::Renamed { from, to }],
                    _ => Vec::new(),
                }
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
                event.paths.into_iter().map(WatchEvent::Removed).collect()
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
                event.paths.into_iter().map(WatchEvent::Created).collect()
            }
            // Some backends cannot tell which side of a rename a path is on
            EventKind::Modify(ModifyKind::Name(_)) => event
                .paths
                .into_iter()
                .map(|path| {
                    if path.exists() {
                        WatchEvent::Created(path)
                    } else {
                        WatchEvent::Removed(path)
                    }
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Start watching a directory (top level only)
    pub fn watch(&mut self, path: impl AsRef<Path>) -> Result<(), WatcherError> {
        let path = path.as_ref().to_path_buf();

        if !path.is_dir() {
            return Err(WatcherError::PathNotFound(path));
        }

        if let Ok(mut paths) = self.watched_paths.lock() {
            paths.insert(path.clone());
        }

        if let Err(e) = self.watcher.watch(&path, RecursiveMode::NonRecursive) {
            if let Ok(mut paths) = self.watched_paths.lock() {
                paths.remove(&path);
            }
            return Err(WatcherError::WatchFailed {
                path,
                reason: e.to_string(),
            });
        }

        Ok(())
    }

    /// Stop watching a directory
    pub fn unwatch(&mut self, path: impl AsRef<Path>) -> Result<(), WatcherError> {
        let path = path.as_ref();

        self.watcher
            .unwatch(path)
            .map_err(|e| WatcherError::UnwatchFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        if let Ok(mut paths) = self.watched_paths.lock() {
            paths.remove(path);
        }

        Ok(())
    }

    /// Get list of currently watched paths
    pub fn watched_paths(&self) -> Vec<PathBuf> {
        self.watched_paths
            .lock()
            .map(|paths| paths.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Check if a path is being watched
    pub fn is_watching(&self, path: impl AsRef<Path>) -> bool {
        self.watched_paths
            .lock()
            .map(|paths| paths.contains(path.as_ref()))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, RemoveKind};
    use std::sync::mpsc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn roots(paths: &[&str]) -> Mutex<HashSet<PathBuf>> {
        Mutex::new(paths.iter().map(PathBuf::from).collect())
    }

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        let mut event = Event::new(kind);
        for path in paths {
            event = event.add_path(PathBuf::from(path));
        }
        event
    }

    #[test]
    fn create_maps_to_created() {
        let events = FolderWatcher::process_event(
            event(EventKind::Create(CreateKind::File), &["/dl/a.pdf"]),
            &roots(&["/dl"]),
        );
        assert_eq!(events, vec![WatchEvent::Created(PathBuf::from("/dl/a.pdf"))]);
    }

    #[test]
    fn rename_both_maps_to_renamed() {
        let events = FolderWatcher::process_event(
            event(
                EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
                &["/dl/a.pdf.part", "/dl/a.pdf"],
            ),
            &roots(&["/dl"]),
        );
        assert_eq!(
            events,
            vec![WatchEvent::Renamed {
                from: PathBuf::from("/dl/a.pdf.part"),
                to: PathBuf::from("/dl/a.pdf"),
            }]
        );
    }

    #[test]
    fn rename_halves_map_to_remove_and_create() {
        let from = FolderWatcher::process_event(
            event(EventKind::Modify(ModifyKind::Name(RenameMode::From)), &["/dl/a.pdf"]),
            &roots(&["/dl"]),
        );
        let to = FolderWatcher::process_event(
            event(EventKind::Modify(ModifyKind::Name(RenameMode::To)), &["/dl/b.pdf"]),
            &roots(&["/dl"]),
        );
        assert_eq!(from, vec![WatchEvent::Removed(PathBuf::from("/dl/a.pdf"))]);
        assert_eq!(to, vec![WatchEvent::Created(PathBuf::from("/dl/b.pdf"))]);
    }

    #[test]
    fn removing_watch_root_is_fatal() {
        let events = FolderWatcher::process_event(
            event(EventKind::Remove(RemoveKind::Folder), &["/dl"]),
            &roots(&["/dl"]),
        );
        assert!(matches!(
            events.as_slice(),
            [WatchEvent::Error { fatal: true, .. }]
        ));
    }

    #[test]
    fn content_changes_are_ignored() {
        let events = FolderWatcher::process_event(
            event(
                EventKind::Modify(ModifyKind::Data(notify::event::DataChange::Content)),
                &["/dl/a.pdf"],
            ),
            &roots(&["/dl"]),
        );
        assert!(events.is_empty());
    }

    #[test]
    fn watcher_creates_successfully() {
        let (tx, _rx) = mpsc::channel();
        let result = FolderWatcher::new(move |event| {
            let _ = tx.send(event);
        });
        assert!(result.is_ok());
    }

    #[test]
    fn watcher_fails_for_nonexistent_path() {
        let (tx, _rx) = mpsc::channel();
        let mut watcher = FolderWatcher::new(move |event| {
            let _ = tx.send(event);
        })
        .unwrap();

        let result = watcher.watch("/nonexistent/path/that/doesnt/exist");
        assert!(matches!(result, Err(WatcherError::PathNotFound(_))));
        assert!(watcher.watched_paths().is_empty());
    }

    #[test]
    fn watcher_can_unwatch() {
        let temp_dir = TempDir::new().unwrap();
        let (tx, _rx) = mpsc::channel();
        let mut watcher = FolderWatcher::new(move |event| {
            let _ = tx.send(event);
        })
        .unwrap();

        watcher.watch(temp_dir.path()).unwrap();
        assert!(watcher.is_watching(temp_dir.path()));

        watcher.unwatch(temp_dir.path()).unwrap();
        assert!(!watcher.is_watching(temp_dir.path()));
    }

    #[test]
    fn new_file_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let (tx, rx) = mpsc::channel();
        let mut watcher = FolderWatcher::new(move |event| {
            let _ = tx.send(event);
        })
        .unwrap();
        watcher.watch(temp_dir.path()).unwrap();

        let path = temp_dir.path().join("report.pdf");
        std::fs::write(&path, b"pdf").unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        let mut seen = false;
        while std::time::Instant::now() < deadline {
            match rx.recv_timeout(Duration::from_millis(200)) {
                Ok(WatchEvent::Created(p)) if p.file_name() == path.file_name() => {
                    seen = true;
                    break;
                }
                _ => {}
            }
        }
        assert!(seen);
    }
}
