//! Event type definitions.

use crate::core::history::MoveRecord;
use crate::core::mover::ConflictPrompt;
use crate::core::scheduler::PendingFile;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted by the sorter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Folder watcher lifecycle
    Watcher(WatcherEvent),
    /// Changes to the pending set
    Pending(PendingEvent),
    /// Results of move attempts
    Move(MoveEvent),
    /// Changes to the history ledger
    History(HistoryEvent),
    /// Conflicts waiting on a decision
    Conflict(ConflictEvent),
}

/// Events from the folder watcher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WatcherEvent {
    /// Watcher started monitoring a folder
    Started { path: PathBuf },
    /// Watcher stopped monitoring a folder
    Stopped { path: PathBuf },
    /// Due moves are held until resume
    Paused,
    Resumed,
    /// The watcher hit an error it cannot recover from
    Failed { message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PendingEvent {
    /// A file matched a rule and is waiting out its grace period
    Scheduled(PendingFile),
    /// The user cancelled a pending move
    Cancelled { id: String, file_name: String },
    /// The file was renamed before it moved; carries the new details
    Renamed(PendingFile),
    /// The file disappeared before it could be moved
    Vanished { id: String, file_name: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MoveEvent {
    Completed { record: MoveRecord },
    /// Destination was taken and the conflict policy said skip
    Skipped {
        pending_id: String,
        file_name: String,
        destination: PathBuf,
    },
    Failed {
        pending_id: String,
        file_name: String,
        message: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HistoryEvent {
    Undone {
        record_id: String,
        restored_to: PathBuf,
    },
    Cleared,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ConflictEvent {
    /// A move is blocked until someone answers this prompt
    DecisionRequested(ConflictPrompt),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_serializable() {
        let event = Event::Move(MoveEvent::Failed {
            pending_id: "p1".to_string(),
            file_name: "report.pdf".to_string(),
            message: "Source file missing".to_string(),
        });

        let json = serde_json::to_string(&event).unwrap();
        let deserialized: Event = serde_json::from_str(&json).unwrap();

        match deserialized {
            Event::Move(MoveEvent::Failed { file_name, .. }) => {
                assert_eq!(file_name, "report.pdf");
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn watcher_event_round_trips() {
        let event = Event::Watcher(WatcherEvent::Started {
            path: PathBuf::from("/downloads"),
        });
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("Started"));
        assert!(json.contains("/downloads"));
    }
}
