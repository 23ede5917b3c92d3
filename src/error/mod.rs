//! # Error Module
//!
//! User-friendly error types for the auto-sorter.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, file names, what went wrong
//! - **User-friendly messages** - non-technical users should understand
//! - **Recovery hints** - suggest how to fix when possible

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum AutoSortError {
    #[error("Invalid rule: {0}")]
    Validation(#[from] ValidationError),

    #[error("Move failed: {0}")]
    Move(#[from] MoveError),

    #[error("Undo failed: {0}")]
    Undo(#[from] UndoError),

    #[error("History error: {0}")]
    History(#[from] HistoryError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Watcher error: {0}")]
    Watcher(#[from] WatcherError),

    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),
}

/// Problems with a rule or configuration detected at save time
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Rule {rule_id} has an empty name")]
    EmptyName { rule_id: String },

    #[error("Rule '{rule}' has no destination folder")]
    EmptyDestination { rule: String },

    #[error("Rule '{rule}' destination '{folder}' must be a relative path inside the destination root")]
    DestinationEscapesRoot { rule: String, folder: String },

    #[error("Rule '{rule}' has an extension condition with no extensions")]
    EmptyExtensionSet { rule: String },

    #[error("Rule '{rule}' has an invalid pattern '{pattern}': {reason}")]
    InvalidRegex {
        rule: String,
        pattern: String,
        reason: String,
    },

    #[error("A rule with id {rule_id} already exists")]
    DuplicateRuleId { rule_id: String },

    #[error("Rule {rule_id} not found")]
    RuleNotFound { rule_id: String },

    #[error("{0}")]
    InvalidConfig(String),
}

/// Errors that occur while moving a file into place
#[derive(Error, Debug)]
pub enum MoveError {
    #[error("Source file no longer exists: {path}")]
    SourceMissing { path: PathBuf },

    #[error("Failed to create folder {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move {from} to {to}: {source}")]
    Io {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Copy verification failed for {path}: source {expected} bytes, destination {actual} bytes")]
    CopyVerification {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("{destination} already exists and no one is available to decide what to do")]
    DecisionRequired { destination: PathBuf },

    #[error("No decision was made in time for the conflict at {destination}")]
    DecisionTimedOut { destination: PathBuf },

    #[error("Pending file {id} not found")]
    NotFound { id: String },

    #[error("Pending file {id} is already being moved or was cancelled")]
    NotScheduled { id: String },
}

/// Errors that occur when undoing a recorded move
#[derive(Error, Debug)]
pub enum UndoError {
    #[error("History record {id} not found")]
    NotFound { id: String },

    #[error("This move can no longer be undone")]
    NotUndoable { id: String },

    #[error("An undo for this move is already running")]
    InProgress { id: String },

    #[error("The moved file no longer exists at {path}")]
    SourceMissing { path: PathBuf },

    #[error("Another file already exists at {path}. Move or rename it and try again.")]
    DestinationOccupied { path: PathBuf },

    #[error("Failed to restore {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from the history store
#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Failed to open history database at {path}: {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    #[error("History query failed: {0}")]
    QueryFailed(String),

    #[error("History database is locked by a crashed writer. Restart the app.")]
    Poisoned,
}

/// Errors reading or writing the configuration document
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config {path} is not valid JSON: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(String),
}

/// Errors from the folder watcher
#[derive(Error, Debug, Clone)]
pub enum WatcherError {
    #[error("Failed to initialize watcher: {0}")]
    InitFailed(String),

    #[error("Watch folder does not exist: {0}")]
    PathNotFound(PathBuf),

    #[error("Failed to watch {path}: {reason}")]
    WatchFailed { path: PathBuf, reason: String },

    #[error("Failed to unwatch {path}: {reason}")]
    UnwatchFailed { path: PathBuf, reason: String },
}

/// Errors that occur while scanning the watch folder
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Permission denied accessing: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to read directory {path}: {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, AutoSortError>;
