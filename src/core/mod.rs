//! # Core Module
//!
//! The GUI-agnostic sorting engine.
//!
//! ## Modules
//! - `rules` - Conditions, rule matching and validation
//! - `config` - The settings document and where it is stored
//! - `scanner` - Lists sortable files in a folder
//! - `watcher` - Notices files arriving in the watch folder
//! - `scheduler` - Grace-period countdowns, cancel and move-now
//! - `mover` - Performs moves under a conflict policy
//! - `history` - Undoable record of completed moves
//! - `engine` - Ties everything together behind one facade

pub mod config;
pub mod engine;
pub mod history;
pub mod mover;
pub mod rules;
pub mod scanner;
pub mod scheduler;
pub mod watcher;

// Re-export commonly used types
pub use config::{Config, ConflictResolution};
pub use engine::AutoSorter;
pub use history::{HistoryStats, MoveRecord};
pub use rules::{Condition, SortRule};
pub use scheduler::PendingFile;
