//! # Mover Module
//!
//! Puts a pending file into its destination folder.
//!
//! ## Conflict policies
//! - `Rename` - `report.pdf` becomes `report (1).pdf`, `report (2).pdf`, ...
//! - `Skip` - leave the file in the watch folder
//! - `Overwrite` - replace the existing file (the move cannot be undone)
//! - `Ask` - hand the decision to a `ConflictResolver` with a bounded wait
//!
//! Moves into the same destination folder are serialized so two files with
//! the same name never probe the same free slot.

mod conflict;
mod executor;
mod fs_ops;

pub use conflict::{ChannelResolver, ConflictDecision, ConflictPrompt, ConflictRequest, ConflictResolver};
pub use executor::{MoveExecutor, MoveOutcome, DEFAULT_ASK_TIMEOUT};
pub use fs_ops::unique_path;
pub(crate) use fs_ops::relocate;
