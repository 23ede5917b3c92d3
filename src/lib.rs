//! # AutoSort
//!
//! Sorts files that land in a watched folder (usually Downloads) into
//! subfolders by rule, after a grace period the user can cancel or cut
//! short. Every move is recorded and can be undone.
//!
//! ## Architecture
//! The library is split into a core engine (GUI-agnostic) and presentation layers:
//! - `core` - Rules, scheduling, moving, history and the engine facade
//! - `events` - Event stream for whatever UI sits on top
//! - `error` - User-friendly error types
//! - `cli` - Command-line interface (binary only)

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use crate::core::engine::AutoSorter;
pub use error::{AutoSortError, Result};

/// Initialize tracing for the library
///
/// This should be called by the application entry point (CLI or GUI).
/// Filtering follows `RUST_LOG`.
pub fn init_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Tracing already initialized: {}", e);
    }
}
