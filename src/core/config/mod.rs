//! # Config Module
//!
//! The persisted settings document and the stores that hold it.
//!
//! The core owns the document; presentation layers read and write it
//! through `AutoSorter::config` / `AutoSorter::save_config`.

mod store;
mod types;

pub use store::{default_data_dir, ConfigStore, JsonConfigStore, MemoryConfigStore};
pub use types::{Config, ConflictResolution, MAX_GRACE_PERIOD_SECONDS};
