//! # Engine Module
//!
//! [`AutoSorter`] ties the pieces together and exposes the command surface
//! a front end talks to: config, watcher control, the pending list, history
//! and rule editing.
//!
//! ## Example
//! ```rust,ignore
//! use autosort::core::engine::AutoSorter;
//!
//! let sorter = AutoSorter::open(&autosort::core::config::default_data_dir())?;
//! sorter.start()?;
//! sorter.scan()?;
//! for file in sorter.pending() {
//!     println!("{} -> {}", file.file_name, file.matched_destination_folder);
//! }
//! ```

mod builder;
mod rules;
mod sorter;

pub use builder::AutoSorterBuilder;
pub use sorter::{AutoSorter, WatcherStatus};
