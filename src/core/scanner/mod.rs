//! # Scanner Module
//!
//! Finds the files in the watch folder that are candidates for sorting.
//!
//! Only the top level of the folder is considered. Hidden files and
//! in-progress download artifacts are left alone:
//! - `.crdownload` (Chromium)
//! - `.part` (Firefox)
//! - `.download` (Safari)
//! - `.tmp`
//!
//! ## Example
//! ```rust,ignore
//! use autosort::core::scanner::FolderScanner;
//!
//! let result = FolderScanner::new().scan(&downloads)?;
//! for path in result.files {
//!     println!("{}", path.display());
//! }
//! ```

mod filter;
mod walker;

pub use filter::{is_candidate, ArtifactFilter};
pub use walker::{FolderScanner, ScanResult};
