//! One-level directory listing using walkdir.

use super::filter::ArtifactFilter;
use crate::error::ScanError;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Files found in a folder plus the entries that could not be read
#[derive(Debug, Default)]
pub struct ScanResult {
    pub files: Vec<PathBuf>,
    /// Errors that occurred during scanning (non-fatal)
    pub errors: Vec<ScanError>,
}

/// Lists sortable files directly inside a folder
#[derive(Debug, Clone, Default)]
pub struct FolderScanner {
    filter: ArtifactFilter,
}

impl FolderScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(filter: ArtifactFilter) -> Self {
        Self { filter }
    }

    /// List candidate files in `root`, sorted by path
    ///
    /// Subdirectories are not entered; the destination root often lives
    /// inside the watch folder.
    pub fn scan(&self, root: &Path) -> Result<ScanResult, ScanError> {
        if !root.is_dir() {
            return Err(ScanError::DirectoryNotFound {
                path: root.to_path_buf(),
            });
        }

        let mut result = ScanResult::default();
        let walker = WalkDir::new(root)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
            .sort_by_file_name();

        for entry_result in walker {
            match entry_result {
                Ok(entry) => {
                    if !entry.file_type().is_file() {
                        continue;
                    }
                    if !self.filter.should_include(entry.path()) {
                        tracing::debug!(path = %entry.path().display(), "Ignoring artifact");
                        continue;
                    }
                    result.files.push(entry.into_path());
                }
                Err(e) => {
                    let path = e.path().unwrap_or(root).to_path_buf();
                    let error = match e.io_error().map(io::Error::kind) {
                        Some(io::ErrorKind::PermissionDenied) => {
                            ScanError::PermissionDenied { path }
                        }
                        _ => ScanError::ReadDirectory {
                            path,
                            source: e.into_io_error().unwrap_or_else(|| {
                                io::Error::new(io::ErrorKind::Other, "filesystem loop")
                            }),
                        },
                    };
                    tracing::warn!("Scan error: {}", error);
                    result.errors.push(error);
                }
            }
        }

        Ok(result)
    }
}
