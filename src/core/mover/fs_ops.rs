//! Low-level file moves and name probing.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const MAX_RENAME_PROBES: u32 = 1000;

/// A cross-device copy came out the wrong size
#[derive(Debug, thiserror::Error)]
#[error("copy verification failed: source {expected} bytes, destination {actual} bytes")]
pub(crate) struct SizeMismatch {
    pub expected: u64,
    pub actual: u64,
}

/// Move a file, falling back to copy + delete across filesystems
///
/// The source is only deleted once the copy's size matches; a mismatch is
/// reported as an `InvalidData` error wrapping [`SizeMismatch`].
pub(crate) fn relocate(source: &Path, destination: &Path) -> io::Result<()> {
    fs::rename(source, destination).or_else(|_| {
        let expected = fs::metadata(source)?.len();
        fs::copy(source, destination)?;

        let actual = fs::metadata(destination)?.len();
        if actual != expected {
            let _ = fs::remove_file(destination);
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                SizeMismatch { expected, actual },
            ));
        }

        fs::remove_file(source)
    })
}

/// First free `stem (n).ext` next to `path`
///
/// Gives up after 1000 probes and prefixes a uuid instead.
pub fn unique_path(path: &Path) -> PathBuf {
    let parent = path.parent().unwrap_or(Path::new("."));
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default();

    for counter in 1..=MAX_RENAME_PROBES {
        let name = if extension.is_empty() {
            format!("{} ({})", stem, counter)
        } else {
            format!("{} ({}).{}", stem, counter, extension)
        };

        let candidate = parent.join(name);
        if !candidate.exists() {
            return candidate;
        }
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    parent.join(format!("{}_{}", Uuid::new_v4(), file_name))
}
