//! Atomic file writes.
//!
//! Data is written to a named temporary file in the destination directory,
//! flushed and synced, then renamed over the target. Readers observe either
//! the complete old contents or the complete new contents, never a torn
//! write. Keeping the temporary file next to the target guarantees the
//! rename stays on one filesystem.

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use inkvault_common::{Error, Result};

/// Write `data` to `path` atomically.
///
/// Missing parent directories are created first. The temporary file is
/// removed on every failure path.
///
/// # Postconditions
/// - On success, `path` contains exactly `data`
/// - On failure, any previous contents of `path` are untouched
///
/// # Errors
/// - [`Error::InvalidInput`] if the path has no parent directory
/// - [`Error::Io`] on any filesystem failure
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let parent = path.parent().ok_or_else(|| {
        Error::InvalidInput(format!("Path has no parent directory: {}", path.display()))
    })?;
    fs::create_dir_all(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(data)?;
    tmp.flush()?;
    tmp.as_file_mut().sync_all()?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;

    debug!(path = %path.display(), size = data.len(), "Atomic write complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_and_read_back() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("data.bin");

        atomic_write(&target, b"hello vault").unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"hello vault");
    }

    #[test]
    fn test_overwrite_replaces_contents() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("data.bin");

        atomic_write(&target, b"first").unwrap();
        atomic_write(&target, b"second").unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"second");
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("data.bin");

        atomic_write(&target, b"contents").unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec!["data.bin"]);
    }

    #[test]
    fn test_creates_missing_parent_directories() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("a").join("b").join("data.bin");

        atomic_write(&target, b"nested").unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"nested");
    }

    #[test]
    fn test_failure_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("occupied");
        fs::create_dir(&target).unwrap();

        // Renaming a file over a directory fails
        let result = atomic_write(&target, b"data");
        assert!(result.is_err());

        let entries: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec!["occupied"]);
    }
}
