//! Secure deletion by multi-pass overwriting.
//!
//! Files are overwritten in place with random bytes, then zeros, before
//! being unlinked. On SSDs with wear leveling this cannot guarantee the old
//! blocks are gone; it is defense-in-depth against casual recovery, not a
//! substitute for full-disk encryption.

use std::fs::{self, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use rand::RngCore;
use tracing::{debug, warn};

use inkvault_common::{BlockedPaths, Error, Result};

/// Default number of random overwrite passes before the final zero pass.
pub const DEFAULT_PASSES: u32 = 3;

/// Securely delete a single file.
///
/// Overwrites the file's full length with random bytes `passes` times, then
/// once with zeros, syncing after every pass, and finally unlinks it. The
/// unlink is attempted even when a pass fails, so a partially scrubbed file
/// does not linger.
///
/// # Postconditions
/// - On success, the file no longer exists
///
/// # Errors
/// - [`Error::InvalidInput`] if the path exists but is not a regular file
/// - [`Error::Io`] on any filesystem failure
pub fn secure_delete_file(path: &Path, passes: u32) -> Result<()> {
    let metadata = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    if !metadata.is_file() {
        return Err(Error::InvalidInput(format!(
            "{} is not a regular file",
            path.display()
        )));
    }

    let overwrite_result = overwrite_contents(path, metadata.len(), passes);
    let unlink_result = fs::remove_file(path);

    overwrite_result?;
    unlink_result?;

    debug!(path = %path.display(), passes = passes, "File securely deleted");
    Ok(())
}

fn overwrite_contents(path: &Path, len: u64, passes: u32) -> Result<()> {
    let mut file = OpenOptions::new().write(true).open(path)?;
    let mut buf = vec![0u8; len as usize];

    for _ in 0..passes {
        rand::rng().fill_bytes(&mut buf);
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&buf)?;
        file.flush()?;
        file.sync_all()?;
    }

    // Final pass with zeros
    buf.fill(0);
    file.seek(SeekFrom::Start(0))?;
    file.write_all(&buf)?;
    file.flush()?;
    file.sync_all()?;

    Ok(())
}

/// Securely delete a directory tree, bottom-up.
///
/// Every regular file is scrubbed with [`secure_delete_file`]; emptied
/// directories are removed afterwards. A file that cannot be erased does
/// not abort the sweep: failures are collected and reported together, so
/// one locked file never silently strands the rest of the plaintext.
///
/// # Errors
/// - [`Error::InvalidInput`] if the path exists but is not a directory
/// - [`Error::DeletionBlocked`] naming every path that survived the sweep
/// - [`Error::Io`] if the emptied directory itself cannot be removed
pub fn secure_delete_directory(path: &Path, passes: u32) -> Result<()> {
    let metadata = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    if !metadata.is_dir() {
        return Err(Error::InvalidInput(format!(
            "{} is not a directory",
            path.display()
        )));
    }

    let mut failed: Vec<(PathBuf, String)> = Vec::new();
    scrub_tree(path, passes, &mut failed);

    if !failed.is_empty() {
        return Err(Error::DeletionBlocked(BlockedPaths::new(failed)));
    }

    if fs::remove_dir(path).is_err() {
        // Leftover empty subdirectories hold no plaintext at this point
        fs::remove_dir_all(path)?;
    }

    debug!(path = %path.display(), "Directory securely deleted");
    Ok(())
}

fn scrub_tree(dir: &Path, passes: u32, failed: &mut Vec<(PathBuf, String)>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            failed.push((dir.to_path_buf(), e.to_string()));
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);

        if is_dir {
            scrub_tree(&path, passes, failed);
            let _ = fs::remove_dir(&path);
        } else if let Err(e) = secure_delete_file(&path, passes) {
            warn!("Failed to securely delete {}: {}", path.display(), e);
            failed.push((path, e.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_is_gone_after_delete() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("secret.md");
        fs::write(&path, b"plaintext note").unwrap();

        secure_delete_file(&path, DEFAULT_PASSES).unwrap();

        assert!(!path.exists());
    }

    #[test]
    fn test_missing_file_is_noop() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("never-existed");

        secure_delete_file(&path, DEFAULT_PASSES).unwrap();
    }

    #[test]
    fn test_directory_path_rejected_as_file() {
        let dir = tempdir().unwrap();

        let result = secure_delete_file(dir.path(), DEFAULT_PASSES);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_empty_file_is_deleted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty");
        fs::write(&path, b"").unwrap();

        secure_delete_file(&path, DEFAULT_PASSES).unwrap();

        assert!(!path.exists());
    }

    #[test]
    fn test_directory_tree_removed() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("workspace");
        fs::create_dir_all(root.join("notes/deep")).unwrap();
        fs::write(root.join("top.md"), b"top").unwrap();
        fs::write(root.join("notes/a.md"), b"a").unwrap();
        fs::write(root.join("notes/deep/b.md"), b"b").unwrap();

        secure_delete_directory(&root, DEFAULT_PASSES).unwrap();

        assert!(!root.exists());
    }

    #[test]
    fn test_missing_directory_is_noop() {
        let dir = tempdir().unwrap();

        secure_delete_directory(&dir.path().join("gone"), DEFAULT_PASSES).unwrap();
    }

    #[test]
    fn test_file_path_rejected_as_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("file");
        fs::write(&path, b"x").unwrap();

        let result = secure_delete_directory(&path, DEFAULT_PASSES);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_blocked_file_reported_not_swallowed() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let root = dir.path().join("workspace");
        fs::create_dir(&root).unwrap();

        // A read-only directory blocks unlink for ordinary users. Root
        // ignores directory permissions, so try a canary removal first and
        // skip when the scenario cannot be expressed.
        let canary = root.join("canary");
        fs::write(&canary, b"x").unwrap();
        fs::set_permissions(&root, fs::Permissions::from_mode(0o555)).unwrap();
        if fs::remove_file(&canary).is_ok() {
            fs::set_permissions(&root, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }
        fs::set_permissions(&root, fs::Permissions::from_mode(0o755)).unwrap();
        fs::remove_file(&canary).unwrap();

        let stuck = root.join("stuck.md");
        fs::write(&stuck, b"cannot unlink me").unwrap();
        fs::set_permissions(&root, fs::Permissions::from_mode(0o555)).unwrap();

        let result = secure_delete_directory(&root, 1);

        fs::set_permissions(&root, fs::Permissions::from_mode(0o755)).unwrap();

        match result {
            Err(Error::DeletionBlocked(blocked)) => {
                assert_eq!(blocked.len(), 1);
                assert!(blocked.paths().any(|p| p == stuck));
            }
            other => panic!("expected DeletionBlocked, got {other:?}"),
        }
        assert!(stuck.exists());
    }
}
