//! Vault directory layout.
//!
//! A vault is a flat directory: a plaintext `.vault_id` marker, the
//! encrypted index at `index.enc`, and one `{node_id}.enc` blob per note.
//! All structure lives inside the encrypted index; blob filenames reveal
//! nothing but a random ID.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use inkvault_common::{Error, NodeId, Result, VaultId};

/// Name of the plaintext marker file holding the vault ID.
pub const VAULT_MARKER: &str = ".vault_id";

/// Name of the encrypted index file.
pub const INDEX_FILENAME: &str = "index.enc";

/// Extension for encrypted blobs.
pub const ENCRYPTED_EXT: &str = "enc";

/// Physical layout of an encrypted vault directory.
#[derive(Debug, Clone)]
pub struct VaultLayout {
    root: PathBuf,
}

impl VaultLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The vault's root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Initialize a new vault directory.
    ///
    /// Creates the directory (and missing parents), generates a fresh vault
    /// ID, and writes the plaintext marker.
    ///
    /// # Errors
    /// - [`Error::DirectoryNotEmpty`] if the target exists and already
    ///   contains anything
    pub fn initialize(&self) -> Result<VaultId> {
        if self.root.exists() && fs::read_dir(&self.root)?.next().is_some() {
            return Err(Error::DirectoryNotEmpty(self.root.clone()));
        }

        fs::create_dir_all(&self.root)?;

        let vault_id = VaultId::generate();
        fs::write(self.marker_path(), vault_id.as_str())?;

        debug!(path = %self.root.display(), vault_id = %vault_id, "Vault directory initialized");
        Ok(vault_id)
    }

    /// Read the vault ID from the marker file.
    ///
    /// # Errors
    /// - [`Error::VaultNotFound`] if the marker is absent
    pub fn vault_id(&self) -> Result<VaultId> {
        let marker = self.marker_path();
        if !marker.exists() {
            return Err(Error::VaultNotFound(self.root.clone()));
        }

        let contents = fs::read_to_string(&marker)?;
        VaultId::new(contents.trim())
    }

    /// Path of the plaintext vault ID marker.
    pub fn marker_path(&self) -> PathBuf {
        self.root.join(VAULT_MARKER)
    }

    /// Path of the encrypted index.
    pub fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILENAME)
    }

    /// Path of a node's encrypted blob.
    pub fn blob_path(&self, node_id: &NodeId) -> PathBuf {
        self.root.join(format!("{}.{}", node_id, ENCRYPTED_EXT))
    }

    /// All encrypted note blobs, sorted. Excludes the index.
    pub fn list_blobs(&self) -> Result<Vec<PathBuf>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut blobs = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            let is_enc = path.extension().is_some_and(|ext| ext == ENCRYPTED_EXT);
            let is_index = path.file_name().is_some_and(|name| name == INDEX_FILENAME);
            if is_enc && !is_index {
                blobs.push(path);
            }
        }
        blobs.sort();
        Ok(blobs)
    }

    /// Whether a vault marker is present at this layout's root.
    pub fn exists(&self) -> bool {
        self.root.is_dir() && self.marker_path().exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_initialize_writes_marker() {
        let dir = tempdir().unwrap();
        let layout = VaultLayout::new(dir.path().join("vault"));

        let created = layout.initialize().unwrap();

        assert!(layout.exists());
        assert_eq!(layout.vault_id().unwrap(), created);
    }

    #[test]
    fn test_initialize_rejects_non_empty_directory() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("existing.txt"), b"data").unwrap();
        let layout = VaultLayout::new(dir.path());

        let result = layout.initialize();
        assert!(matches!(result, Err(Error::DirectoryNotEmpty(_))));
    }

    #[test]
    fn test_initialize_accepts_empty_existing_directory() {
        let dir = tempdir().unwrap();
        let layout = VaultLayout::new(dir.path());

        layout.initialize().unwrap();

        assert!(layout.exists());
    }

    #[test]
    fn test_vault_id_without_marker() {
        let dir = tempdir().unwrap();
        let layout = VaultLayout::new(dir.path().join("nothing"));

        let result = layout.vault_id();
        assert!(matches!(result, Err(Error::VaultNotFound(_))));
    }

    #[test]
    fn test_blob_path_uses_node_id() {
        let layout = VaultLayout::new("/vaults/demo");
        let node_id = NodeId::new("abcd1234").unwrap();

        assert_eq!(
            layout.blob_path(&node_id),
            PathBuf::from("/vaults/demo/abcd1234.enc")
        );
    }

    #[test]
    fn test_list_blobs_excludes_index() {
        let dir = tempdir().unwrap();
        let layout = VaultLayout::new(dir.path());
        layout.initialize().unwrap();

        fs::write(dir.path().join("index.enc"), b"index").unwrap();
        fs::write(dir.path().join("bbbb2222.enc"), b"b").unwrap();
        fs::write(dir.path().join("aaaa1111.enc"), b"a").unwrap();
        fs::write(dir.path().join("notes.txt"), b"not a blob").unwrap();

        let blobs = layout.list_blobs().unwrap();
        let names: Vec<_> = blobs
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(names, vec!["aaaa1111.enc", "bbbb2222.enc"]);
    }

    #[test]
    fn test_list_blobs_missing_directory_is_empty() {
        let dir = tempdir().unwrap();
        let layout = VaultLayout::new(dir.path().join("missing"));

        assert!(layout.list_blobs().unwrap().is_empty());
    }
}
