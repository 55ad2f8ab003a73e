//! Vault creation.

use std::fs;
use std::path::PathBuf;

use tracing::info;

use inkvault_common::{Error, NodeId, Result, VaultId};
use inkvault_crypto::{derive_master_key, derive_vault_key};

use crate::index::{validate_name, NodeKind, VaultIndex};
use crate::layout::VaultLayout;

/// Creates vaults on disk.
pub struct VaultManager;

impl VaultManager {
    pub fn new() -> Self {
        Self
    }

    /// Create a new vault at `path`.
    ///
    /// # Preconditions
    /// - Password and name must not be empty
    /// - `path` must not exist, or must be an empty directory
    ///
    /// # Postconditions
    /// - The directory holds the plaintext ID marker and an encrypted
    ///   index whose single node is the root folder, named after the vault
    /// - On failure after the marker was written, the marker and any
    ///   partial index are removed again, so the directory is never
    ///   mistaken for a vault
    ///
    /// # Errors
    /// - [`Error::InvalidInput`] on an empty password or an invalid name
    /// - [`Error::DirectoryNotEmpty`] if the target exists and has entries
    pub fn create_vault(
        &self,
        path: impl Into<PathBuf>,
        password: &[u8],
        name: &str,
    ) -> Result<VaultId> {
        if password.is_empty() {
            return Err(Error::InvalidInput("Password cannot be empty".to_string()));
        }
        validate_name(name)?;

        let layout = VaultLayout::new(path);
        let vault_id = layout.initialize()?;

        match Self::write_initial_index(&layout, &vault_id, password, name) {
            Ok(()) => {
                info!(
                    vault_id = %vault_id,
                    path = %layout.root().display(),
                    "Vault created"
                );
                Ok(vault_id)
            }
            Err(e) => {
                let _ = fs::remove_file(layout.marker_path());
                let _ = fs::remove_file(layout.index_path());
                Err(e)
            }
        }
    }

    fn write_initial_index(
        layout: &VaultLayout,
        vault_id: &VaultId,
        password: &[u8],
        name: &str,
    ) -> Result<()> {
        let (master_key, salt) = derive_master_key(password, None)?;
        let vault_key = derive_vault_key(&master_key, vault_id);

        let mut index = VaultIndex::new(vault_id.clone());
        index.add_node(name, NodeKind::Folder, None, Some(NodeId::root()))?;
        index.save(layout, &vault_key, &salt)
    }
}

impl Default for VaultManager {
    fn default() -> Self {
        Self::new()
    }
}
