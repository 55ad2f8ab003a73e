//! Finding vaults on disk.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use inkvault_common::Result;

use crate::layout::{INDEX_FILENAME, VAULT_MARKER};

/// Whether `path` is a directory holding both the ID marker and an
/// encrypted index.
pub fn is_valid_vault(path: &Path) -> bool {
    path.is_dir() && path.join(VAULT_MARKER).is_file() && path.join(INDEX_FILENAME).is_file()
}

/// Recursively scan `root` for vaults.
///
/// Returns the sorted paths of every valid vault found. Unreadable
/// directories are skipped. Vault directories are not descended into;
/// a vault never contains another vault.
pub fn discover_vaults(root: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    if root.is_dir() {
        walk(root, &mut found);
    }
    found.sort();

    debug!(root = %root.display(), count = found.len(), "Vault scan complete");
    Ok(found)
}

fn walk(dir: &Path, found: &mut Vec<PathBuf>) {
    if is_valid_vault(dir) {
        found.push(dir.to_path_buf());
        return;
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return,
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            walk(&path, found);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::VaultLayout;
    use inkvault_crypto::{derive_vault_key, MasterKey, Salt};
    use inkvault_crypto::keys::KEY_LENGTH;
    use inkvault_common::NodeId;
    use crate::index::{NodeKind, VaultIndex};

    fn make_vault(path: &Path) {
        let layout = VaultLayout::new(path);
        let vault_id = layout.initialize().unwrap();

        let master_key = MasterKey::from_bytes([7u8; KEY_LENGTH]);
        let vault_key = derive_vault_key(&master_key, &vault_id);

        let mut index = VaultIndex::new(vault_id);
        index
            .add_node("vault", NodeKind::Folder, None, Some(NodeId::root()))
            .unwrap();
        index
            .save(&layout, &vault_key, &Salt::from_bytes([3u8; 16]))
            .unwrap();
    }

    #[test]
    fn test_is_valid_vault() {
        let dir = tempfile::tempdir().unwrap();
        let vault = dir.path().join("v");
        make_vault(&vault);

        assert!(is_valid_vault(&vault));
        assert!(!is_valid_vault(dir.path()));
        assert!(!is_valid_vault(&dir.path().join("missing")));
    }

    #[test]
    fn test_marker_alone_is_not_a_vault() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(VAULT_MARKER), b"someid").unwrap();

        assert!(!is_valid_vault(dir.path()));
    }

    #[test]
    fn test_discover_vaults_nested() {
        let dir = tempfile::tempdir().unwrap();
        make_vault(&dir.path().join("b"));
        make_vault(&dir.path().join("sub").join("a"));
        fs::create_dir_all(dir.path().join("not-a-vault")).unwrap();

        let found = discover_vaults(dir.path()).unwrap();

        assert_eq!(
            found,
            vec![dir.path().join("b"), dir.path().join("sub").join("a")]
        );
    }

    #[test]
    fn test_discover_vaults_empty_root() {
        let dir = tempfile::tempdir().unwrap();

        let found = discover_vaults(&dir.path().join("nope")).unwrap();
        assert!(found.is_empty());
    }
}
