//! HKDF-based key hierarchy.
//!
//! The master key derived from the password never encrypts anything
//! directly. It is expanded into a per-vault key, which in turn is expanded
//! into per-file keys:
//!
//! ```text
//! password --Argon2id--> MasterKey --HKDF--> VaultKey --HKDF--> FileKey
//! ```
//!
//! Each derivation salts HKDF-SHA256 with the target's ID and binds a
//! distinct info label, so vault keys and file keys live in separate
//! domains. Derived keys are recomputed on demand and never persisted.

use hkdf::Hkdf;
use sha2::Sha256;

use crate::keys::{FileKey, MasterKey, VaultKey, KEY_LENGTH};
use inkvault_common::{NodeId, VaultId};

/// Info label binding vault-key derivations to their domain.
const INFO_VAULT_KEY: &[u8] = b"inkvault/vault-key/v1";

/// Info label binding file-key derivations to their domain.
const INFO_FILE_KEY: &[u8] = b"inkvault/file-key/v1";

/// Derive the vault-scoped key from the master key and vault ID.
///
/// Deterministic: the same master key and vault ID always yield the same
/// vault key.
pub fn derive_vault_key(master_key: &MasterKey, vault_id: &VaultId) -> VaultKey {
    let hk = Hkdf::<Sha256>::new(Some(vault_id.as_bytes()), master_key.as_bytes());

    let mut okm = [0u8; KEY_LENGTH];
    hk.expand(INFO_VAULT_KEY, &mut okm)
        .expect("32 bytes is a valid HKDF-SHA256 output length");

    VaultKey::from_bytes(okm)
}

/// Derive the key for a single file node from the vault key and node ID.
///
/// Every blob is sealed under its own derived key, so a random nonce per
/// encryption never repeats under the same key in practice.
pub fn derive_file_key(vault_key: &VaultKey, node_id: &NodeId) -> FileKey {
    let hk = Hkdf::<Sha256>::new(Some(node_id.as_str().as_bytes()), vault_key.as_bytes());

    let mut okm = [0u8; KEY_LENGTH];
    hk.expand(INFO_FILE_KEY, &mut okm)
        .expect("32 bytes is a valid HKDF-SHA256 output length");

    FileKey::from_bytes(okm)
}
