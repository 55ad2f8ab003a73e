//! Common types used throughout InkVault.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use zeroize::Zeroize;

/// Number of hex characters in a generated node ID.
const NODE_ID_LENGTH: usize = 8;

/// Unique identifier for a vault.
///
/// Generated once at vault creation and stored in the vault marker file. The
/// ID doubles as key-derivation context, so it must never change over the
/// lifetime of a vault.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VaultId(String);

impl VaultId {
    /// Create a VaultId from an existing string.
    ///
    /// # Preconditions
    /// - `id` must be non-empty
    ///
    /// # Errors
    /// - Returns error if id is empty
    pub fn new(id: impl Into<String>) -> crate::Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(crate::Error::InvalidInput(
                "VaultId cannot be empty".to_string(),
            ));
        }
        Ok(Self(id))
    }

    /// Generate a fresh random vault ID.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Raw bytes of the ID, for use as key-derivation context.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for VaultId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a node in the vault index.
///
/// The root folder always has the sentinel ID `root`; every other node gets
/// a short random hex ID at creation. Node IDs appear verbatim in encrypted
/// blob filenames, so they are restricted to filesystem-safe characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(String);

impl NodeId {
    /// Sentinel ID of the root folder.
    pub const ROOT: &'static str = "root";

    /// Create a NodeId from an existing string.
    ///
    /// # Preconditions
    /// - `id` must be non-empty
    /// - `id` must contain only ASCII alphanumerics, `-`, or `_`
    ///
    /// # Errors
    /// - Returns error if id is empty or contains unsafe characters
    pub fn new(id: impl Into<String>) -> crate::Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(crate::Error::InvalidInput(
                "NodeId cannot be empty".to_string(),
            ));
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(crate::Error::InvalidInput(format!(
                "NodeId contains unsafe characters: {id:?}"
            )));
        }
        Ok(Self(id))
    }

    /// The sentinel ID of the root folder.
    pub fn root() -> Self {
        Self(Self::ROOT.to_string())
    }

    /// Generate a fresh random node ID.
    pub fn generate() -> Self {
        let hex = Uuid::new_v4().simple().to_string();
        Self(hex[..NODE_ID_LENGTH].to_string())
    }

    /// Whether this is the root sentinel.
    pub fn is_root(&self) -> bool {
        self.0 == Self::ROOT
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sensitive data wrapper that zeroizes on drop.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SecretBytes(Vec<u8>);

impl SecretBytes {
    /// Create new secret bytes.
    pub fn new(data: Vec<u8>) -> Self {
        Self(data)
    }

    /// Get a reference to the inner bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Get the length.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for SecretBytes {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretBytes([REDACTED; {} bytes])", self.0.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vault_id_creation() {
        let id = VaultId::new("test-vault").unwrap();
        assert_eq!(id.as_str(), "test-vault");
    }

    #[test]
    fn test_vault_id_empty_fails() {
        assert!(VaultId::new("").is_err());
    }

    #[test]
    fn test_vault_id_generate_unique() {
        let a = VaultId::generate();
        let b = VaultId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 32);
    }

    #[test]
    fn test_node_id_root_sentinel() {
        let root = NodeId::root();
        assert!(root.is_root());
        assert_eq!(root.as_str(), "root");
    }

    #[test]
    fn test_node_id_generate_short_hex() {
        let id = NodeId::generate();
        assert_eq!(id.as_str().len(), 8);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert!(!id.is_root());
    }

    #[test]
    fn test_node_id_rejects_separators() {
        assert!(NodeId::new("../evil").is_err());
        assert!(NodeId::new("a/b").is_err());
        assert!(NodeId::new("").is_err());
    }

    #[test]
    fn test_secret_bytes_debug_redacted() {
        let secret = SecretBytes::new(vec![1, 2, 3]);
        let debug = format!("{secret:?}");
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains('1'));
    }
}
