//! Common error types for InkVault.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::types::NodeId;

/// Top-level error type for InkVault operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid input provided (empty password, bad sizes).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Key has the wrong length for the cipher.
    #[error("Invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// Nonce has the wrong length for the cipher.
    #[error("Invalid nonce length: expected {expected} bytes, got {actual}")]
    InvalidNonceLength { expected: usize, actual: usize },

    /// AEAD tag verification failed. Wrong password and tampered data are
    /// deliberately indistinguishable.
    #[error("Authentication failure: incorrect password or corrupted vault data")]
    AuthenticationFailure,

    /// Container data ends before the declared header/body.
    #[error("Truncated container: {0}")]
    TruncatedInput(String),

    /// Container header could not be decoded.
    #[error("Malformed container header: {0}")]
    MalformedHeader(String),

    /// Container magic or format version is unrecognized.
    #[error("Unrecognized container format: {0}")]
    BadMagic(String),

    /// No vault at the given path.
    #[error("Vault not found at {}", .0.display())]
    VaultNotFound(PathBuf),

    /// Vault creation target already contains files.
    #[error("Directory is not empty: {}", .0.display())]
    DirectoryNotEmpty(PathBuf),

    /// Referenced index node does not exist.
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Referenced parent node does not exist.
    #[error("Parent node not found: {0}")]
    ParentNotFound(NodeId),

    /// Referenced parent node is not a folder.
    #[error("Parent node is not a folder: {0}")]
    ParentNotFolder(NodeId),

    /// Explicitly supplied node ID collides with an existing one.
    #[error("Node ID already exists: {0}")]
    DuplicateId(NodeId),

    /// Sibling with the same name already exists under the parent.
    #[error("Name already exists under parent {parent}: {name:?}")]
    DuplicateName { parent: NodeId, name: String },

    /// Node still has children and cannot be removed.
    #[error("Node has children and cannot be removed: {0}")]
    NodeHasChildren(NodeId),

    /// Decrypted index violates the tree invariants.
    #[error("Corrupt vault index: {0}")]
    CorruptIndex(String),

    /// A workspace note's path is claimed by a folder in the index.
    #[error("Note at {0:?} collides with a folder of the same name; rename the note and lock again")]
    NoteShadowsFolder(String),

    /// Secure deletion could not complete for the listed paths.
    #[error("Secure deletion blocked: {0}")]
    DeletionBlocked(BlockedPaths),

    /// External editor executable was not found.
    #[error("Editor not found at {}", .0.display())]
    EditorNotFound(PathBuf),

    /// Session state machine misuse (e.g. unlock while already unlocked).
    #[error("Session error: {0}")]
    Session(String),

    /// Cryptographic operation failed for an internal reason.
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Paths that a secure-deletion pass could not erase, with the reason each
/// one failed. Carried by [`Error::DeletionBlocked`] so callers can show the
/// user exactly which files are still holding plaintext.
#[derive(Debug, Clone)]
pub struct BlockedPaths {
    entries: Vec<(PathBuf, String)>,
}

impl BlockedPaths {
    pub fn new(entries: Vec<(PathBuf, String)>) -> Self {
        Self { entries }
    }

    /// Paths that remain on disk.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().map(|(path, _)| path.as_path())
    }

    /// Path/reason pairs for detailed reporting.
    pub fn entries(&self) -> &[(PathBuf, String)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for BlockedPaths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} path(s) could not be erased", self.entries.len())?;
        for (path, reason) in self.entries.iter().take(5) {
            write!(f, "; {} ({})", path.display(), reason)?;
        }
        if self.entries.len() > 5 {
            write!(f, "; and {} more", self.entries.len() - 5)?;
        }
        Ok(())
    }
}
