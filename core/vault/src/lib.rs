//! Vault storage for InkVault.
//!
//! This module provides:
//! - On-disk vault layout (ID marker, encrypted index, note blobs)
//! - The encrypted index tree and its invariants
//! - Vault creation
//! - Discovery of vaults under a directory
//!
//! # Architecture
//! Everything here operates on sealed bytes. Plaintext only exists inside
//! the session engine while a vault is unlocked; at rest a vault directory
//! is the marker, `index.enc`, and one opaque blob per note.

pub mod discovery;
pub mod index;
pub mod layout;
pub mod manager;

pub use discovery::{discover_vaults, is_valid_vault};
pub use index::{IndexNode, NodeKind, VaultIndex};
pub use layout::VaultLayout;
pub use manager::VaultManager;
