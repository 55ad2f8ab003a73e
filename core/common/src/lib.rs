//! Common utilities and types shared across InkVault modules.
//!
//! This module provides foundational types that are used throughout the codebase,
//! ensuring consistency and type safety.

pub mod error;
pub mod types;

pub use error::{BlockedPaths, Error, Result};
pub use types::{NodeId, SecretBytes, VaultId};
