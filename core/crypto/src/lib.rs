//! Cryptographic primitives for InkVault.
//!
//! This module provides:
//! - Key derivation using Argon2id
//! - Key-hierarchy derivation using HKDF-SHA256
//! - Authenticated encryption using ChaCha20-Poly1305
//! - The authenticated container format for encrypted files at rest
//! - Secure key management with automatic zeroization
//!
//! # Security Guarantees
//! - All key material is automatically zeroized on drop
//! - No plaintext or key material is ever logged
//! - Constant-time operations for sensitive comparisons

pub mod aead;
pub mod container;
pub mod hierarchy;
pub mod kdf;
pub mod keys;

pub use aead::{decrypt, encrypt};
pub use container::{Container, ContainerHeader, ContentType, FORMAT_MAGIC, FORMAT_VERSION};
pub use hierarchy::{derive_file_key, derive_vault_key};
pub use kdf::{derive_key, derive_master_key, verify_password, KdfParams};
pub use keys::{FileKey, MasterKey, Nonce, Salt, VaultKey};
