//! Secure filesystem primitives for InkVault.
//!
//! This module provides:
//! - Atomic writes, so encrypted artifacts are never observed half-written
//! - Multi-pass secure deletion for scrubbing plaintext workspaces
//! - Chunked SHA-256 hashing for session change detection

pub mod atomic;
pub mod hashing;
pub mod secure_delete;

pub use atomic::atomic_write;
pub use hashing::hash_file;
pub use secure_delete::{secure_delete_directory, secure_delete_file, DEFAULT_PASSES};
