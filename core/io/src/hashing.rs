//! Content hashing for change detection.
//!
//! The session records a SHA-256 baseline for every materialized note and
//! compares against it at lock time to decide which blobs to re-encrypt.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use inkvault_common::Result;

const CHUNK_SIZE: usize = 8192;

/// SHA-256 of a file's contents as lowercase hex.
///
/// Reads in fixed-size chunks, so large notes do not need to fit in memory
/// twice.
///
/// # Errors
/// - [`inkvault_common::Error::Io`] if the file cannot be read
pub fn hash_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; CHUNK_SIZE];

    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}
