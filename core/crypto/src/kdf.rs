//! Key derivation using Argon2id.
//!
//! Argon2id is a memory-hard password hashing function that provides
//! resistance to both GPU and time-memory trade-off attacks. The derived
//! master key is the root of the key hierarchy and never touches disk.

use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::keys::{MasterKey, Salt, KEY_LENGTH};
use inkvault_common::{Error, Result};

/// Name of the KDF algorithm, as recorded in container headers.
pub const KDF_ALGORITHM: &str = "argon2id";

/// Parameters for Argon2id key derivation.
///
/// These are embedded in every container header for informational purposes.
/// The engine always derives with [`KdfParams::recommended`] and never
/// renegotiates parameters from an (unauthenticated) header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB (e.g., 65536 = 64 MiB).
    pub memory_cost: u32,
    /// Number of iterations.
    pub time_cost: u32,
    /// Degree of parallelism.
    pub parallelism: u32,
}

impl KdfParams {
    /// The fixed parameters used for all vault operations.
    ///
    /// 64 MiB of memory, 3 iterations, 4 lanes. Targets roughly half a
    /// second of derivation time on commodity hardware.
    pub fn recommended() -> Self {
        Self {
            memory_cost: 65536, // 64 MiB
            time_cost: 3,
            parallelism: 4,
        }
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::recommended()
    }
}

/// Derive a key from a password and salt using Argon2id.
///
/// # Preconditions
/// - `password` must not be empty
/// - `params` must have valid Argon2id parameters
///
/// # Postconditions
/// - Returns a MasterKey derived from the password
/// - The derived key is deterministic given the same inputs
///
/// # Errors
/// - Returns error if password is empty
/// - Returns error if Argon2id parameters are invalid
///
/// # Security
/// - Password is not stored or logged
/// - The derived key is zeroized on drop
pub fn derive_key(password: &[u8], salt: &Salt, params: &KdfParams) -> Result<MasterKey> {
    if password.is_empty() {
        return Err(Error::InvalidInput("Password cannot be empty".to_string()));
    }

    let argon2_params = Params::new(
        params.memory_cost,
        params.time_cost,
        params.parallelism,
        Some(KEY_LENGTH),
    )
    .map_err(|e| Error::Crypto(format!("Invalid KDF parameters: {}", e)))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut key_bytes = [0u8; KEY_LENGTH];
    argon2
        .hash_password_into(password, salt.as_bytes(), &mut key_bytes)
        .map_err(|e| Error::Crypto(format!("Key derivation failed: {}", e)))?;

    Ok(MasterKey::from_bytes(key_bytes))
}

/// Derive the master key with the fixed recommended parameters.
///
/// Generates a fresh random salt when none is supplied (vault creation);
/// callers unlocking an existing vault pass the salt recorded in the index
/// container header.
///
/// # Errors
/// - Returns error if password is empty
pub fn derive_master_key(password: &[u8], salt: Option<&Salt>) -> Result<(MasterKey, Salt)> {
    let salt = match salt {
        Some(salt) => salt.clone(),
        None => Salt::generate(),
    };
    let key = derive_key(password, &salt, &KdfParams::recommended())?;
    Ok((key, salt))
}

/// Verify that a password produces the expected key.
///
/// Comparison is constant-time. Any internal derivation failure collapses
/// to `false` rather than leaking a distinguishable error.
pub fn verify_password(
    password: &[u8],
    salt: &Salt,
    params: &KdfParams,
    expected: &MasterKey,
) -> bool {
    match derive_key(password, salt, params) {
        Ok(derived) => bool::from(derived.as_bytes().ct_eq(expected.as_bytes())),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Cheap parameters so tests do not spend seconds in Argon2.
    fn test_params() -> KdfParams {
        KdfParams {
            memory_cost: 1024,
            time_cost: 1,
            parallelism: 1,
        }
    }

    #[test]
    fn test_derive_key_deterministic() {
        let password = b"test-password-123";
        let salt = Salt::from_bytes([42u8; 16]);
        let params = test_params();

        let key1 = derive_key(password, &salt, &params).unwrap();
        let key2 = derive_key(password, &salt, &params).unwrap();

        assert_eq!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_derive_key_different_salt() {
        let password = b"test-password-123";
        let salt1 = Salt::from_bytes([1u8; 16]);
        let salt2 = Salt::from_bytes([2u8; 16]);
        let params = test_params();

        let key1 = derive_key(password, &salt1, &params).unwrap();
        let key2 = derive_key(password, &salt2, &params).unwrap();

        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_derive_key_different_password() {
        let salt = Salt::from_bytes([42u8; 16]);
        let params = test_params();

        let key1 = derive_key(b"password1", &salt, &params).unwrap();
        let key2 = derive_key(b"password2", &salt, &params).unwrap();

        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_derive_key_empty_password_fails() {
        let salt = Salt::generate();
        let params = test_params();

        assert!(derive_key(b"", &salt, &params).is_err());
    }

    #[test]
    fn test_derive_master_key_fresh_salt() {
        let (_, salt1) = derive_master_key(b"pw", None).unwrap();
        let (_, salt2) = derive_master_key(b"pw", None).unwrap();

        assert_ne!(salt1, salt2);
    }

    #[test]
    fn test_derive_master_key_reuses_given_salt() {
        let salt = Salt::from_bytes([9u8; 16]);

        let (key1, out1) = derive_master_key(b"pw", Some(&salt)).unwrap();
        let (key2, out2) = derive_master_key(b"pw", Some(&salt)).unwrap();

        assert_eq!(out1, salt);
        assert_eq!(out2, salt);
        assert_eq!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_verify_password() {
        let password = b"secure-password";
        let salt = Salt::from_bytes([99u8; 16]);
        let params = test_params();

        let key = derive_key(password, &salt, &params).unwrap();
        assert!(verify_password(password, &salt, &params, &key));
        assert!(!verify_password(b"wrong-password", &salt, &params, &key));
    }

    #[test]
    fn test_verify_password_empty_is_false() {
        let salt = Salt::from_bytes([5u8; 16]);
        let params = test_params();
        let key = derive_key(b"real", &salt, &params).unwrap();

        assert!(!verify_password(b"", &salt, &params, &key));
    }
}
