//! Authenticated encryption using ChaCha20-Poly1305.
//!
//! ChaCha20-Poly1305 provides both confidentiality and authenticity with a
//! 12-byte nonce. The nonce travels in the container header rather than
//! prepended to the ciphertext; random generation is safe here because
//! every blob is encrypted under its own HKDF-derived key.

use chacha20poly1305::{
    aead::{generic_array::GenericArray, Aead, KeyInit},
    ChaCha20Poly1305,
};

use crate::keys::{Nonce, KEY_LENGTH, NONCE_LENGTH};
use inkvault_common::{Error, Result, SecretBytes};

/// Authentication tag size appended to every ciphertext (16 bytes).
pub const TAG_LENGTH: usize = 16;

/// Name of the AEAD algorithm, as recorded in container headers.
pub const CIPHER_ALGORITHM: &str = "chacha20-poly1305";

/// Encrypt plaintext using ChaCha20-Poly1305.
///
/// # Preconditions
/// - `key` must be exactly KEY_LENGTH bytes
/// - `nonce`, when supplied, must be exactly NONCE_LENGTH bytes and unique
///   for this key
///
/// # Postconditions
/// - Returns `(ciphertext || tag, nonce_used)`
/// - A fresh random nonce is generated when none is supplied
///
/// # Errors
/// - [`Error::InvalidKeyLength`] if the key size is wrong
/// - [`Error::InvalidNonceLength`] if a supplied nonce size is wrong
///
/// # Security
/// - The caller is responsible for nonce uniqueness when supplying one
/// - Poly1305 authenticates the ciphertext
pub fn encrypt(key: &[u8], plaintext: &[u8], nonce: Option<&[u8]>) -> Result<(Vec<u8>, Nonce)> {
    if key.len() != KEY_LENGTH {
        return Err(Error::InvalidKeyLength {
            expected: KEY_LENGTH,
            actual: key.len(),
        });
    }

    let nonce = match nonce {
        Some(bytes) => {
            let array: [u8; NONCE_LENGTH] =
                bytes.try_into().map_err(|_| Error::InvalidNonceLength {
                    expected: NONCE_LENGTH,
                    actual: bytes.len(),
                })?;
            Nonce::from_bytes(array)
        }
        None => Nonce::generate(),
    };

    let cipher = ChaCha20Poly1305::new(GenericArray::from_slice(key));
    let ciphertext = cipher
        .encrypt(GenericArray::from_slice(nonce.as_bytes()), plaintext)
        .map_err(|e| Error::Crypto(format!("Encryption failed: {}", e)))?;

    Ok((ciphertext, nonce))
}

/// Decrypt ciphertext using ChaCha20-Poly1305.
///
/// # Preconditions
/// - `key` must be exactly KEY_LENGTH bytes
/// - `nonce` must be exactly NONCE_LENGTH bytes
/// - `ciphertext` must include the trailing authentication tag
///
/// # Postconditions
/// - Returns the original plaintext, zeroized on drop
/// - The authentication tag is verified before any plaintext is returned
///
/// # Errors
/// - [`Error::InvalidKeyLength`] / [`Error::InvalidNonceLength`] on size
///   mismatch
/// - [`Error::AuthenticationFailure`] on any tag mismatch; a wrong key and
///   tampered data are deliberately indistinguishable
pub fn decrypt(key: &[u8], ciphertext: &[u8], nonce: &[u8]) -> Result<SecretBytes> {
    if key.len() != KEY_LENGTH {
        return Err(Error::InvalidKeyLength {
            expected: KEY_LENGTH,
            actual: key.len(),
        });
    }

    if nonce.len() != NONCE_LENGTH {
        return Err(Error::InvalidNonceLength {
            expected: NONCE_LENGTH,
            actual: nonce.len(),
        });
    }

    let cipher = ChaCha20Poly1305::new(GenericArray::from_slice(key));
    let plaintext = cipher
        .decrypt(GenericArray::from_slice(nonce), ciphertext)
        .map_err(|_| Error::AuthenticationFailure)?;

    Ok(SecretBytes::new(plaintext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = [42u8; KEY_LENGTH];
        let plaintext = b"Hello, World!";

        let (ciphertext, nonce) = encrypt(&key, plaintext, None).unwrap();
        let decrypted = decrypt(&key, &ciphertext, nonce.as_bytes()).unwrap();

        assert_eq!(decrypted.as_bytes(), plaintext);
    }

    #[test]
    fn test_ciphertext_size() {
        let key = [42u8; KEY_LENGTH];
        let plaintext = b"Test message";

        let (ciphertext, _) = encrypt(&key, plaintext, None).unwrap();

        // Size should be plaintext + tag
        assert_eq!(ciphertext.len(), plaintext.len() + TAG_LENGTH);
    }

    #[test]
    fn test_fresh_nonce_each_time() {
        let key = [42u8; KEY_LENGTH];
        let plaintext = b"Same plaintext";

        let (ct1, nonce1) = encrypt(&key, plaintext, None).unwrap();
        let (ct2, nonce2) = encrypt(&key, plaintext, None).unwrap();

        assert_ne!(nonce1, nonce2);
        assert_ne!(ct1, ct2);
    }

    #[test]
    fn test_explicit_nonce_deterministic() {
        let key = [42u8; KEY_LENGTH];
        let nonce = [1u8; NONCE_LENGTH];
        let plaintext = b"Deterministic";

        let (ct1, used1) = encrypt(&key, plaintext, Some(&nonce)).unwrap();
        let (ct2, used2) = encrypt(&key, plaintext, Some(&nonce)).unwrap();

        assert_eq!(used1.as_bytes(), &nonce);
        assert_eq!(used2.as_bytes(), &nonce);
        assert_eq!(ct1, ct2);

        let decrypted = decrypt(&key, &ct1, &nonce).unwrap();
        assert_eq!(decrypted.as_bytes(), plaintext);
    }

    #[test]
    fn test_wrong_key_fails_authentication() {
        let key1 = [1u8; KEY_LENGTH];
        let key2 = [2u8; KEY_LENGTH];
        let plaintext = b"Secret data";

        let (ciphertext, nonce) = encrypt(&key1, plaintext, None).unwrap();
        let result = decrypt(&key2, &ciphertext, nonce.as_bytes());

        assert!(matches!(result, Err(Error::AuthenticationFailure)));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let key = [42u8; KEY_LENGTH];
        let plaintext = b"Important data";

        let (mut ciphertext, nonce) = encrypt(&key, plaintext, None).unwrap();
        ciphertext[5] ^= 0xFF;

        let result = decrypt(&key, &ciphertext, nonce.as_bytes());
        assert!(matches!(result, Err(Error::AuthenticationFailure)));
    }

    #[test]
    fn test_invalid_key_length() {
        let short_key = [0u8; 16];

        let result = encrypt(&short_key, b"data", None);
        assert!(matches!(
            result,
            Err(Error::InvalidKeyLength {
                expected: KEY_LENGTH,
                actual: 16
            })
        ));
    }

    #[test]
    fn test_invalid_nonce_length() {
        let key = [0u8; KEY_LENGTH];
        let bad_nonce = [0u8; 8];

        let result = encrypt(&key, b"data", Some(&bad_nonce));
        assert!(matches!(
            result,
            Err(Error::InvalidNonceLength {
                expected: NONCE_LENGTH,
                actual: 8
            })
        ));
    }

    #[test]
    fn test_empty_plaintext() {
        let key = [42u8; KEY_LENGTH];

        let (ciphertext, nonce) = encrypt(&key, b"", None).unwrap();
        assert_eq!(ciphertext.len(), TAG_LENGTH);

        let decrypted = decrypt(&key, &ciphertext, nonce.as_bytes()).unwrap();
        assert!(decrypted.is_empty());
    }

    proptest! {
        #[test]
        fn prop_roundtrip_arbitrary_plaintext(
            plaintext in proptest::collection::vec(any::<u8>(), 0..2048),
            key in any::<[u8; KEY_LENGTH]>(),
        ) {
            let (ciphertext, nonce) = encrypt(&key, &plaintext, None).unwrap();
            let decrypted = decrypt(&key, &ciphertext, nonce.as_bytes()).unwrap();
            prop_assert_eq!(decrypted.as_bytes(), &plaintext[..]);
        }
    }
}
