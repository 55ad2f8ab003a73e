//! Authenticated container format for encrypted files at rest.
//!
//! Every encrypted artifact (note blob or vault index) is stored as:
//!
//! ```text
//! [4-byte big-endian header length][header JSON][ciphertext || tag]
//! ```
//!
//! The header is plaintext JSON describing how the body was sealed: format
//! magic and version, KDF algorithm and parameters, cipher, base64 salt and
//! nonce, the owning node ID, and the content type. Header fields are
//! unauthenticated, so nothing is ever renegotiated from them: a version-1
//! header must advertise exactly the fixed Argon2id and ChaCha20-Poly1305
//! profile, and [`Container::decode`] rejects anything else. Tampering with
//! the body or mismatched keys surface as authentication failures at
//! decrypt time, which happens in a separate step; decoding never decrypts.

use serde::{Deserialize, Serialize};

use crate::aead::CIPHER_ALGORITHM;
use crate::kdf::{KdfParams, KDF_ALGORITHM};
use crate::keys::{Nonce, Salt};
use inkvault_common::{Error, Result};

/// Magic string identifying InkVault containers.
pub const FORMAT_MAGIC: &str = "INKVLT1";

/// Current container format version.
pub const FORMAT_VERSION: u32 = 1;

/// Size of the big-endian header length prefix.
const LENGTH_PREFIX: usize = 4;

/// What kind of plaintext a container body holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// A note's markdown contents.
    File,
    /// The serialized vault index.
    Index,
}

/// Plaintext JSON header describing an encrypted body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerHeader {
    pub magic: String,
    pub version: u32,
    pub kdf: String,
    pub kdf_params: KdfParams,
    pub cipher: String,
    pub salt: Salt,
    pub nonce: Nonce,
    /// ID of the owning node; the vault ID for index containers.
    #[serde(rename = "file_id")]
    pub node_id: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
}

impl ContainerHeader {
    /// Build a header with the current format constants and fixed KDF
    /// parameters.
    pub fn new(
        content_type: ContentType,
        node_id: impl Into<String>,
        salt: Salt,
        nonce: Nonce,
    ) -> Self {
        Self {
            magic: FORMAT_MAGIC.to_string(),
            version: FORMAT_VERSION,
            kdf: KDF_ALGORITHM.to_string(),
            kdf_params: KdfParams::recommended(),
            cipher: CIPHER_ALGORITHM.to_string(),
            salt,
            nonce,
            node_id: node_id.into(),
            content_type,
        }
    }
}

/// A parsed encrypted container: header plus opaque sealed body.
#[derive(Debug, Clone)]
pub struct Container {
    pub header: ContainerHeader,
    pub ciphertext: Vec<u8>,
}

impl Container {
    pub fn new(header: ContainerHeader, ciphertext: Vec<u8>) -> Self {
        Self { header, ciphertext }
    }

    /// Serialize the container to its on-disk byte layout.
    ///
    /// # Errors
    /// - [`Error::Serialization`] if the header cannot be encoded
    pub fn encode(&self) -> Result<Vec<u8>> {
        let header_bytes = serde_json::to_vec(&self.header)
            .map_err(|e| Error::Serialization(format!("Header encoding failed: {}", e)))?;
        let header_len = u32::try_from(header_bytes.len())
            .map_err(|_| Error::Serialization("Header too large".to_string()))?;

        let mut out = Vec::with_capacity(LENGTH_PREFIX + header_bytes.len() + self.ciphertext.len());
        out.extend_from_slice(&header_len.to_be_bytes());
        out.extend_from_slice(&header_bytes);
        out.extend_from_slice(&self.ciphertext);
        Ok(out)
    }

    /// Parse a container from its on-disk byte layout.
    ///
    /// Purely structural: the body is carried through opaque and no key is
    /// involved.
    ///
    /// # Errors
    /// - [`Error::TruncatedInput`] if the data ends before the declared
    ///   header
    /// - [`Error::MalformedHeader`] if the header JSON does not decode, or
    ///   if it advertises a crypto profile other than the fixed one for
    ///   this format version
    /// - [`Error::BadMagic`] if the magic or format version is unrecognized
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < LENGTH_PREFIX {
            return Err(Error::TruncatedInput(
                "Missing header length prefix".to_string(),
            ));
        }

        let mut prefix = [0u8; LENGTH_PREFIX];
        prefix.copy_from_slice(&data[..LENGTH_PREFIX]);
        let header_len = u32::from_be_bytes(prefix) as usize;

        if data.len() - LENGTH_PREFIX < header_len {
            return Err(Error::TruncatedInput(format!(
                "Declared header length {} exceeds available data",
                header_len
            )));
        }

        let header_bytes = &data[LENGTH_PREFIX..LENGTH_PREFIX + header_len];
        let header: ContainerHeader = serde_json::from_slice(header_bytes)
            .map_err(|e| Error::MalformedHeader(format!("Header decoding failed: {}", e)))?;

        if header.magic != FORMAT_MAGIC {
            return Err(Error::BadMagic(format!(
                "Unknown magic {:?}",
                header.magic
            )));
        }
        if header.version != FORMAT_VERSION {
            return Err(Error::BadMagic(format!(
                "Unsupported format version {}",
                header.version
            )));
        }
        if header.kdf != KDF_ALGORITHM || header.cipher != CIPHER_ALGORITHM {
            return Err(Error::MalformedHeader(format!(
                "Unsupported algorithms {:?}/{:?}",
                header.kdf, header.cipher
            )));
        }
        // An unauthenticated header must not pick the KDF cost; anything
        // but the fixed profile is a downgrade attempt or corruption
        if header.kdf_params != KdfParams::recommended() {
            return Err(Error::MalformedHeader(
                "KDF parameters do not match the fixed profile".to_string(),
            ));
        }

        let ciphertext = data[LENGTH_PREFIX + header_len..].to_vec();
        Ok(Self { header, ciphertext })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> ContainerHeader {
        ContainerHeader::new(
            ContentType::File,
            "abcd1234",
            Salt::from_bytes([3u8; 16]),
            Nonce::from_bytes([4u8; 12]),
        )
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let container = Container::new(sample_header(), vec![0xAA; 64]);

        let encoded = container.encode().unwrap();
        let decoded = Container::decode(&encoded).unwrap();

        assert_eq!(decoded.header, container.header);
        assert_eq!(decoded.ciphertext, container.ciphertext);
    }

    #[test]
    fn test_header_wire_field_names() {
        let container = Container::new(sample_header(), Vec::new());
        let encoded = container.encode().unwrap();

        let header_len = u32::from_be_bytes(encoded[..4].try_into().unwrap()) as usize;
        let json: serde_json::Value = serde_json::from_slice(&encoded[4..4 + header_len]).unwrap();

        assert_eq!(json["magic"], "INKVLT1");
        assert_eq!(json["file_id"], "abcd1234");
        assert_eq!(json["type"], "file");
        assert_eq!(json["kdf"], "argon2id");
        assert_eq!(json["cipher"], "chacha20-poly1305");
        assert_eq!(json["kdf_params"]["memory_cost"], 65536);
        assert!(json["salt"].is_string());
        assert!(json["nonce"].is_string());
    }

    #[test]
    fn test_decode_too_short_for_prefix() {
        let result = Container::decode(&[0u8; 3]);
        assert!(matches!(result, Err(Error::TruncatedInput(_))));
    }

    #[test]
    fn test_decode_declared_length_exceeds_data() {
        let mut data = 1000u32.to_be_bytes().to_vec();
        data.extend_from_slice(b"{}");

        let result = Container::decode(&data);
        assert!(matches!(result, Err(Error::TruncatedInput(_))));
    }

    #[test]
    fn test_decode_malformed_header_json() {
        let body = b"not json at all";
        let mut data = (body.len() as u32).to_be_bytes().to_vec();
        data.extend_from_slice(body);

        let result = Container::decode(&data);
        assert!(matches!(result, Err(Error::MalformedHeader(_))));
    }

    #[test]
    fn test_decode_rejects_unknown_magic() {
        let mut header = sample_header();
        header.magic = "NOTVAULT".to_string();
        let encoded = Container::new(header, Vec::new()).encode().unwrap();

        let result = Container::decode(&encoded);
        assert!(matches!(result, Err(Error::BadMagic(_))));
    }

    #[test]
    fn test_decode_rejects_unknown_version() {
        let mut header = sample_header();
        header.version = 99;
        let encoded = Container::new(header, Vec::new()).encode().unwrap();

        let result = Container::decode(&encoded);
        assert!(matches!(result, Err(Error::BadMagic(_))));
    }

    #[test]
    fn test_decode_rejects_foreign_kdf_params() {
        // A header may not weaken (or inflate) the advertised KDF cost
        let mut header = sample_header();
        header.kdf_params.memory_cost = 1024;
        let encoded = Container::new(header, Vec::new()).encode().unwrap();

        let result = Container::decode(&encoded);
        assert!(matches!(result, Err(Error::MalformedHeader(_))));
    }

    #[test]
    fn test_decode_rejects_foreign_cipher() {
        let mut header = sample_header();
        header.cipher = "aes-256-gcm".to_string();
        let encoded = Container::new(header, Vec::new()).encode().unwrap();

        let result = Container::decode(&encoded);
        assert!(matches!(result, Err(Error::MalformedHeader(_))));
    }

    #[test]
    fn test_decode_carries_body_opaque() {
        // Garbage ciphertext must decode fine; authentication is a later,
        // separate step.
        let container = Container::new(sample_header(), b"definitely not ciphertext".to_vec());
        let decoded = Container::decode(&container.encode().unwrap()).unwrap();

        assert_eq!(decoded.ciphertext, b"definitely not ciphertext");
    }

    #[test]
    fn test_index_content_type_serializes_lowercase() {
        let header = ContainerHeader::new(
            ContentType::Index,
            "vaultid00",
            Salt::from_bytes([0u8; 16]),
            Nonce::from_bytes([0u8; 12]),
        );
        let json = serde_json::to_value(&header).unwrap();

        assert_eq!(json["type"], "index");
    }
}
