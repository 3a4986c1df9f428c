//! # Multihash
//!
//! Self-describing SHA-256 hashes: one code byte (`0x12`), one length byte
//! (`0x20`), then the 32-byte digest. DID method-specific identifiers are the
//! unpadded base64url form of a multihash over the controller's public key.

use sha2::{Digest, Sha256};

use crate::codec::{base64url_decode_unpadded, base64url_encode_unpadded};
use crate::error::EncodingError;

/// Multihash code for SHA2-256.
pub const SHA2_256_CODE: u8 = 0x12;

/// Digest length for SHA2-256.
pub const SHA2_256_LEN: u8 = 0x20;

/// A decoded SHA2-256 multihash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Multihash {
    digest: [u8; 32],
}

impl Multihash {
    /// Hash `content` with SHA-256.
    pub fn sha256(content: &[u8]) -> Self {
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&Sha256::digest(content));
        Self { digest }
    }

    /// The raw 32-byte digest, without prefix.
    pub fn digest(&self) -> &[u8; 32] {
        &self.digest
    }

    /// Prefix + digest (34 bytes).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(2 + self.digest.len());
        out.push(SHA2_256_CODE);
        out.push(SHA2_256_LEN);
        out.extend_from_slice(&self.digest);
        out
    }

    /// Parse prefixed bytes, checking code and declared length.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EncodingError> {
        let (code, declared, body) = match bytes {
            [code, len, body @ ..] => (*code, usize::from(*len), body),
            _ => {
                return Err(EncodingError::MultihashLength {
                    declared: usize::from(SHA2_256_LEN),
                    actual: bytes.len().saturating_sub(2),
                })
            }
        };
        if code != SHA2_256_CODE {
            return Err(EncodingError::UnsupportedMultihash(code));
        }
        if declared != usize::from(SHA2_256_LEN) || body.len() != declared {
            return Err(EncodingError::MultihashLength {
                declared,
                actual: body.len(),
            });
        }
        let mut digest = [0u8; 32];
        digest.copy_from_slice(body);
        Ok(Self { digest })
    }

    /// Unpadded base64url of the prefixed bytes.
    pub fn encode(&self) -> String {
        base64url_encode_unpadded(&self.to_bytes())
    }

    /// Inverse of [`Multihash::encode`].
    pub fn decode(encoded: &str) -> Result<Self, EncodingError> {
        Self::from_bytes(&base64url_decode_unpadded(encoded)?)
    }

    /// Whether this multihash was computed over `content`.
    pub fn matches(&self, content: &[u8]) -> bool {
        *self == Self::sha256(content)
    }
}

/// Hash `content` and return the encoded multihash string.
pub fn multihash(content: &[u8]) -> String {
    Multihash::sha256(content).encode()
}
