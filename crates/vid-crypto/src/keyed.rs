//! # Keyed Digests
//!
//! HMAC-SHA256 (the engine's `digest` operation) and an HMAC-SHA512 variant.
//!
//! ## Security Invariant
//!
//! Verification compares tags with `subtle::ConstantTimeEq`. A tag of the
//! wrong length compares unequal without short-circuiting on content.

use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha512};
use subtle::ConstantTimeEq;

use crate::error::CryptoError;

type HmacSha256 = Hmac<Sha256>;
type HmacSha512 = Hmac<Sha512>;

/// HMAC-SHA256 tag length.
pub const HMAC_SHA256_LEN: usize = 32;

/// HMAC-SHA512 tag length.
pub const HMAC_SHA512_LEN: usize = 64;

/// HMAC-SHA256 of `content` under `secret`.
pub fn hmac_sha256(secret: &[u8], content: &[u8]) -> Result<[u8; HMAC_SHA256_LEN], CryptoError> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| CryptoError::InvalidArgument(format!("hmac key: {e}")))?;
    mac.update(content);
    let mut out = [0u8; HMAC_SHA256_LEN];
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

/// HMAC-SHA512 of `content` under `secret`.
pub fn hmac_sha512(secret: &[u8], content: &[u8]) -> Result<[u8; HMAC_SHA512_LEN], CryptoError> {
    let mut mac = HmacSha512::new_from_slice(secret)
        .map_err(|e| CryptoError::InvalidArgument(format!("hmac key: {e}")))?;
    mac.update(content);
    let mut out = [0u8; HMAC_SHA512_LEN];
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

/// Constant-time tag comparison.
pub fn tags_equal(expected: &[u8], presented: &[u8]) -> bool {
    expected.ct_eq(presented).into()
}

/// Recompute HMAC-SHA256 and compare against `tag` in constant time.
pub fn verify_hmac_sha256(secret: &[u8], content: &[u8], tag: &[u8]) -> Result<bool, CryptoError> {
    let expected = hmac_sha256(secret, content)?;
    Ok(tags_equal(&expected, tag))
}
