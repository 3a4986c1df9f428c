//! # secp256k1 Key Material
//!
//! Typed wrappers for the byte strings that cross handler boundaries.
//!
//! ## Security Invariant
//!
//! - `SecretKey` is zeroized on drop, prints as `SecretKey(<redacted>)`, and
//!   does not implement `Serialize`.
//! - `PublicKey` always holds the 33-byte compressed SEC1 form. Uncompressed
//!   input is validated and compressed on the way in, so two encodings of the
//!   same point compare equal.
//!
//! ## Serde
//!
//! Public keys and signatures serialize as lowercase hex strings.

use k256::elliptic_curve::sec1::ToEncodedPoint;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroizing;

use vid_core::codec::{from_hex, to_hex};
use vid_core::{base64url_decode_unpadded, base64url_encode_unpadded};

use crate::error::CryptoError;

/// Secret scalar length.
pub const SECRET_KEY_LEN: usize = 32;
/// Compressed SEC1 public key length.
pub const COMPRESSED_PUBLIC_KEY_LEN: usize = 33;
/// Uncompressed SEC1 public key length.
pub const UNCOMPRESSED_PUBLIC_KEY_LEN: usize = 65;
/// `r‖s` signature length.
pub const SIGNATURE_LEN: usize = 64;

/// Reject public keys that are neither compressed nor uncompressed SEC1.
pub(crate) fn check_public_key_len(bytes: &[u8]) -> Result<(), CryptoError> {
    match bytes.len() {
        COMPRESSED_PUBLIC_KEY_LEN | UNCOMPRESSED_PUBLIC_KEY_LEN => Ok(()),
        actual => Err(CryptoError::InvalidKeyLength {
            kind: "public key",
            expected: "33 or 65",
            actual,
        }),
    }
}

// ---------------------------------------------------------------------------
// PublicKey
// ---------------------------------------------------------------------------

/// A validated secp256k1 public key in compressed SEC1 form.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; COMPRESSED_PUBLIC_KEY_LEN]);

impl PublicKey {
    /// Parse a compressed or uncompressed SEC1 point.
    pub fn from_sec1_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        check_public_key_len(bytes)?;
        let key = k256::PublicKey::from_sec1_bytes(bytes)
            .map_err(|_| CryptoError::InvalidKey("public key is not a point on secp256k1".into()))?;
        let mut out = [0u8; COMPRESSED_PUBLIC_KEY_LEN];
        out.copy_from_slice(key.to_encoded_point(true).as_bytes());
        Ok(Self(out))
    }

    /// The compressed SEC1 bytes.
    pub fn as_bytes(&self) -> &[u8; COMPRESSED_PUBLIC_KEY_LEN] {
        &self.0
    }

    /// Render as lowercase hex.
    pub fn to_hex(&self) -> String {
        to_hex(&self.0)
    }

    /// Parse hex-encoded SEC1 bytes.
    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        let bytes = from_hex(hex).map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        Self::from_sec1_bytes(&bytes)
    }

    /// Affine coordinates as unpadded base64url, for `publicKeyJwk`.
    pub fn jwk_coordinates(&self) -> Result<(String, String), CryptoError> {
        let key = k256::PublicKey::from_sec1_bytes(&self.0)
            .map_err(|_| CryptoError::InvalidKey("stored public key no longer decodes".into()))?;
        let point = key.to_encoded_point(false);
        match (point.x(), point.y()) {
            (Some(x), Some(y)) => Ok((base64url_encode_unpadded(x), base64url_encode_unpadded(y))),
            _ => Err(CryptoError::InvalidKey("public key is the identity point".into())),
        }
    }

    /// Rebuild from `publicKeyJwk` coordinates.
    pub fn from_jwk_coordinates(x: &str, y: &str) -> Result<Self, CryptoError> {
        let decode = |c: &str| {
            base64url_decode_unpadded(c).map_err(|e| CryptoError::InvalidKey(format!("jwk coordinate: {e}")))
        };
        let (x, y) = (decode(x)?, decode(y)?);
        if x.len() != 32 || y.len() != 32 {
            return Err(CryptoError::InvalidKey(format!(
                "jwk coordinates must be 32 bytes each, got {} and {}",
                x.len(),
                y.len()
            )));
        }
        let mut sec1 = Vec::with_capacity(UNCOMPRESSED_PUBLIC_KEY_LEN);
        sec1.push(0x04);
        sec1.extend_from_slice(&x);
        sec1.extend_from_slice(&y);
        Self::from_sec1_bytes(&sec1)
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublicKey({}...)", to_hex(&self.0[..6]))
    }
}

impl std::fmt::Display for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// SecretKey
// ---------------------------------------------------------------------------

/// A secp256k1 secret scalar. Zeroized on drop.
#[derive(Clone)]
pub struct SecretKey(Zeroizing<[u8; SECRET_KEY_LEN]>);

impl SecretKey {
    /// Validate a 32-byte scalar (non-zero, below the group order).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != SECRET_KEY_LEN {
            return Err(CryptoError::InvalidKeyLength {
                kind: "secret key",
                expected: "32",
                actual: bytes.len(),
            });
        }
        k256::SecretKey::from_slice(bytes)
            .map_err(|_| CryptoError::InvalidKey("secret scalar out of range".into()))?;
        let mut out = Zeroizing::new([0u8; SECRET_KEY_LEN]);
        out.copy_from_slice(bytes);
        Ok(Self(out))
    }

    /// Parse hex. The intermediate buffer is zeroized.
    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        let bytes = Zeroizing::new(from_hex(hex).map_err(|e| CryptoError::InvalidKey(e.to_string()))?);
        Self::from_bytes(&bytes)
    }

    /// The raw scalar. Callers must not persist it.
    pub fn as_bytes(&self) -> &[u8; SECRET_KEY_LEN] {
        &self.0
    }

    /// Hex rendering for explicit export (CLI `keygen`).
    pub fn expose_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(to_hex(self.0.as_ref()))
    }

    /// Public key for this scalar.
    pub fn public_key(&self) -> Result<PublicKey, CryptoError> {
        let secret = k256::SecretKey::from_slice(self.0.as_ref())
            .map_err(|_| CryptoError::InvalidKey("secret scalar out of range".into()))?;
        PublicKey::from_sec1_bytes(secret.public_key().to_encoded_point(true).as_bytes())
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretKey(<redacted>)")
    }
}

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

/// A 64-byte `r‖s` ECDSA signature.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Signature([u8; SIGNATURE_LEN]);

impl Signature {
    /// Wrap exactly 64 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; SIGNATURE_LEN] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidSignatureLength(bytes.len()))?;
        Ok(Self(arr))
    }

    /// The raw bytes.
    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }

    /// Render as lowercase hex.
    pub fn to_hex(&self) -> String {
        to_hex(&self.0)
    }

    /// Parse a 128-character hex string.
    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        let bytes = from_hex(hex).map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Unpadded base64url, the `proofValue` encoding.
    pub fn to_base64url(&self) -> String {
        base64url_encode_unpadded(&self.0)
    }

    /// Parse a `proofValue`.
    pub fn from_base64url(s: &str) -> Result<Self, CryptoError> {
        let bytes = base64url_decode_unpadded(s)
            .map_err(|e| CryptoError::InvalidKey(format!("signature encoding: {e}")))?;
        Self::from_bytes(&bytes)
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Signature({}...)", to_hex(&self.0[..6]))
    }
}

// ---------------------------------------------------------------------------
// KeyPair
// ---------------------------------------------------------------------------

/// Public and secret key produced together.
#[derive(Clone)]
pub struct KeyPair {
    /// Public half.
    pub public_key: PublicKey,
    /// Secret half.
    pub secret_key: SecretKey,
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key)
            .field("secret_key", &self.secret_key)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Generator point G, compressed and uncompressed.
    const G_COMPRESSED: &str = "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";
    const G_UNCOMPRESSED: &str = "0479be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798483ada7726a3c4655da4fbfc0e1108a8fd17b448a68554199c47d08ffb10d4b8";

    fn one() -> SecretKey {
        let mut bytes = [0u8; 32];
        bytes[31] = 1;
        SecretKey::from_bytes(&bytes).unwrap()
    }

    #[test]
    fn test_uncompressed_input_is_compressed() {
        let a = PublicKey::from_hex(G_COMPRESSED).unwrap();
        let b = PublicKey::from_hex(G_UNCOMPRESSED).unwrap();
        assert_eq!(a, b);
        assert_eq!(b.to_hex(), G_COMPRESSED);
    }

    #[test]
    fn test_secret_one_maps_to_generator() {
        assert_eq!(one().public_key().unwrap().to_hex(), G_COMPRESSED);
    }

    #[test]
    fn test_jwk_coordinates_round_trip() {
        let pk = PublicKey::from_hex(G_COMPRESSED).unwrap();
        let (x, y) = pk.jwk_coordinates().unwrap();
        assert_eq!(x.len(), 43);
        assert_eq!(PublicKey::from_jwk_coordinates(&x, &y).unwrap(), pk);
    }

    #[test]
    fn test_public_key_rejections() {
        assert!(matches!(
            PublicKey::from_sec1_bytes(&[2u8; 32]),
            Err(CryptoError::InvalidKeyLength { actual: 32, .. })
        ));
        let mut off_curve = [0u8; 33];
        off_curve[0] = 0x05;
        assert!(matches!(
            PublicKey::from_sec1_bytes(&off_curve),
            Err(CryptoError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_secret_key_rejections() {
        assert!(SecretKey::from_bytes(&[0u8; 32]).is_err());
        assert!(SecretKey::from_bytes(&[0xffu8; 32]).is_err());
        assert!(SecretKey::from_bytes(&[1u8; 16]).is_err());
    }

    #[test]
    fn test_secret_key_debug_is_redacted() {
        let rendered = format!("{:?}", one());
        assert_eq!(rendered, "SecretKey(<redacted>)");
    }

    #[test]
    fn test_signature_encodings() {
        let sig = Signature::from_bytes(&[0xab; 64]).unwrap();
        assert_eq!(Signature::from_base64url(&sig.to_base64url()).unwrap(), sig);
        assert_eq!(Signature::from_hex(&sig.to_hex()).unwrap(), sig);
        assert!(matches!(
            Signature::from_bytes(&[0u8; 65]),
            Err(CryptoError::InvalidSignatureLength(65))
        ));
        let json = serde_json::to_string(&sig).unwrap();
        assert_eq!(serde_json::from_str::<Signature>(&json).unwrap(), sig);
    }
}
