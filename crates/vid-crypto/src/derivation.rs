//! # Hierarchical Key Derivation
//!
//! BIP32 secp256k1 derivation from a BIP39 seed, so a mnemonic phrase is
//! enough to rebuild a client's keys. The wallet layout uses one branch per
//! key role under `m/44'/0'/0'/0`:
//!
//! | Role | Path |
//! |---|---|
//! | sign | `m/44'/0'/0'/0/10` |
//! | update | `m/44'/0'/0'/0/20` |
//! | recovery | `m/44'/0'/0'/0/30` |
//! | encryption | `m/44'/0'/0'/0/40` |
//!
//! Only private derivation is implemented. Extended keys are never
//! serialized; the chain code is zeroized with the key.

use std::str::FromStr;

use k256::elliptic_curve::PrimeField;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::CryptoError;
use crate::keyed::hmac_sha512;
use crate::secp256k1::{KeyPair, SecretKey};

/// Signing key branch.
pub const SIGN_DERIVATION_PATH: &str = "m/44'/0'/0'/0/10";
/// Update key branch.
pub const UPDATE_DERIVATION_PATH: &str = "m/44'/0'/0'/0/20";
/// Recovery key branch.
pub const RECOVERY_DERIVATION_PATH: &str = "m/44'/0'/0'/0/30";
/// Encryption key branch.
pub const ENCRYPTION_DERIVATION_PATH: &str = "m/44'/0'/0'/0/40";

const HARDENED: u32 = 1 << 31;
const MASTER_HMAC_KEY: &[u8] = b"Bitcoin seed";

// ─── Paths ───────────────────────────────────────────────────────────

/// A parsed derivation path such as `m/44'/0'/0'/0/10`.
///
/// Hardened components are written with `'` or `h`. Serializes as the
/// textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DerivationPath(Vec<u32>);

impl DerivationPath {
    /// The signing branch.
    pub fn sign() -> Self {
        Self(vec![44 | HARDENED, HARDENED, HARDENED, 0, 10])
    }

    /// Child indices, hardened bit included.
    pub fn indices(&self) -> &[u32] {
        &self.0
    }
}

impl Default for DerivationPath {
    fn default() -> Self {
        Self::sign()
    }
}

impl FromStr for DerivationPath {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |why: String| CryptoError::InvalidArgument(format!("derivation path {s:?}: {why}"));
        let mut parts = s.split('/');
        if parts.next() != Some("m") {
            return Err(invalid("must start with \"m\"".into()));
        }
        let mut indices = Vec::new();
        for part in parts {
            let (digits, hardened) = match part.strip_suffix('\'').or_else(|| part.strip_suffix('h')) {
                Some(digits) => (digits, true),
                None => (part, false),
            };
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid(format!("component {part:?} is not an index")));
            }
            let index: u32 = digits
                .parse()
                .map_err(|_| invalid(format!("component {part:?} is out of range")))?;
            if index >= HARDENED {
                return Err(invalid(format!("component {part:?} is out of range")));
            }
            indices.push(if hardened { index | HARDENED } else { index });
        }
        Ok(Self(indices))
    }
}

impl TryFrom<String> for DerivationPath {
    type Error = CryptoError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<DerivationPath> for String {
    fn from(path: DerivationPath) -> String {
        path.to_string()
    }
}

impl std::fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("m")?;
        for index in &self.0 {
            if index & HARDENED != 0 {
                write!(f, "/{}'", index & !HARDENED)?;
            } else {
                write!(f, "/{index}")?;
            }
        }
        Ok(())
    }
}

// ─── Derivation ──────────────────────────────────────────────────────

struct ExtendedSecret {
    key: SecretKey,
    chain_code: Zeroizing<[u8; 32]>,
}

impl ExtendedSecret {
    fn from_hmac(output: &[u8; 64]) -> Result<Self, CryptoError> {
        let key = SecretKey::from_bytes(&output[..32])?;
        let mut chain_code = Zeroizing::new([0u8; 32]);
        chain_code.copy_from_slice(&output[32..]);
        Ok(Self { key, chain_code })
    }

    fn master(seed: &[u8]) -> Result<Self, CryptoError> {
        if !(16..=64).contains(&seed.len()) {
            return Err(CryptoError::InvalidArgument(format!(
                "seed must be 16 to 64 bytes, got {}",
                seed.len()
            )));
        }
        let output = Zeroizing::new(hmac_sha512(MASTER_HMAC_KEY, seed)?);
        Self::from_hmac(&output)
    }

    fn child(&self, index: u32) -> Result<Self, CryptoError> {
        let mut data = Zeroizing::new(Vec::with_capacity(37));
        if index & HARDENED != 0 {
            data.push(0);
            data.extend_from_slice(self.key.as_bytes());
        } else {
            data.extend_from_slice(self.key.public_key()?.as_bytes());
        }
        data.extend_from_slice(&index.to_be_bytes());
        let output = Zeroizing::new(hmac_sha512(self.chain_code.as_ref(), &data)?);

        let unusable = || CryptoError::KeyDerivation(format!("child {index} is not a valid key; use the next index"));
        let tweak = Option::<k256::Scalar>::from(k256::Scalar::from_repr(*k256::FieldBytes::from_slice(
            &output[..32],
        )))
        .ok_or_else(unusable)?;
        let parent = Option::<k256::Scalar>::from(k256::Scalar::from_repr(*k256::FieldBytes::from_slice(
            self.key.as_bytes(),
        )))
        .ok_or_else(unusable)?;
        let mut child = Zeroizing::new([0u8; 32]);
        child.copy_from_slice(&(tweak + parent).to_repr());
        let key = SecretKey::from_bytes(child.as_ref()).map_err(|_| unusable())?;

        let mut chain_code = Zeroizing::new([0u8; 32]);
        chain_code.copy_from_slice(&output[32..]);
        Ok(Self { key, chain_code })
    }
}

/// Secret key at `path` below the master key of `seed`.
pub fn derive_secret_key(seed: &[u8], path: &DerivationPath) -> Result<SecretKey, CryptoError> {
    let mut node = ExtendedSecret::master(seed)?;
    for &index in path.indices() {
        node = node.child(index)?;
    }
    Ok(node.key)
}

/// Keypair at `path` below the master key of `seed`.
pub fn derive_keypair(seed: &[u8], path: &DerivationPath) -> Result<KeyPair, CryptoError> {
    let secret_key = derive_secret_key(seed, path)?;
    Ok(KeyPair {
        public_key: secret_key.public_key()?,
        secret_key,
    })
}
