//! # Cipher Core
//!
//! Stable internal API over the capability registry's crypto handlers:
//! keypair generation, signing, verification, symmetric encryption and
//! keyed digests. Every call resolves its handler through the registry, so an
//! injected implementation and the built-in default are indistinguishable to
//! callers.
//!
//! ## Ciphertext Format
//!
//! ```text
//! salt (32) ‖ nonce (12) ‖ AES-256-GCM-SIV ciphertext ‖ tag (16)
//! ```
//!
//! The AES key is derived from the caller's secret with scrypt over the salt.
//! Salt and nonce are fresh for every call, so `decrypt` needs nothing beyond
//! the ciphertext and the secret.
//!
//! ## Security Invariant
//!
//! Handler output is validated before it leaves this module. A handler that
//! returns a signature, key or ciphertext of the wrong shape produces
//! `CryptoError::Handler`, never a partially-valid value.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::capability::{CapabilityRegistry, CapabilitySlot};
use crate::error::CryptoError;
use crate::keyed::{hmac_sha256, tags_equal, HMAC_SHA256_LEN};
use crate::derivation::{derive_keypair, DerivationPath};
use crate::mnemonic::{bip39_mnemonic, mnemonic_to_seed, WordCount};
use crate::random::{random_array, random_bytes};
use crate::secp256k1::{check_public_key_len, KeyPair, PublicKey, SecretKey, Signature, SIGNATURE_LEN};

/// Salt prefix length.
pub const SALT_LEN: usize = 32;
/// AES-GCM-SIV nonce length.
pub const NONCE_LEN: usize = 12;
/// AEAD tag length.
pub const TAG_LEN: usize = 16;
/// Shortest well-formed ciphertext (empty plaintext).
pub const MIN_CIPHERTEXT_LEN: usize = SALT_LEN + NONCE_LEN + TAG_LEN;

/// scrypt cost parameters for secret-to-key derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScryptParams {
    /// log2 of the CPU/memory cost.
    pub log_n: u8,
    /// Block size.
    pub r: u32,
    /// Parallelism.
    pub p: u32,
}

impl Default for ScryptParams {
    fn default() -> Self {
        Self { log_n: 7, r: 8, p: 1 }
    }
}

impl ScryptParams {
    fn to_params(self) -> Result<scrypt::Params, CryptoError> {
        scrypt::Params::new(self.log_n, self.r, self.p, 32)
            .map_err(|e| CryptoError::KeyDerivation(e.to_string()))
    }

    /// Check the parameters without deriving anything.
    pub fn validate(&self) -> Result<(), CryptoError> {
        self.to_params().map(|_| ())
    }
}

/// Cryptographic operations bound to one capability registry.
#[derive(Debug, Clone)]
pub struct Cipher {
    capabilities: Arc<CapabilityRegistry>,
    kdf: ScryptParams,
}

impl Cipher {
    /// Cipher over `capabilities` with the given key-derivation cost.
    pub fn new(capabilities: Arc<CapabilityRegistry>, kdf: ScryptParams) -> Result<Self, CryptoError> {
        kdf.validate()?;
        Ok(Self { capabilities, kdf })
    }

    /// The registry this cipher resolves handlers from.
    pub fn capabilities(&self) -> &Arc<CapabilityRegistry> {
        &self.capabilities
    }

    // ── Keys and signatures ────────────────────────────────────────────

    /// Generate a keypair through the `ecdsa_keypair` capability.
    pub fn keypair_generate(&self) -> Result<KeyPair, CryptoError> {
        let raw = self.capabilities.ecdsa_keypair_generator().generate()?;
        let handler_err = |reason: String| CryptoError::Handler {
            slot: CapabilitySlot::EcdsaKeypair,
            reason,
        };
        let public_key = PublicKey::from_sec1_bytes(&raw.public_key)
            .map_err(|e| handler_err(format!("returned unusable public key: {e}")))?;
        let secret_key = SecretKey::from_bytes(&raw.secret_key)
            .map_err(|e| handler_err(format!("returned unusable secret key: {e}")))?;
        if secret_key.public_key()? != public_key {
            return Err(handler_err("public key does not match secret key".into()));
        }
        Ok(KeyPair {
            public_key,
            secret_key,
        })
    }

    /// Sign `message` through the `ecdsa_sign` capability.
    pub fn sign(&self, message: &[u8], secret_key: &SecretKey) -> Result<Signature, CryptoError> {
        let raw = self
            .capabilities
            .ecdsa_signer()
            .sign(secret_key.as_bytes(), message)?;
        Signature::from_bytes(&raw).map_err(|_| CryptoError::Handler {
            slot: CapabilitySlot::EcdsaSign,
            reason: format!("returned a {}-byte signature", raw.len()),
        })
    }

    /// Verify `signature` over `message` through the `ecdsa_verify` capability.
    ///
    /// `Ok(false)` is the negative result. Errors are reserved for malformed
    /// input: a signature that is not 64 bytes, or a public key that is not
    /// 33/65-byte SEC1 or not on the curve.
    pub fn verify(&self, message: &[u8], signature: &[u8], public_key: &[u8]) -> Result<bool, CryptoError> {
        if signature.len() != SIGNATURE_LEN {
            return Err(CryptoError::InvalidSignatureLength(signature.len()));
        }
        check_public_key_len(public_key)?;
        self.capabilities
            .ecdsa_verifier()
            .verify(public_key, message, signature)
    }

    // ── Symmetric encryption ───────────────────────────────────────────

    /// Encrypt `plaintext` under a key derived from `secret`.
    pub fn encrypt(&self, plaintext: &[u8], secret: &[u8]) -> Result<Vec<u8>, CryptoError> {
        require_secret(secret)?;
        let random = self.capabilities.random_source();
        let salt = random_array::<SALT_LEN>(random.as_ref())?;
        let nonce = random_array::<NONCE_LEN>(random.as_ref())?;
        let key = self.derive_key(secret, &salt[..])?;

        let sealed = self
            .capabilities
            .aes_encryptor()
            .encrypt(&key, &nonce, plaintext)?;
        if sealed.len() != plaintext.len() + TAG_LEN {
            return Err(CryptoError::Handler {
                slot: CapabilitySlot::AesEncrypt,
                reason: format!(
                    "expected {} bytes of output, got {}",
                    plaintext.len() + TAG_LEN,
                    sealed.len()
                ),
            });
        }

        let mut out = Vec::with_capacity(SALT_LEN + NONCE_LEN + sealed.len());
        out.extend_from_slice(&salt[..]);
        out.extend_from_slice(&nonce[..]);
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    /// Reverse [`Self::encrypt`].
    ///
    /// # Errors
    ///
    /// `MalformedCiphertext` when the input is shorter than
    /// [`MIN_CIPHERTEXT_LEN`]; `AuthenticationFailed` on a wrong secret or
    /// any tampering.
    pub fn decrypt(&self, ciphertext: &[u8], secret: &[u8]) -> Result<Vec<u8>, CryptoError> {
        require_secret(secret)?;
        if ciphertext.len() < MIN_CIPHERTEXT_LEN {
            return Err(CryptoError::MalformedCiphertext(format!(
                "{} bytes is shorter than the {MIN_CIPHERTEXT_LEN}-byte minimum",
                ciphertext.len()
            )));
        }
        let (salt, rest) = ciphertext.split_at(SALT_LEN);
        let (nonce, sealed) = rest.split_at(NONCE_LEN);
        let mut nonce_arr = [0u8; NONCE_LEN];
        nonce_arr.copy_from_slice(nonce);
        let key = self.derive_key(secret, salt)?;
        self.capabilities
            .aes_decryptor()
            .decrypt(&key, &nonce_arr, sealed)
    }

    fn derive_key(&self, secret: &[u8], salt: &[u8]) -> Result<Zeroizing<[u8; 32]>, CryptoError> {
        let mut key = Zeroizing::new([0u8; 32]);
        scrypt::scrypt(secret, salt, &self.kdf.to_params()?, &mut key[..])
            .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
        Ok(key)
    }

    // ── Keyed digests ──────────────────────────────────────────────────

    /// HMAC-SHA256 of `content` under `secret`.
    pub fn digest(&self, content: &[u8], secret: &[u8]) -> Result<[u8; HMAC_SHA256_LEN], CryptoError> {
        require_secret(secret)?;
        hmac_sha256(secret, content)
    }

    /// Constant-time check of `tag` against the digest of `content`.
    pub fn digest_verify(&self, content: &[u8], tag: &[u8], secret: &[u8]) -> Result<bool, CryptoError> {
        let expected = self.digest(content, secret)?;
        Ok(tags_equal(&expected, tag))
    }

    // ── Randomness ─────────────────────────────────────────────────────

    /// `length` bytes from the `random` capability.
    pub fn random_bytes(&self, length: usize) -> Result<Vec<u8>, CryptoError> {
        random_bytes(self.capabilities.random_source().as_ref(), length)
    }

    /// A fresh BIP39 phrase.
    pub fn bip39_mnemonic(&self, words: WordCount) -> Result<String, CryptoError> {
        bip39_mnemonic(self.capabilities.random_source().as_ref(), words)
    }

    /// Keypair at `path` derived from a BIP39 phrase (empty passphrase).
    ///
    /// Pure derivation: no capability is resolved, and the same phrase and
    /// path always give the same keypair.
    pub fn keypair_from_mnemonic(&self, phrase: &str, path: &DerivationPath) -> Result<KeyPair, CryptoError> {
        let seed = mnemonic_to_seed(phrase, "")?;
        derive_keypair(seed.as_ref(), path)
    }
}

fn require_secret(secret: &[u8]) -> Result<(), CryptoError> {
    if secret.is_empty() {
        return Err(CryptoError::InvalidArgument("secret must not be empty".into()));
    }
    Ok(())
}
