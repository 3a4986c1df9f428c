//! # Built-in Handlers
//!
//! Defaults used for every slot the host leaves empty:
//! heap allocation, zeroizing release, `tracing` diagnostics,
//! AES-256-GCM-SIV, secp256k1 ECDSA via `k256`, and the OS CSPRNG.

use std::sync::Arc;

use aes_gcm_siv::aead::{Aead, KeyInit};
use aes_gcm_siv::{Aes256GcmSiv, Nonce};
use k256::ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use rand_core::{OsRng, RngCore};
use zeroize::{Zeroize, Zeroizing};

use crate::capability::{
    AesDecryptor, AesEncryptor, DebugSink, EcdsaKeypairGenerator, EcdsaSigner, EcdsaVerifier,
    LogLevel, MemoryAllocator, MemoryDeallocator, RandomSource, RawKeypair,
};
use crate::error::{CapabilityError, CryptoError};
use crate::secp256k1::{check_public_key_len, SECRET_KEY_LEN, SIGNATURE_LEN};

/// Attempts before concluding the random source cannot yield a valid scalar.
const KEYGEN_ATTEMPTS: usize = 8;

/// Zero-filled heap buffers.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeapAllocator;

impl MemoryAllocator for HeapAllocator {
    fn allocate(&self, size: usize) -> Result<Vec<u8>, CapabilityError> {
        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(size)
            .map_err(|e| CapabilityError::AllocationFailed {
                requested: size,
                reason: e.to_string(),
            })?;
        buffer.resize(size, 0);
        Ok(buffer)
    }
}

/// Wipes then drops.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroizingDeallocator;

impl MemoryDeallocator for ZeroizingDeallocator {
    fn release(&self, mut buffer: Vec<u8>) {
        buffer.zeroize();
    }
}

/// Forwards to `tracing` at the nearest level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DebugSink for TracingSink {
    fn emit(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Emergency | LogLevel::Alert | LogLevel::Critical | LogLevel::Error => {
                tracing::error!(level = level.code(), "{message}")
            }
            LogLevel::Warning => tracing::warn!("{message}"),
            LogLevel::Notice | LogLevel::Info => tracing::info!("{message}"),
            LogLevel::Debug => tracing::debug!("{message}"),
        }
    }
}

/// AES-256-GCM-SIV. Nonce-misuse resistant, 16-byte tag appended.
#[derive(Debug, Clone, Copy, Default)]
pub struct AesGcmSiv;

impl AesEncryptor for AesGcmSiv {
    fn encrypt(&self, key: &[u8; 32], nonce: &[u8; 12], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let cipher = Aes256GcmSiv::new_from_slice(key)
            .map_err(|e| CryptoError::InvalidArgument(format!("aes key: {e}")))?;
        cipher
            .encrypt(Nonce::from_slice(nonce), plaintext)
            .map_err(|_| CryptoError::MalformedCiphertext("aes-gcm-siv encryption failed".into()))
    }
}

impl AesDecryptor for AesGcmSiv {
    fn decrypt(&self, key: &[u8; 32], nonce: &[u8; 12], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let cipher = Aes256GcmSiv::new_from_slice(key)
            .map_err(|e| CryptoError::InvalidArgument(format!("aes key: {e}")))?;
        cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CryptoError::AuthenticationFailed)
    }
}

/// secp256k1 ECDSA signing with SHA-256 message hashing.
#[derive(Debug, Clone, Copy, Default)]
pub struct K256Signer;

impl EcdsaSigner for K256Signer {
    fn sign(&self, secret_key: &[u8], message: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if secret_key.len() != SECRET_KEY_LEN {
            return Err(CryptoError::InvalidKeyLength {
                kind: "secret key",
                expected: "32",
                actual: secret_key.len(),
            });
        }
        let key = SigningKey::from_slice(secret_key)
            .map_err(|_| CryptoError::InvalidKey("secret scalar out of range".into()))?;
        let signature: Signature = key
            .try_sign(message)
            .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;
        Ok(signature.to_bytes().to_vec())
    }
}

/// secp256k1 ECDSA verification.
///
/// Only length problems and undecodable public keys are errors. Any 64-byte
/// signature that fails to parse (zero or out-of-range scalars) or to verify
/// (including high-S forms) yields `Ok(false)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct K256Verifier;

impl EcdsaVerifier for K256Verifier {
    fn verify(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<bool, CryptoError> {
        if signature.len() != SIGNATURE_LEN {
            return Err(CryptoError::InvalidSignatureLength(signature.len()));
        }
        check_public_key_len(public_key)?;
        let key = VerifyingKey::from_sec1_bytes(public_key)
            .map_err(|_| CryptoError::InvalidKey("public key is not a point on secp256k1".into()))?;
        let Ok(signature) = Signature::from_slice(signature) else {
            return Ok(false);
        };
        Ok(key.verify(message, &signature).is_ok())
    }
}

/// Keypair generation from a [`RandomSource`].
pub struct K256KeypairGenerator {
    random: Arc<dyn RandomSource>,
}

impl K256KeypairGenerator {
    /// Generator drawing scalars from `random`.
    pub fn new(random: Arc<dyn RandomSource>) -> Self {
        Self { random }
    }
}

impl EcdsaKeypairGenerator for K256KeypairGenerator {
    fn generate(&self) -> Result<RawKeypair, CryptoError> {
        let mut candidate = Zeroizing::new([0u8; SECRET_KEY_LEN]);
        for _ in 0..KEYGEN_ATTEMPTS {
            self.random.fill(&mut candidate[..])?;
            if let Ok(key) = SigningKey::from_slice(&candidate[..]) {
                let public_key = key.verifying_key().to_encoded_point(true).as_bytes().to_vec();
                return Ok(RawKeypair {
                    public_key,
                    secret_key: Zeroizing::new(key.to_bytes().to_vec()),
                });
            }
        }
        Err(CryptoError::EntropyUnavailable(format!(
            "random source produced no valid secp256k1 scalar in {KEYGEN_ATTEMPTS} attempts"
        )))
    }
}

/// The operating system CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill(&self, dest: &mut [u8]) -> Result<(), CryptoError> {
        OsRng
            .try_fill_bytes(dest)
            .map_err(|e| CryptoError::EntropyUnavailable(e.to_string()))
    }
}
