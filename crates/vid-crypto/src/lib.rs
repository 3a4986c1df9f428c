//! # vid-crypto — Capability Registry and Cipher Core
//!
//! The host platform supplies memory management, diagnostics, AES, ECDSA and
//! randomness through a [`CapabilityRegistry`]; [`Cipher`] exposes the stable
//! cryptographic API the identity layers build on.
//!
//! ## Primitives
//!
//! | Concern | Default | Capability slot |
//! |---|---|---|
//! | Signatures | secp256k1 ECDSA (`k256`), SHA-256 prehash | `ecdsa_sign`, `ecdsa_verify`, `ecdsa_keypair` |
//! | Encryption | scrypt KDF + AES-256-GCM-SIV | `aes_encrypt`, `aes_decrypt` |
//! | Keyed digest | HMAC-SHA256 | none |
//! | Randomness | OS CSPRNG | `random` |
//! | HD keys | BIP39 seed + BIP32 derivation | none |
//! | Buffers | heap, zeroized on release | `allocator`, `deallocator` |
//! | Diagnostics | `tracing` | `debug` |
//!
//! ## Crate Policy
//!
//! - Secret material lives in `Zeroizing` containers and has redacted `Debug`.
//! - Negative verification results are `Ok(false)`, never errors.
//! - No `unsafe` code.

pub mod builtin;
pub mod capability;
pub mod cipher;
pub mod derivation;
pub mod error;
pub mod keyed;
pub mod mnemonic;
pub mod random;
pub mod secp256k1;

pub use capability::{
    AesDecryptor, AesEncryptor, CapabilityRegistry, CapabilitySlot, DebugSink,
    EcdsaKeypairGenerator, EcdsaSigner, EcdsaVerifier, Handler, LogLevel, MemoryAllocator,
    MemoryDeallocator, RandomSource, RawKeypair,
};
pub use cipher::{Cipher, ScryptParams};
pub use derivation::{
    derive_keypair, DerivationPath, ENCRYPTION_DERIVATION_PATH, RECOVERY_DERIVATION_PATH,
    SIGN_DERIVATION_PATH, UPDATE_DERIVATION_PATH,
};
pub use error::{CapabilityError, CryptoError};
pub use keyed::{hmac_sha256, hmac_sha512};
pub use mnemonic::{bip39_mnemonic, mnemonic_to_seed, WordCount};
pub use random::random_bytes;
pub use secp256k1::{KeyPair, PublicKey, SecretKey, Signature};
