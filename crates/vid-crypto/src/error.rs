//! # Cryptographic Error Types
//!
//! Structured errors for the cipher core and the capability registry.
//! A negative verification result is never one of these: `verify` and
//! `digest_verify` report it as `Ok(false)`.

use thiserror::Error;

use crate::capability::CapabilitySlot;

/// Errors from cipher core operations and crypto handlers.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Key material has the wrong length.
    #[error("invalid {kind} length: expected {expected}, got {actual} bytes")]
    InvalidKeyLength {
        /// "public key" or "secret key".
        kind: &'static str,
        /// Human-readable accepted lengths.
        expected: &'static str,
        /// Observed length.
        actual: usize,
    },

    /// Key bytes have the right length but do not decode to a usable key.
    #[error("invalid key encoding: {0}")]
    InvalidKey(String),

    /// Signature is not 64 bytes.
    #[error("invalid signature length: expected 64 bytes, got {0}")]
    InvalidSignatureLength(usize),

    /// Signing could not be performed.
    #[error("signing failed: {0}")]
    SigningFailed(String),

    /// The random source could not supply entropy.
    #[error("entropy unavailable: {0}")]
    EntropyUnavailable(String),

    /// Ciphertext is too short or structurally invalid.
    #[error("malformed ciphertext: {0}")]
    MalformedCiphertext(String),

    /// AEAD tag mismatch: wrong secret or tampered ciphertext.
    #[error("authentication failed: ciphertext was tampered with or the secret is wrong")]
    AuthenticationFailed,

    /// Key derivation rejected its parameters.
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// An injected handler reported failure or returned unusable output.
    #[error("{slot} handler failed: {reason}")]
    Handler {
        /// Slot whose handler failed.
        slot: CapabilitySlot,
        /// Reason reported by or about the handler.
        reason: String,
    },

    /// Caller input is malformed or out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Mnemonic generation failed.
    #[error("mnemonic error: {0}")]
    Mnemonic(String),
}

/// Registry misuse.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    /// The slot name is not recognised.
    #[error("unknown capability slot {0:?}")]
    UnknownSlot(String),

    /// The handler variant does not implement the slot's interface.
    #[error("handler for {provided} cannot be registered in slot {slot}")]
    ShapeMismatch {
        /// Target slot.
        slot: CapabilitySlot,
        /// Slot the handler actually implements.
        provided: CapabilitySlot,
    },

    /// The slot already holds an injected handler.
    #[error("capability slot {0} is already registered")]
    AlreadyRegistered(CapabilitySlot),

    /// Registration attempted after first operational use.
    #[error("capability registry is sealed; cannot register {0} after first use")]
    Sealed(CapabilitySlot),

    /// The allocator could not provide a buffer of the requested size.
    #[error("allocation of {requested} bytes failed: {reason}")]
    AllocationFailed {
        /// Requested size.
        requested: usize,
        /// Reason reported by the allocator.
        reason: String,
    },
}
