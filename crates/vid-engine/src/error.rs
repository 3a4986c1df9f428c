//! # Engine Error Taxonomy
//!
//! Every crate error folds into one [`EngineError`] variant. Each variant has
//! a stable numeric status code, which is the single failure indicator a
//! boundary caller sees.
//!
//! | Variant | Code |
//! |---|---|
//! | `Config` | 10 |
//! | `Context` | 20 |
//! | `Capability` | 30 |
//! | `Crypto` | 40 |
//! | `Encoding` | 50 |
//! | `InvalidState` | 60 |
//! | `NotFound` | 70 |
//! | `InvalidArgument` | 80 |
//! | `UseAfterFree` | 90 |
//!
//! A negative verification result is not an error. It comes back as a
//! successful `false` or a non-`valid` verdict.

use thiserror::Error;

use vid_core::{CanonicalizationError, EncodingError, ValidationError};
use vid_crypto::{CapabilityError, CryptoError};
use vid_did::DidError;
use vid_vc::VcError;

use crate::boundary::BufferHandle;

/// Errors surfaced by [`Engine`](crate::Engine) operations.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Bad engine configuration or session bootstrap input.
    #[error("configuration error: {0}")]
    Config(String),

    /// Unknown, closed, or mismatched context.
    #[error("context error: {0}")]
    Context(String),

    /// Capability registry misuse.
    #[error(transparent)]
    Capability(#[from] CapabilityError),

    /// Signing, encryption, decryption or handler failure.
    #[error(transparent)]
    Crypto(CryptoError),

    /// Malformed base64, multihash or serialized document.
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    /// Operation illegal in the DID's current lifecycle state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// No document for the context or identifier.
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed or out-of-range caller input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A buffer was read or released after it had already been released.
    #[error("buffer {0} was already disposed")]
    UseAfterFree(BufferHandle),
}

impl EngineError {
    /// Stable numeric status code.
    pub fn code(&self) -> u16 {
        match self {
            Self::Config(_) => 10,
            Self::Context(_) => 20,
            Self::Capability(_) => 30,
            Self::Crypto(_) => 40,
            Self::Encoding(_) => 50,
            Self::InvalidState(_) => 60,
            Self::NotFound(_) => 70,
            Self::InvalidArgument(_) => 80,
            Self::UseAfterFree(_) => 90,
        }
    }

    /// Taxonomy name, e.g. `"InvalidStateError"`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "ConfigError",
            Self::Context(_) => "ContextError",
            Self::Capability(_) => "CapabilityError",
            Self::Crypto(_) => "CryptoError",
            Self::Encoding(_) => "EncodingError",
            Self::InvalidState(_) => "InvalidStateError",
            Self::NotFound(_) => "NotFoundError",
            Self::InvalidArgument(_) => "InvalidArgument",
            Self::UseAfterFree(_) => "UseAfterFreeError",
        }
    }
}

impl From<CryptoError> for EngineError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::InvalidArgument(reason) => Self::InvalidArgument(reason),
            other => Self::Crypto(other),
        }
    }
}

impl From<DidError> for EngineError {
    fn from(e: DidError) -> Self {
        match e {
            DidError::InvalidTransition { .. } | DidError::AlreadyBound(_) => {
                Self::InvalidState(e.to_string())
            }
            DidError::NotFound(what) => Self::NotFound(what),
            DidError::InvalidArgument(reason) => Self::InvalidArgument(reason),
            DidError::Crypto(inner) => inner.into(),
            DidError::Canonicalization(inner) => inner.into(),
            DidError::Validation(inner) => inner.into(),
        }
    }
}

impl From<VcError> for EngineError {
    fn from(e: VcError) -> Self {
        match e {
            VcError::Did(inner) => inner.into(),
            VcError::Crypto(inner) => inner.into(),
            VcError::Canonicalization(inner) => inner.into(),
            VcError::InvalidArgument(reason) => Self::InvalidArgument(reason),
        }
    }
}

impl From<CanonicalizationError> for EngineError {
    fn from(e: CanonicalizationError) -> Self {
        Self::InvalidArgument(e.to_string())
    }
}

impl From<ValidationError> for EngineError {
    fn from(e: ValidationError) -> Self {
        Self::InvalidArgument(e.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        Self::Encoding(EncodingError::Document(e))
    }
}
