//! Errors from credential and presentation operations.

use thiserror::Error;

use vid_core::CanonicalizationError;
use vid_crypto::CryptoError;
use vid_did::DidError;

/// Errors from VC/VP creation and verification.
///
/// A credential that fails verification is not an error: see
/// [`Verdict`](crate::Verdict).
#[derive(Error, Debug)]
pub enum VcError {
    /// DID lookup or signing failed (including a revoked signer).
    #[error(transparent)]
    Did(#[from] DidError),

    /// A crypto handler failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// The body could not be canonicalized (e.g. float claims).
    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// Malformed request.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
