//! Errors for DID lifecycle operations.

use thiserror::Error;

use vid_core::{CanonicalizationError, ClientId, ValidationError};
use vid_crypto::CryptoError;

/// Errors that can occur during DID operations.
#[derive(Error, Debug)]
pub enum DidError {
    /// The operation is not allowed in the document's current state.
    #[error("cannot {operation} DID {did}: document is {state}")]
    InvalidTransition {
        /// The DID concerned.
        did: String,
        /// Current state name.
        state: &'static str,
        /// Attempted operation.
        operation: &'static str,
    },

    /// The client already controls a DID.
    #[error("client {0} is already bound to a DID")]
    AlreadyBound(ClientId),

    /// No document exists for the lookup key.
    #[error("no DID document for {0}")]
    NotFound(String),

    /// Malformed update or caller input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Key generation or signing failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// A document or update could not be canonicalized.
    #[error(transparent)]
    Canonicalization(#[from] CanonicalizationError),

    /// An identifier failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}
