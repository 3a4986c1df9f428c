//! # Error Types
//!
//! Leaf-level errors shared by every crate in the workspace. Higher layers
//! wrap these with `#[from]` conversions rather than re-describing them.

use thiserror::Error;

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in signed or hashed payloads.
    /// Claims carrying numbers must use integers or strings.
    #[error("float values are not permitted in canonical representations; use a string or integer: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Malformed encoded input (base64, multihash, serialized documents).
#[derive(Error, Debug)]
pub enum EncodingError {
    /// Input is not valid base64 for the expected alphabet and padding.
    #[error("invalid base64 input: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Multihash prefix names an algorithm this engine does not support.
    #[error("unsupported multihash code 0x{0:02x}")]
    UnsupportedMultihash(u8),

    /// Multihash length prefix disagrees with the digest that follows.
    #[error("multihash length mismatch: prefix says {declared} bytes, found {actual}")]
    MultihashLength {
        /// Length declared in the multihash prefix.
        declared: usize,
        /// Number of digest bytes actually present.
        actual: usize,
    },

    /// A serialized document could not be parsed.
    #[error("malformed document: {0}")]
    Document(#[from] serde_json::Error),
}

/// A value failed structural validation at construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {reason}")]
pub struct ValidationError {
    /// What was being validated (e.g. "did", "timestamp").
    pub kind: &'static str,
    /// Why it was rejected.
    pub reason: String,
}

impl ValidationError {
    /// Build a validation error for the given value kind.
    pub fn new(kind: &'static str, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::new("did", "missing method");
        assert_eq!(err.to_string(), "invalid did: missing method");
    }

    #[test]
    fn test_multihash_length_display() {
        let err = EncodingError::MultihashLength {
            declared: 32,
            actual: 31,
        };
        let msg = err.to_string();
        assert!(msg.contains("32"));
        assert!(msg.contains("31"));
    }
}
