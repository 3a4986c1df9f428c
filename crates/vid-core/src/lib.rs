//! # vid-core — Foundational Types
//!
//! Leaf crate of the verifiable identity engine. Everything above it (cipher
//! core, DID lifecycle, credential engine, boundary) builds on the primitives
//! defined here.
//!
//! ## Key Design Principles
//!
//! 1. **`CanonicalBytes` newtype.** All signing and content hashing flows
//!    through `CanonicalBytes::new()`. There is no second serialization path
//!    for signed data.
//!
//! 2. **Newtype identifiers.** `Did`, `ClientId` and `SessionId` are validated
//!    at construction; no bare strings cross crate boundaries as identifiers.
//!
//! 3. **Strict codecs.** Base64 and multihash decoders reject anything that is
//!    not the single canonical encoding of its bytes.
//!
//! 4. **UTC-only timestamps** with seconds precision.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `vid-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod codec;
pub mod digest;
pub mod error;
pub mod identity;
pub mod multihash;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use canonical::CanonicalBytes;
pub use codec::{
    base64_decode, base64_encode, base64url_decode_unpadded, base64url_encode_unpadded,
};
pub use digest::{sha256_digest, ContentDigest, DigestAlgorithm};
pub use error::{CanonicalizationError, EncodingError, ValidationError};
pub use identity::{ClientId, Did, SessionId};
pub use multihash::{multihash, Multihash};
pub use temporal::Timestamp;
