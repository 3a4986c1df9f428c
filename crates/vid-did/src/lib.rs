//! # vid-did — DID Lifecycle
//!
//! DID documents move through `Active → Revoked` as typestate
//! ([`lifecycle::Document`]) and as the runtime-checked [`AnyDocument`] kept
//! in the local [`DidStore`]. [`DidService`] ties the lifecycle to the cipher
//! core: it mints identifiers from fresh public keys, keeps the matching
//! secrets in a per-DID [`Keyring`], and signs on behalf of the controller.
//!
//! ## Crate Policy
//!
//! - Every transition is recorded in the document's audit trail.
//! - Resolution is local reconstruction from the store, never network I/O.
//! - Secret keys never leave the keyring except as signatures.

pub mod document;
pub mod error;
pub mod keyring;
pub mod lifecycle;
pub mod service;
pub mod store;
pub mod update;

pub use document::{
    DidDocument, DocumentStatus, PublicKeyJwk, ServiceEndpoint, VerificationMethod,
};
pub use error::DidError;
pub use keyring::Keyring;
pub use lifecycle::{Active, AnyDocument, Document, DocumentState, Revoked, TransitionRecord};
pub use service::{DidService, KeyPurpose, SignedBy};
pub use store::{DidRecord, DidStore};
pub use update::DidUpdate;
