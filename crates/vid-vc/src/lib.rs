//! # vid-vc — Verifiable Credentials and Presentations
//!
//! Issuance signs the canonical credential body with the issuer's current
//! assertion key; presentations are signed with the holder's authentication
//! key over the canonical bundle. Verification resolves the signer through
//! the local DID store and returns a [`Verdict`] rather than an error.
//!
//! ## Security Invariant
//!
//! A [`VerifiableCredential`] always carries a proof: the type has no
//! unsigned constructor and deserialization fails without `proof`. The
//! signing input is the JCS form of the body, so any change to a claim,
//! date, or embedded credential changes the bytes the proof covers.

pub mod credential;
pub mod error;
pub mod presentation;
pub mod proof;
pub mod service;
pub mod verdict;

pub use credential::{CredentialBody, CredentialSubject, VerifiableCredential};
pub use error::VcError;
pub use presentation::{PresentationBody, VerifiablePresentation};
pub use proof::{Proof, ProofPurpose, ProofType};
pub use service::{CredentialRequest, VcService};
pub use verdict::{CredentialCheck, PresentationVerification, Verdict};
