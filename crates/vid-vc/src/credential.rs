//! # Verifiable Credentials
//!
//! [`CredentialBody`] is the unsigned credential; [`VerifiableCredential`]
//! is a body plus its mandatory proof. No value of type
//! `VerifiableCredential` exists without a proof.
//!
//! ## Signing input
//!
//! `CanonicalBytes::new(&body)`: the JCS form of the credential with `proof`
//! excluded. Verification recomputes the same bytes from the received body.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use vid_core::{CanonicalBytes, CanonicalizationError, Did, Timestamp};

use crate::proof::Proof;

/// W3C credentials context.
pub const CREDENTIALS_CONTEXT: &str = "https://www.w3.org/2018/credentials/v1";

/// Base credential type.
pub const CREDENTIAL_TYPE: &str = "VerifiableCredential";

/// The subject and the claims made about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialSubject {
    /// Subject DID.
    pub id: Did,
    /// Claims as a JSON object. Must not contain `id`.
    #[serde(flatten)]
    pub claims: Map<String, Value>,
}

/// An unsigned credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialBody {
    /// JSON-LD context.
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    /// `urn:uuid:<v4>`.
    pub id: String,
    /// Credential types.
    #[serde(rename = "type")]
    pub credential_type: Vec<String>,
    /// Issuer DID.
    pub issuer: Did,
    /// Issuance time.
    pub issuance_date: Timestamp,
    /// Optional expiry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<Timestamp>,
    /// Subject and claims.
    pub credential_subject: CredentialSubject,
}

impl CredentialBody {
    /// New body issued now with a fresh `urn:uuid` id.
    pub fn new(
        issuer: Did,
        subject: Did,
        claims: Map<String, Value>,
        expiration_date: Option<Timestamp>,
    ) -> Self {
        Self {
            context: vec![CREDENTIALS_CONTEXT.into()],
            id: format!("urn:uuid:{}", uuid::Uuid::new_v4()),
            credential_type: vec![CREDENTIAL_TYPE.into()],
            issuer,
            issuance_date: Timestamp::now(),
            expiration_date,
            credential_subject: CredentialSubject { id: subject, claims },
        }
    }

    /// The canonical signing input.
    pub fn signing_input(&self) -> Result<CanonicalBytes, CanonicalizationError> {
        CanonicalBytes::new(self)
    }

    /// Whether the credential has expired at `now`.
    pub fn is_expired_at(&self, now: &Timestamp) -> bool {
        self.expiration_date.as_ref().is_some_and(|exp| exp < now)
    }
}

/// A signed credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiableCredential {
    /// Everything except the proof.
    #[serde(flatten)]
    pub body: CredentialBody,
    /// Issuer's proof over `body`.
    pub proof: Proof,
}

impl VerifiableCredential {
    /// The credential id.
    pub fn id(&self) -> &str {
        &self.body.id
    }

    /// The issuer DID.
    pub fn issuer(&self) -> &Did {
        &self.body.issuer
    }

    /// Recompute the signing input from the body.
    pub fn signing_input(&self) -> Result<CanonicalBytes, CanonicalizationError> {
        self.body.signing_input()
    }
}
