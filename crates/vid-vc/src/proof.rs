//! # Proofs
//!
//! The proof object attached to credentials and presentations.
//!
//! ## Security Invariant
//!
//! `proofValue` is the unpadded base64url encoding of a 64-byte secp256k1
//! signature over the JCS-canonical body with `proof` excluded. The proof
//! object rejects unknown fields.
//!
//! Detached JWS proofs (`jws` with an `ES256K` `b64:false` header) are not
//! produced or accepted; such a proof fails to parse.

use serde::{Deserialize, Serialize};

use vid_core::{Did, Timestamp, ValidationError};
use vid_crypto::{CryptoError, Signature};
use vid_did::SignedBy;

/// Signature suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProofType {
    /// ECDSA over secp256k1 with SHA-256.
    EcdsaSecp256k1Signature2019,
}

impl std::fmt::Display for ProofType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProofType::EcdsaSecp256k1Signature2019 => f.write_str("EcdsaSecp256k1Signature2019"),
        }
    }
}

/// What the signer asserts by signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProofPurpose {
    /// Issuer asserts the claims (credentials).
    AssertionMethod,
    /// Holder authenticates the bundle (presentations).
    Authentication,
}

impl std::fmt::Display for ProofPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProofPurpose::AssertionMethod => f.write_str("assertionMethod"),
            ProofPurpose::Authentication => f.write_str("authentication"),
        }
    }
}

/// A signature over a canonical body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Proof {
    /// Signature suite.
    #[serde(rename = "type")]
    pub proof_type: ProofType,
    /// When the signature was made.
    pub created: Timestamp,
    /// DID URL of the signing key.
    pub verification_method: String,
    /// Purpose of the proof.
    pub proof_purpose: ProofPurpose,
    /// Unpadded base64url signature.
    pub proof_value: String,
}

impl Proof {
    /// Proof for a signature produced by the DID service.
    pub fn from_signed(signed: &SignedBy, purpose: ProofPurpose) -> Self {
        Self {
            proof_type: ProofType::EcdsaSecp256k1Signature2019,
            created: Timestamp::now(),
            verification_method: signed.verification_method.clone(),
            proof_purpose: purpose,
            proof_value: signed.signature.to_base64url(),
        }
    }

    /// Decode `proofValue`.
    pub fn signature(&self) -> Result<Signature, CryptoError> {
        Signature::from_base64url(&self.proof_value)
    }

    /// The DID that controls the verification method.
    pub fn signer(&self) -> Result<Did, ValidationError> {
        Did::split_url(&self.verification_method).map(|(did, _)| did)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Proof {
        Proof {
            proof_type: ProofType::EcdsaSecp256k1Signature2019,
            created: Timestamp::parse("2026-01-15T12:00:00Z").unwrap(),
            verification_method: "did:vid:abc#key-1".into(),
            proof_purpose: ProofPurpose::AssertionMethod,
            proof_value: Signature::from_bytes(&[7u8; 64]).unwrap().to_base64url(),
        }
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["type"], "EcdsaSecp256k1Signature2019");
        assert_eq!(json["proofPurpose"], "assertionMethod");
        assert_eq!(json["verificationMethod"], "did:vid:abc#key-1");
        assert_eq!(json["created"], "2026-01-15T12:00:00Z");
        assert_eq!(json["proofValue"].as_str().unwrap().len(), 86);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let mut json = serde_json::to_value(sample()).unwrap();
        json["extra"] = serde_json::json!(1);
        assert!(serde_json::from_value::<Proof>(json).is_err());
    }

    #[test]
    fn test_detached_jws_proof_rejected() {
        let mut json = serde_json::to_value(sample()).unwrap();
        let object = json.as_object_mut().unwrap();
        object.remove("proofValue");
        object.insert("jws".into(), serde_json::json!("eyJhbGciOiJFUzI1NksiLCJiNjQiOmZhbHNlLCJjcml0IjpbImI2NCJdfQ..c2ln"));
        assert!(serde_json::from_value::<Proof>(json).is_err());
    }

    #[test]
    fn test_signer_and_signature_decode() {
        let proof = sample();
        assert_eq!(proof.signer().unwrap().as_str(), "did:vid:abc");
        assert_eq!(proof.signature().unwrap().as_bytes(), &[7u8; 64]);
    }

    #[test]
    fn test_corrupt_proof_value_fails_to_decode() {
        let mut proof = sample();
        proof.proof_value.push('A');
        assert!(proof.signature().is_err());
        proof.proof_value = "not base64!".into();
        assert!(proof.signature().is_err());
    }
}
