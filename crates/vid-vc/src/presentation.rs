//! # Verifiable Presentations
//!
//! A holder-signed, ordered bundle of credentials. The holder's proof covers
//! the canonical form of the whole bundle, embedded credential proofs
//! included, so reordering or swapping credentials breaks it.

use serde::{Deserialize, Serialize};

use vid_core::{CanonicalBytes, CanonicalizationError, Did};

use crate::credential::VerifiableCredential;
use crate::proof::Proof;

/// W3C presentation type.
pub const PRESENTATION_TYPE: &str = "VerifiablePresentation";

/// An unsigned presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationBody {
    /// JSON-LD context.
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    /// `urn:uuid:<v4>`.
    pub id: String,
    /// Presentation types.
    #[serde(rename = "type")]
    pub presentation_type: Vec<String>,
    /// Holder DID.
    pub holder: Did,
    /// Embedded credentials, in presentation order.
    pub verifiable_credential: Vec<VerifiableCredential>,
}

impl PresentationBody {
    /// New body with a fresh `urn:uuid` id.
    pub fn new(holder: Did, credentials: Vec<VerifiableCredential>) -> Self {
        Self {
            context: vec![crate::credential::CREDENTIALS_CONTEXT.into()],
            id: format!("urn:uuid:{}", uuid::Uuid::new_v4()),
            presentation_type: vec![PRESENTATION_TYPE.into()],
            holder,
            verifiable_credential: credentials,
        }
    }

    /// The canonical signing input.
    pub fn signing_input(&self) -> Result<CanonicalBytes, CanonicalizationError> {
        CanonicalBytes::new(self)
    }
}

/// A signed presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiablePresentation {
    /// Everything except the holder proof.
    #[serde(flatten)]
    pub body: PresentationBody,
    /// Holder's proof over `body`.
    pub proof: Proof,
}

impl VerifiablePresentation {
    /// The holder DID.
    pub fn holder(&self) -> &Did {
        &self.body.holder
    }

    /// Embedded credentials.
    pub fn credentials(&self) -> &[VerifiableCredential] {
        &self.body.verifiable_credential
    }

    /// Recompute the signing input from the body.
    pub fn signing_input(&self) -> Result<CanonicalBytes, CanonicalizationError> {
        self.body.signing_input()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::CredentialBody;
    use crate::proof::{ProofPurpose, ProofType};
    use vid_core::Timestamp;

    fn proof(vm: &str, purpose: ProofPurpose) -> Proof {
        Proof {
            proof_type: ProofType::EcdsaSecp256k1Signature2019,
            created: Timestamp::now(),
            verification_method: vm.into(),
            proof_purpose: purpose,
            proof_value: "AA".into(),
        }
    }

    fn credential(role: &str) -> VerifiableCredential {
        let mut claims = serde_json::Map::new();
        claims.insert("role".into(), role.into());
        VerifiableCredential {
            body: CredentialBody::new(
                Did::new("did:vid:issuer").unwrap(),
                Did::new("did:vid:holder").unwrap(),
                claims,
                None,
            ),
            proof: proof("did:vid:issuer#key-1", ProofPurpose::AssertionMethod),
        }
    }

    #[test]
    fn test_json_shape_and_round_trip() {
        let vp = VerifiablePresentation {
            body: PresentationBody::new(
                Did::new("did:vid:holder").unwrap(),
                vec![credential("admin"), credential("auditor")],
            ),
            proof: proof("did:vid:holder#key-1", ProofPurpose::Authentication),
        };
        let json = serde_json::to_value(&vp).unwrap();
        assert_eq!(json["type"][0], PRESENTATION_TYPE);
        assert_eq!(json["holder"], "did:vid:holder");
        assert_eq!(json["verifiableCredential"][1]["credentialSubject"]["role"], "auditor");
        assert_eq!(json["proof"]["proofPurpose"], "authentication");

        let back: VerifiablePresentation = serde_json::from_value(json).unwrap();
        assert_eq!(back, vp);
    }

    #[test]
    fn test_order_changes_signing_input() {
        let a = credential("admin");
        let b = credential("auditor");
        let holder = Did::new("did:vid:holder").unwrap();
        let mut forward = PresentationBody::new(holder.clone(), vec![a.clone(), b.clone()]);
        let mut reverse = PresentationBody::new(holder, vec![b, a]);
        reverse.id = forward.id.clone();
        assert_ne!(
            forward.signing_input().unwrap().as_bytes(),
            reverse.signing_input().unwrap().as_bytes()
        );
        forward.verifiable_credential.reverse();
        assert_eq!(
            forward.signing_input().unwrap().as_bytes(),
            reverse.signing_input().unwrap().as_bytes()
        );
    }
}
