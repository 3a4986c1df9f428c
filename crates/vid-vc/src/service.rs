//! # Credential Service
//!
//! Issues credentials and presentations with the caller's current DID keys
//! and verifies them against the signers' current documents.
//!
//! ## Verification order
//!
//! ```text
//! signer lookup ──▶ revocation ──▶ expiry ──▶ proof purpose/key ──▶ signature
//!  issuer-not-found  issuer-revoked  expired       invalid-signature
//! ```
//!
//! The first failing step decides the verdict. A proof whose key is not
//! among the signer's current verification methods for that purpose is
//! `invalid-signature`, so a credential signed before a key rotation stops
//! verifying once the key is rotated out.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use vid_core::{CanonicalBytes, CanonicalizationError, ClientId, Did, Timestamp};
use vid_did::{DidError, DidService, KeyPurpose};

use crate::credential::{CredentialBody, VerifiableCredential};
use crate::error::VcError;
use crate::presentation::{PresentationBody, VerifiablePresentation};
use crate::proof::{Proof, ProofPurpose};
use crate::verdict::{CredentialCheck, PresentationVerification, Verdict};

/// Input to credential issuance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialRequest {
    /// Subject DID. Defaults to the issuer (self-issued).
    #[serde(default)]
    pub subject: Option<Did>,
    /// Claims about the subject.
    #[serde(default)]
    pub claims: Map<String, Value>,
    /// Optional expiry; must be in the future.
    #[serde(default)]
    pub expiration_date: Option<Timestamp>,
}

/// VC/VP operations over a DID service.
#[derive(Debug, Clone)]
pub struct VcService {
    dids: Arc<DidService>,
}

impl VcService {
    /// Service signing and resolving through `dids`.
    pub fn new(dids: Arc<DidService>) -> Self {
        Self { dids }
    }

    /// Issue a credential signed by `issuer`'s current assertion key.
    ///
    /// # Errors
    ///
    /// `Did(NotFound)` if `issuer` has no DID; `Did(InvalidTransition)` if
    /// it is revoked; `InvalidArgument` for a reserved claim name or a past
    /// expiry; `Canonicalization` for float claims.
    pub fn issue(
        &self,
        issuer: &ClientId,
        request: &CredentialRequest,
    ) -> Result<VerifiableCredential, VcError> {
        let issuer_did = self.dids.did_of(issuer)?;
        if request.claims.contains_key("id") {
            return Err(VcError::InvalidArgument("claim name \"id\" is reserved".into()));
        }
        if let Some(exp) = &request.expiration_date {
            if *exp <= Timestamp::now() {
                return Err(VcError::InvalidArgument(format!("expirationDate {exp} is not in the future")));
            }
        }

        let subject = request.subject.clone().unwrap_or_else(|| issuer_did.clone());
        let body = CredentialBody::new(issuer_did, subject, request.claims.clone(), request.expiration_date);
        let signed = self
            .dids
            .sign_as(issuer, KeyPurpose::Assertion, &body.signing_input()?)?;
        let credential = VerifiableCredential {
            proof: Proof::from_signed(&signed, ProofPurpose::AssertionMethod),
            body,
        };
        tracing::info!(id = %credential.id(), issuer = %credential.issuer(), "credential issued");
        Ok(credential)
    }

    /// Bundle `credentials` into a presentation signed by `holder`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `credentials` is empty; `Did(InvalidTransition)`
    /// if the holder is revoked.
    pub fn present(
        &self,
        holder: &ClientId,
        credentials: Vec<VerifiableCredential>,
    ) -> Result<VerifiablePresentation, VcError> {
        if credentials.is_empty() {
            return Err(VcError::InvalidArgument("presentation needs at least one credential".into()));
        }
        let holder_did = self.dids.did_of(holder)?;
        let body = PresentationBody::new(holder_did, credentials);
        let signed = self
            .dids
            .sign_as(holder, KeyPurpose::Authentication, &body.signing_input()?)?;
        let presentation = VerifiablePresentation {
            proof: Proof::from_signed(&signed, ProofPurpose::Authentication),
            body,
        };
        tracing::info!(
            id = %presentation.body.id,
            holder = %presentation.holder(),
            credentials = presentation.credentials().len(),
            "presentation created"
        );
        Ok(presentation)
    }

    /// Verify one credential.
    ///
    /// Errors only when a check cannot run (a failing crypto handler).
    pub fn verify_credential(&self, credential: &VerifiableCredential) -> Result<Verdict, VcError> {
        let verdict = self.check_proof(
            credential.issuer(),
            &credential.proof,
            ProofPurpose::AssertionMethod,
            credential.body.expiration_date.as_ref(),
            credential.signing_input(),
        )?;
        tracing::debug!(id = %credential.id(), %verdict, "credential verified");
        Ok(verdict)
    }

    /// Verify the holder proof and every embedded credential.
    ///
    /// All credentials are checked even after a failure, so the result names
    /// every failing index.
    pub fn verify_presentation(
        &self,
        presentation: &VerifiablePresentation,
    ) -> Result<PresentationVerification, VcError> {
        if presentation.credentials().is_empty() {
            return Err(VcError::InvalidArgument("presentation has no credentials".into()));
        }
        let holder = self.check_proof(
            presentation.holder(),
            &presentation.proof,
            ProofPurpose::Authentication,
            None,
            presentation.signing_input(),
        )?;
        let credentials = presentation
            .credentials()
            .iter()
            .enumerate()
            .map(|(index, vc)| {
                Ok(CredentialCheck {
                    index,
                    id: vc.id().to_string(),
                    verdict: self.verify_credential(vc)?,
                })
            })
            .collect::<Result<Vec<_>, VcError>>()?;
        let result = PresentationVerification { holder, credentials };
        tracing::debug!(
            id = %presentation.body.id,
            valid = result.is_valid(),
            failures = result.failures().len(),
            "presentation verified"
        );
        Ok(result)
    }

    fn check_proof(
        &self,
        signer: &Did,
        proof: &Proof,
        purpose: ProofPurpose,
        expires: Option<&Timestamp>,
        input: Result<CanonicalBytes, CanonicalizationError>,
    ) -> Result<Verdict, VcError> {
        let document = match self.dids.resolve_did(signer) {
            Ok(doc) => doc,
            Err(DidError::NotFound(_)) => return Ok(Verdict::IssuerNotFound),
            Err(e) => return Err(e.into()),
        };
        if document.is_revoked() {
            return Ok(Verdict::IssuerRevoked);
        }
        if expires.is_some_and(|exp| *exp < Timestamp::now()) {
            return Ok(Verdict::Expired);
        }
        if proof.proof_purpose != purpose {
            return Ok(Verdict::InvalidSignature);
        }

        let key = match purpose {
            ProofPurpose::AssertionMethod => document.assertion_key(&proof.verification_method),
            ProofPurpose::Authentication => document.authentication_key(&proof.verification_method),
        };
        let (Some(Ok(key)), Ok(signature), Ok(input)) = (key, proof.signature(), input) else {
            return Ok(Verdict::InvalidSignature);
        };
        let ok = self
            .dids
            .cipher()
            .verify(input.as_bytes(), signature.as_bytes(), key.as_bytes())?;
        Ok(if ok { Verdict::Valid } else { Verdict::InvalidSignature })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vid_crypto::{CapabilityRegistry, Cipher, ScryptParams};
    use vid_did::DidUpdate;

    struct Fixture {
        dids: Arc<DidService>,
        vcs: VcService,
    }

    fn fixture() -> Fixture {
        let cipher = Cipher::new(Arc::new(CapabilityRegistry::new()), ScryptParams::default()).unwrap();
        let dids = Arc::new(DidService::new(Arc::new(cipher), "vid").unwrap());
        Fixture {
            vcs: VcService::new(Arc::clone(&dids)),
            dids,
        }
    }

    fn client(name: &str) -> ClientId {
        ClientId::new(name).unwrap()
    }

    fn role(value: &str) -> CredentialRequest {
        let Value::Object(claims) = json!({ "role": value }) else {
            unreachable!()
        };
        CredentialRequest {
            claims,
            ..CredentialRequest::default()
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let f = fixture();
        let did = f.dids.create(&client("alice")).unwrap().id;
        let vc = f.vcs.issue(&client("alice"), &role("admin")).unwrap();
        assert_eq!(vc.issuer(), &did);
        assert_eq!(vc.body.credential_subject.id, did);
        assert_eq!(vc.proof.verification_method, did.url("key-1"));
        assert_eq!(f.vcs.verify_credential(&vc).unwrap(), Verdict::Valid);
    }

    #[test]
    fn test_issue_without_did_is_not_found() {
        let f = fixture();
        assert!(matches!(
            f.vcs.issue(&client("nobody"), &role("x")),
            Err(VcError::Did(DidError::NotFound(_)))
        ));
    }

    #[test]
    fn test_tampered_claim_is_invalid_signature() {
        let f = fixture();
        f.dids.create(&client("alice")).unwrap();
        let mut vc = f.vcs.issue(&client("alice"), &role("user")).unwrap();
        vc.body.credential_subject.claims.insert("role".into(), json!("admin"));
        assert_eq!(f.vcs.verify_credential(&vc).unwrap(), Verdict::InvalidSignature);
    }

    #[test]
    fn test_unknown_issuer() {
        let f = fixture();
        f.dids.create(&client("alice")).unwrap();
        let mut vc = f.vcs.issue(&client("alice"), &role("admin")).unwrap();
        vc.body.issuer = Did::new("did:vid:unknown").unwrap();
        assert_eq!(f.vcs.verify_credential(&vc).unwrap(), Verdict::IssuerNotFound);
    }

    #[test]
    fn test_revoked_issuer() {
        let f = fixture();
        f.dids.create(&client("alice")).unwrap();
        let vc = f.vcs.issue(&client("alice"), &role("admin")).unwrap();
        f.dids.revoke(&client("alice"), None).unwrap();
        assert_eq!(f.vcs.verify_credential(&vc).unwrap(), Verdict::IssuerRevoked);
        assert!(matches!(
            f.vcs.issue(&client("alice"), &role("admin")),
            Err(VcError::Did(DidError::InvalidTransition { .. }))
        ));
    }

    #[test]
    fn test_rotated_key_invalidates_old_credential() {
        let f = fixture();
        f.dids.create(&client("alice")).unwrap();
        let vc = f.vcs.issue(&client("alice"), &role("admin")).unwrap();
        f.dids.update(&client("alice"), &DidUpdate::rotate()).unwrap();
        assert_eq!(f.vcs.verify_credential(&vc).unwrap(), Verdict::InvalidSignature);
        let fresh = f.vcs.issue(&client("alice"), &role("admin")).unwrap();
        assert_eq!(f.vcs.verify_credential(&fresh).unwrap(), Verdict::Valid);
    }

    #[test]
    fn test_expired_credential() {
        let f = fixture();
        f.dids.create(&client("alice")).unwrap();
        let mut request = role("admin");
        request.expiration_date = Some(Timestamp::now().plus_seconds(-10));
        assert!(matches!(
            f.vcs.issue(&client("alice"), &request),
            Err(VcError::InvalidArgument(_))
        ));

        let mut vc = f.vcs.issue(&client("alice"), &role("admin")).unwrap();
        vc.body.expiration_date = Some(Timestamp::now().plus_seconds(-10));
        assert_eq!(f.vcs.verify_credential(&vc).unwrap(), Verdict::Expired);
    }

    #[test]
    fn test_reserved_and_float_claims_rejected() {
        let f = fixture();
        f.dids.create(&client("alice")).unwrap();
        let mut request = role("admin");
        request.claims.insert("id".into(), json!("did:vid:other"));
        assert!(matches!(
            f.vcs.issue(&client("alice"), &request),
            Err(VcError::InvalidArgument(_))
        ));
        let mut request = role("admin");
        request.claims.insert("score".into(), json!(1.5));
        assert!(matches!(
            f.vcs.issue(&client("alice"), &request),
            Err(VcError::Canonicalization(_))
        ));
    }

    #[test]
    fn test_corrupt_proof_value_is_invalid_signature() {
        let f = fixture();
        f.dids.create(&client("alice")).unwrap();
        let mut vc = f.vcs.issue(&client("alice"), &role("admin")).unwrap();
        vc.proof.proof_value = "%%%".into();
        assert_eq!(f.vcs.verify_credential(&vc).unwrap(), Verdict::InvalidSignature);
    }

    #[test]
    fn test_wrong_purpose_is_invalid_signature() {
        let f = fixture();
        f.dids.create(&client("alice")).unwrap();
        let mut vc = f.vcs.issue(&client("alice"), &role("admin")).unwrap();
        vc.proof.proof_purpose = ProofPurpose::Authentication;
        assert_eq!(f.vcs.verify_credential(&vc).unwrap(), Verdict::InvalidSignature);
    }

    #[test]
    fn test_presentation_round_trip() {
        let f = fixture();
        f.dids.create(&client("issuer")).unwrap();
        f.dids.create(&client("holder")).unwrap();
        let a = f.vcs.issue(&client("issuer"), &role("admin")).unwrap();
        let b = f.vcs.issue(&client("issuer"), &role("auditor")).unwrap();
        let vp = f.vcs.present(&client("holder"), vec![a, b]).unwrap();
        let result = f.vcs.verify_presentation(&vp).unwrap();
        assert!(result.is_valid());
        assert_eq!(result.credentials.len(), 2);
    }

    #[test]
    fn test_empty_presentation_rejected() {
        let f = fixture();
        f.dids.create(&client("holder")).unwrap();
        assert!(matches!(
            f.vcs.present(&client("holder"), vec![]),
            Err(VcError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_tampered_presentation_breaks_holder_proof() {
        let f = fixture();
        f.dids.create(&client("issuer")).unwrap();
        f.dids.create(&client("holder")).unwrap();
        let a = f.vcs.issue(&client("issuer"), &role("admin")).unwrap();
        let mut vp = f.vcs.present(&client("holder"), vec![a]).unwrap();
        vp.body.verifiable_credential[0]
            .body
            .credential_subject
            .claims
            .insert("role".into(), json!("root"));
        let result = f.vcs.verify_presentation(&vp).unwrap();
        assert_eq!(result.holder, Verdict::InvalidSignature);
        assert_eq!(result.credentials[0].verdict, Verdict::InvalidSignature);
    }
}
