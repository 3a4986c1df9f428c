//! # DID Document Typestate Machine
//!
//! Each lifecycle state is a distinct type, so an illegal transition on a
//! statically known document is a compile error.
//!
//! ## Allowed Transitions
//!
//! ```text
//! (none) ──new()──▶ Active ──update()──▶ Active
//!                     │
//!                     └──revoke()──▶ Revoked   (terminal)
//! ```
//!
//! ## Security Invariant
//!
//! `Document<Revoked>` has neither `update()` nor `revoke()`. Documents loaded
//! at runtime live in [`AnyDocument`], whose accessors turn the same rules
//! into `DidError::InvalidTransition`. A second revoke is an error, not a
//! no-op.
//!
//! ```compile_fail
//! use vid_did::lifecycle::{Document, Revoked};
//!
//! fn revoke_again(doc: Document<Revoked>) {
//!     // ERROR: no method named `revoke` found for `Document<Revoked>`
//!     let _ = doc.revoke(None);
//! }
//! ```

use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use vid_core::{sha256_digest, CanonicalBytes, ContentDigest, Did, Timestamp};
use vid_crypto::PublicKey;

use crate::document::{
    DidDocument, DocumentStatus, PublicKeyJwk, VerificationMethod, DID_CONTEXT,
    VERIFICATION_KEY_TYPE,
};
use crate::error::DidError;
use crate::update::DidUpdate;

// ─── State Types ─────────────────────────────────────────────────────

/// Document state: current keys are usable.
#[derive(Debug, Clone, Copy)]
pub struct Active;

/// Document state: permanently revoked.
#[derive(Debug, Clone, Copy)]
pub struct Revoked;

mod private {
    pub trait Sealed {}
    impl Sealed for super::Active {}
    impl Sealed for super::Revoked {}
}

/// Marker trait for document states. Sealed.
pub trait DocumentState: private::Sealed + std::fmt::Debug + Clone {
    /// Status written into the document.
    fn status() -> DocumentStatus;

    /// Whether no further transitions are allowed.
    fn is_terminal() -> bool {
        false
    }
}

impl DocumentState for Active {
    fn status() -> DocumentStatus {
        DocumentStatus::Active
    }
}

impl DocumentState for Revoked {
    fn status() -> DocumentStatus {
        DocumentStatus::Revoked
    }
    fn is_terminal() -> bool {
        true
    }
}

// ─── Transition Record ───────────────────────────────────────────────

/// One entry of a document's audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// State before the transition.
    pub from_state: DocumentStatus,
    /// State after the transition.
    pub to_state: DocumentStatus,
    /// Document version after the transition.
    pub version: u64,
    /// When the transition occurred.
    pub timestamp: Timestamp,
    /// Digest of the update payload or revocation reason.
    pub evidence_digest: Option<ContentDigest>,
    /// Human-readable reason.
    pub reason: Option<String>,
}

// ─── The Document ────────────────────────────────────────────────────

/// A DID document parameterized by its lifecycle state.
#[derive(Debug, Clone)]
pub struct Document<S: DocumentState> {
    document: DidDocument,
    transition_log: Vec<TransitionRecord>,
    _state: PhantomData<S>,
}

impl<S: DocumentState> Document<S> {
    /// The current snapshot.
    pub fn document(&self) -> &DidDocument {
        &self.document
    }

    /// The DID.
    pub fn did(&self) -> &Did {
        &self.document.id
    }

    /// Current version.
    pub fn version(&self) -> u64 {
        self.document.version_id
    }

    /// Lifecycle status.
    pub fn status(&self) -> DocumentStatus {
        S::status()
    }

    /// Whether the document is terminal.
    pub fn is_terminal(&self) -> bool {
        S::is_terminal()
    }

    /// Audit trail, oldest first.
    pub fn transition_log(&self) -> &[TransitionRecord] {
        &self.transition_log
    }

    fn transition_to<T: DocumentState>(
        mut self,
        evidence_digest: Option<ContentDigest>,
        reason: Option<String>,
    ) -> Document<T> {
        let now = Timestamp::now();
        self.document.version_id += 1;
        self.document.status = T::status();
        self.document.updated = now;
        self.transition_log.push(TransitionRecord {
            from_state: S::status(),
            to_state: T::status(),
            version: self.document.version_id,
            timestamp: now,
            evidence_digest,
            reason,
        });
        Document {
            document: self.document,
            transition_log: self.transition_log,
            _state: PhantomData,
        }
    }
}

fn key_fragment(index: u32) -> String {
    format!("key-{index}")
}

fn verification_method(did: &Did, index: u32, key: &PublicKey) -> Result<VerificationMethod, DidError> {
    Ok(VerificationMethod {
        id: did.url(&key_fragment(index)),
        kind: VERIFICATION_KEY_TYPE.into(),
        controller: did.clone(),
        public_key_jwk: PublicKeyJwk::from_public_key(key)?,
    })
}

impl Document<Active> {
    /// Initial document (version 1) with `key` as `#key-1`.
    pub fn new(did: Did, key: &PublicKey) -> Result<Self, DidError> {
        let vm = verification_method(&did, 1, key)?;
        let now = Timestamp::now();
        let document = DidDocument {
            context: vec![DID_CONTEXT.into()],
            id: did,
            authentication: vec![vm.id.clone()],
            assertion_method: vec![vm.id.clone()],
            verification_method: vec![vm],
            service: Vec::new(),
            version_id: 1,
            status: DocumentStatus::Active,
            created: now,
            updated: now,
        };
        Ok(Self {
            document,
            transition_log: Vec::new(),
            _state: PhantomData,
        })
    }

    /// Id of the key used for assertions.
    pub fn assertion_method_id(&self) -> Option<&str> {
        self.document.assertion_method.first().map(String::as_str)
    }

    /// Apply `update` (ACTIVE → ACTIVE).
    ///
    /// `rotated` must be present exactly when `update.rotate_key` is set; it
    /// replaces every verification method under the next key number. On
    /// success returns the id of the new verification method, if any. On
    /// error the document is unchanged.
    pub fn update(
        self,
        update: &DidUpdate,
        rotated: Option<&PublicKey>,
    ) -> Result<(Document<Active>, Option<String>), DidError> {
        update.validate(&self.document)?;
        let rotation = match (update.rotate_key, rotated) {
            (true, Some(key)) => {
                let index = self.highest_key_index() + 1;
                Some(verification_method(&self.document.id, index, key)?)
            }
            (false, None) => None,
            (true, None) => {
                return Err(DidError::InvalidArgument("key rotation requires a new key".into()))
            }
            (false, Some(_)) => {
                return Err(DidError::InvalidArgument("new key supplied without rotation".into()))
            }
        };
        let evidence = sha256_digest(&CanonicalBytes::new(update)?);

        let mut next = self;
        next.document
            .service
            .retain(|s| !update.remove_services.contains(&s.id));
        next.document.service.extend(update.add_services.iter().cloned());
        let new_id = rotation.map(|vm| {
            let id = vm.id.clone();
            next.document.authentication = vec![id.clone()];
            next.document.assertion_method = vec![id.clone()];
            next.document.verification_method = vec![vm];
            id
        });

        let reason = if new_id.is_some() { "key rotated" } else { "services updated" };
        Ok((next.transition_to(Some(evidence), Some(reason.into())), new_id))
    }

    /// Revoke the document (ACTIVE → REVOKED). Terminal.
    pub fn revoke(self, reason: Option<String>) -> Document<Revoked> {
        let evidence = reason
            .as_deref()
            .and_then(|r| CanonicalBytes::new(&r).ok())
            .map(|bytes| sha256_digest(&bytes));
        self.transition_to(evidence, reason.or_else(|| Some("revoked".into())))
    }

    fn highest_key_index(&self) -> u32 {
        self.document
            .verification_method
            .iter()
            .filter_map(|vm| vm.id.rsplit_once("#key-"))
            .filter_map(|(_, n)| n.parse::<u32>().ok())
            .max()
            .unwrap_or(0)
    }
}

// ─── AnyDocument — Runtime State for the Store ──────────────────────

/// A document whose state is known only at runtime.
#[derive(Debug, Clone)]
pub enum AnyDocument {
    /// See [`Active`].
    Active(Document<Active>),
    /// See [`Revoked`].
    Revoked(Document<Revoked>),
}

impl AnyDocument {
    /// The current snapshot.
    pub fn document(&self) -> &DidDocument {
        match self {
            Self::Active(d) => d.document(),
            Self::Revoked(d) => d.document(),
        }
    }

    /// Lifecycle status.
    pub fn status(&self) -> DocumentStatus {
        match self {
            Self::Active(d) => d.status(),
            Self::Revoked(d) => d.status(),
        }
    }

    /// Audit trail, oldest first.
    pub fn transition_log(&self) -> &[TransitionRecord] {
        match self {
            Self::Active(d) => d.transition_log(),
            Self::Revoked(d) => d.transition_log(),
        }
    }

    /// The active document, or `InvalidTransition` naming `operation`.
    pub fn as_active(&self, operation: &'static str) -> Result<&Document<Active>, DidError> {
        match self {
            Self::Active(d) => Ok(d),
            Self::Revoked(d) => Err(DidError::InvalidTransition {
                did: d.did().to_string(),
                state: d.status().as_str(),
                operation,
            }),
        }
    }

    /// Runtime-checked [`Document::update`].
    pub fn try_update(
        &mut self,
        update: &DidUpdate,
        rotated: Option<&PublicKey>,
    ) -> Result<Option<String>, DidError> {
        let active = self.as_active("update")?.clone();
        let (next, new_id) = active.update(update, rotated)?;
        *self = Self::Active(next);
        Ok(new_id)
    }

    /// Runtime-checked [`Document::revoke`].
    pub fn try_revoke(&mut self, reason: Option<String>) -> Result<(), DidError> {
        let active = self.as_active("revoke")?.clone();
        *self = Self::Revoked(active.revoke(reason));
        Ok(())
    }
}

impl From<Document<Active>> for AnyDocument {
    fn from(d: Document<Active>) -> Self {
        Self::Active(d)
    }
}

impl From<Document<Revoked>> for AnyDocument {
    fn from(d: Document<Revoked>) -> Self {
        Self::Revoked(d)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ServiceEndpoint;

    const G: &str = "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";
    const G2: &str = "02c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5";

    fn key(hex: &str) -> PublicKey {
        PublicKey::from_hex(hex).unwrap()
    }

    fn make_active() -> Document<Active> {
        Document::new(Did::new("did:vid:abc").unwrap(), &key(G)).unwrap()
    }

    fn hub() -> ServiceEndpoint {
        ServiceEndpoint {
            id: "#hub".into(),
            kind: "IdentityHub".into(),
            service_endpoint: "https://hub.example.com".into(),
        }
    }

    #[test]
    fn test_new_document_has_one_key() {
        let doc = make_active();
        assert_eq!(doc.version(), 1);
        assert_eq!(doc.status(), DocumentStatus::Active);
        assert_eq!(doc.document().verification_method.len(), 1);
        assert_eq!(doc.assertion_method_id(), Some("did:vid:abc#key-1"));
        assert!(doc.transition_log().is_empty());
    }

    #[test]
    fn test_rotation_increments_key_and_version() {
        let (doc, new_id) = make_active()
            .update(&DidUpdate::rotate(), Some(&key(G2)))
            .unwrap();
        assert_eq!(new_id.as_deref(), Some("did:vid:abc#key-2"));
        assert_eq!(doc.version(), 2);
        assert_eq!(doc.document().verification_method.len(), 1);
        assert_eq!(doc.document().authentication, vec!["did:vid:abc#key-2".to_string()]);
        let record = &doc.transition_log()[0];
        assert_eq!(record.from_state, DocumentStatus::Active);
        assert_eq!(record.to_state, DocumentStatus::Active);
        assert_eq!(record.version, 2);
        assert!(record.evidence_digest.is_some());
    }

    #[test]
    fn test_service_update_keeps_keys() {
        let update = DidUpdate {
            add_services: vec![hub()],
            ..DidUpdate::default()
        };
        let (doc, new_id) = make_active().update(&update, None).unwrap();
        assert!(new_id.is_none());
        assert_eq!(doc.document().service, vec![hub()]);
        assert_eq!(doc.assertion_method_id(), Some("did:vid:abc#key-1"));
    }

    #[test]
    fn test_rotation_key_mismatch_rejected() {
        assert!(make_active().update(&DidUpdate::rotate(), None).is_err());
        let update = DidUpdate {
            add_services: vec![hub()],
            ..DidUpdate::default()
        };
        assert!(make_active().update(&update, Some(&key(G2))).is_err());
    }

    #[test]
    fn test_revoke_is_terminal() {
        let revoked = make_active().revoke(Some("key compromised".into()));
        assert!(revoked.is_terminal());
        assert_eq!(revoked.version(), 2);
        assert_eq!(revoked.document().status, DocumentStatus::Revoked);
        assert_eq!(revoked.transition_log()[0].reason.as_deref(), Some("key compromised"));
    }

    #[test]
    fn test_any_document_rejects_update_after_revoke() {
        let mut any = AnyDocument::from(make_active());
        any.try_revoke(None).unwrap();
        assert_eq!(any.status(), DocumentStatus::Revoked);
        assert!(matches!(
            any.try_update(&DidUpdate::rotate(), Some(&key(G2))),
            Err(DidError::InvalidTransition { operation: "update", .. })
        ));
    }

    #[test]
    fn test_any_document_second_revoke_fails() {
        let mut any = AnyDocument::from(make_active());
        any.try_revoke(None).unwrap();
        let version = any.document().version_id;
        assert!(matches!(
            any.try_revoke(None),
            Err(DidError::InvalidTransition { operation: "revoke", state: "revoked", .. })
        ));
        assert_eq!(any.document().version_id, version);
    }

    #[test]
    fn test_failed_update_leaves_document_unchanged() {
        let mut any = AnyDocument::from(make_active());
        let before = any.document().clone();
        assert!(any.try_update(&DidUpdate::default(), None).is_err());
        assert_eq!(any.document(), &before);
    }

    #[test]
    fn test_transition_record_serde() {
        let revoked = make_active().revoke(None);
        let json = serde_json::to_value(&revoked.transition_log()[0]).unwrap();
        assert_eq!(json["from_state"], "active");
        assert_eq!(json["to_state"], "revoked");
    }
}
