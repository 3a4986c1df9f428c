//! # DID Service
//!
//! Create, resolve, update and revoke DIDs on behalf of clients, and sign
//! with a client's current assertion key. Keys come from the cipher core, so
//! an injected ECDSA keypair generator or signer is used transparently.
//!
//! ## Identifier derivation
//!
//! `did:<method>:<multihash(compressed SEC1 public key)>`. The identifier is
//! fixed at creation and survives key rotation.

use std::sync::Arc;

use vid_core::identity::validate_method;
use vid_core::{multihash, CanonicalBytes, ClientId, Did};
use vid_crypto::{Cipher, DerivationPath, KeyPair, Signature};

use crate::document::DidDocument;
use crate::error::DidError;
use crate::keyring::Keyring;
use crate::lifecycle::{Document, TransitionRecord};
use crate::store::{DidRecord, DidStore};
use crate::update::DidUpdate;

/// A signature together with the key that made it.
#[derive(Debug, Clone)]
pub struct SignedBy {
    /// Signing DID.
    pub did: Did,
    /// Verification method URL of the signing key.
    pub verification_method: String,
    /// The signature.
    pub signature: Signature,
}

/// Which key set a signature should come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPurpose {
    /// `assertionMethod` (credential issuance).
    Assertion,
    /// `authentication` (presentations).
    Authentication,
}

/// DID lifecycle operations over a local store.
#[derive(Debug)]
pub struct DidService {
    store: DidStore,
    cipher: Arc<Cipher>,
    method: String,
}

impl DidService {
    /// Service minting `did:<method>:` identifiers.
    pub fn new(cipher: Arc<Cipher>, method: impl Into<String>) -> Result<Self, DidError> {
        let method = method.into();
        validate_method(&method)?;
        Ok(Self {
            store: DidStore::new(),
            cipher,
            method,
        })
    }

    /// The cipher used for keys and signatures.
    pub fn cipher(&self) -> &Arc<Cipher> {
        &self.cipher
    }

    /// The DID method name.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Create a DID for `owner` with one fresh key.
    ///
    /// # Errors
    ///
    /// `AlreadyBound` if `owner` already controls a DID; crypto errors from
    /// key generation.
    pub fn create(&self, owner: &ClientId) -> Result<DidDocument, DidError> {
        if self.store.bound_did(owner).is_some() {
            return Err(DidError::AlreadyBound(owner.clone()));
        }
        let keypair = self.cipher.keypair_generate()?;
        self.create_with(owner, keypair)
    }

    /// Create a DID for `owner` whose key is the signing branch of a BIP39
    /// phrase. The same phrase always yields the same DID.
    ///
    /// # Errors
    ///
    /// `AlreadyBound` if `owner` already controls a DID; `InvalidArgument`
    /// for a phrase that does not parse or whose DID is already held by
    /// another client.
    pub fn create_from_mnemonic(&self, owner: &ClientId, phrase: &str) -> Result<DidDocument, DidError> {
        if self.store.bound_did(owner).is_some() {
            return Err(DidError::AlreadyBound(owner.clone()));
        }
        let keypair = self.cipher.keypair_from_mnemonic(phrase, &DerivationPath::sign())?;
        self.create_with(owner, keypair)
    }

    fn create_with(&self, owner: &ClientId, keypair: KeyPair) -> Result<DidDocument, DidError> {
        let did = Did::from_parts(&self.method, &multihash(keypair.public_key.as_bytes()))?;
        let document = Document::new(did, &keypair.public_key)?;
        let snapshot = document.document().clone();
        let vm_id = document
            .assertion_method_id()
            .ok_or_else(|| DidError::InvalidArgument("new document has no assertion key".into()))?
            .to_string();

        self.store.insert(
            owner,
            DidRecord {
                document: document.into(),
                keyring: Keyring::with_key(vm_id, keypair.secret_key),
            },
        )?;
        tracing::info!(did = %snapshot.id, client = %owner, "DID created");
        Ok(snapshot)
    }

    /// Current document of the DID bound to `owner`.
    pub fn resolve(&self, owner: &ClientId) -> Result<DidDocument, DidError> {
        let record = self.store.get_bound(owner)?;
        let doc = record.read().document.document().clone();
        Ok(doc)
    }

    /// Current document of any locally known DID.
    pub fn resolve_did(&self, did: &Did) -> Result<DidDocument, DidError> {
        let record = self.store.get(did)?;
        let doc = record.read().document.document().clone();
        Ok(doc)
    }

    /// The DID bound to `owner`.
    pub fn did_of(&self, owner: &ClientId) -> Result<Did, DidError> {
        self.store
            .bound_did(owner)
            .ok_or_else(|| DidError::NotFound(format!("client {owner}")))
    }

    /// Apply `update` to the DID bound to `owner`.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` if the document is revoked (checked before the
    /// update is validated); `InvalidArgument` for an empty or inconsistent
    /// update.
    pub fn update(&self, owner: &ClientId, update: &DidUpdate) -> Result<DidDocument, DidError> {
        let handle = self.store.get_bound(owner)?;
        let mut guard = handle.write();
        let record = &mut *guard;

        let active = record.document.as_active("update")?;
        update.validate(active.document())?;
        let rotated = if update.rotate_key {
            Some(self.cipher.keypair_generate()?)
        } else {
            None
        };

        let new_id = record
            .document
            .try_update(update, rotated.as_ref().map(|kp| &kp.public_key))?;
        if let (Some(id), Some(kp)) = (new_id, rotated) {
            record.keyring.replace_all(id, kp.secret_key);
        }

        let doc = record.document.document().clone();
        tracing::info!(did = %doc.id, version = doc.version_id, "DID updated");
        Ok(doc)
    }

    /// Revoke the DID bound to `owner`. Not idempotent.
    pub fn revoke(&self, owner: &ClientId, reason: Option<String>) -> Result<DidDocument, DidError> {
        let handle = self.store.get_bound(owner)?;
        let mut record = handle.write();
        record.document.try_revoke(reason)?;
        record.keyring.clear();
        let doc = record.document.document().clone();
        tracing::info!(did = %doc.id, version = doc.version_id, "DID revoked");
        Ok(doc)
    }

    /// Audit trail of the DID bound to `owner`.
    pub fn history(&self, owner: &ClientId) -> Result<Vec<TransitionRecord>, DidError> {
        let record = self.store.get_bound(owner)?;
        let log = record.read().document.transition_log().to_vec();
        Ok(log)
    }

    /// Sign `payload` with the current key of `owner` for `purpose`.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` (operation `sign`) if the DID is revoked.
    pub fn sign_as(
        &self,
        owner: &ClientId,
        purpose: KeyPurpose,
        payload: &CanonicalBytes,
    ) -> Result<SignedBy, DidError> {
        let handle = self.store.get_bound(owner)?;
        let record = handle.read();
        let active = record.document.as_active("sign")?;
        let doc = active.document();
        let methods = match purpose {
            KeyPurpose::Assertion => &doc.assertion_method,
            KeyPurpose::Authentication => &doc.authentication,
        };
        let (vm_id, secret) = methods
            .iter()
            .find_map(|id| record.keyring.get(id).map(|k| (id.clone(), k)))
            .ok_or_else(|| DidError::NotFound(format!("signing key for {}", doc.id)))?;
        let signature = self.cipher.sign(payload.as_bytes(), secret)?;
        Ok(SignedBy {
            did: doc.id.clone(),
            verification_method: vm_id,
            signature,
        })
    }

    /// Number of DIDs in the local store.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Whether the local store is empty.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentStatus, ServiceEndpoint};
    use vid_crypto::{CapabilityRegistry, ScryptParams};

    fn service() -> DidService {
        let cipher = Cipher::new(Arc::new(CapabilityRegistry::new()), ScryptParams::default()).unwrap();
        DidService::new(Arc::new(cipher), "vid").unwrap()
    }

    fn alice() -> ClientId {
        ClientId::new("alice").unwrap()
    }

    #[test]
    fn test_create_derives_did_from_key() {
        let svc = service();
        let doc = svc.create(&alice()).unwrap();
        assert_eq!(doc.id.method(), "vid");
        assert_eq!(doc.verification_method.len(), 1);
        assert_eq!(doc.status, DocumentStatus::Active);
        let key = doc.verification_method[0].public_key_jwk.to_public_key().unwrap();
        assert_eq!(doc.id.method_specific_id(), multihash(key.as_bytes()));
    }

    const PHRASE: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn test_create_from_mnemonic_is_deterministic() {
        let doc = service().create_from_mnemonic(&alice(), PHRASE).unwrap();
        assert_eq!(doc.id.as_str(), "did:vid:EiC6Wxsdmg6ZGntNnnfLemStmpAr8ZZDUdTZuXFNQQCCXQ");

        let elsewhere = service().create_from_mnemonic(&alice(), PHRASE).unwrap();
        assert_eq!(elsewhere.id, doc.id);
        assert_eq!(elsewhere.verification_method, doc.verification_method);
    }

    #[test]
    fn test_create_from_mnemonic_rejects_taken_did_and_bad_phrase() {
        let svc = service();
        svc.create_from_mnemonic(&alice(), PHRASE).unwrap();
        let bob = ClientId::new("bob").unwrap();
        assert!(matches!(svc.create_from_mnemonic(&bob, PHRASE), Err(DidError::InvalidArgument(_))));
        assert!(matches!(
            svc.create_from_mnemonic(&bob, "not a phrase"),
            Err(DidError::Crypto(vid_crypto::CryptoError::InvalidArgument(_)))
        ));
        assert!(matches!(svc.create_from_mnemonic(&alice(), PHRASE), Err(DidError::AlreadyBound(_))));
        assert_eq!(svc.len(), 1);
    }

    #[test]
    fn test_create_twice_for_same_client_fails() {
        let svc = service();
        svc.create(&alice()).unwrap();
        assert!(matches!(svc.create(&alice()), Err(DidError::AlreadyBound(_))));
        assert_eq!(svc.len(), 1);
    }

    #[test]
    fn test_resolve_unknown_is_not_found() {
        let svc = service();
        assert!(matches!(svc.resolve(&alice()), Err(DidError::NotFound(_))));
        assert!(matches!(
            svc.resolve_did(&Did::new("did:vid:nope").unwrap()),
            Err(DidError::NotFound(_))
        ));
    }

    #[test]
    fn test_rotation_changes_signing_key() {
        let svc = service();
        let created = svc.create(&alice()).unwrap();
        let payload = CanonicalBytes::new(&serde_json::json!({"n": 1})).unwrap();
        let before = svc.sign_as(&alice(), KeyPurpose::Assertion, &payload).unwrap();

        let updated = svc.update(&alice(), &DidUpdate::rotate()).unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.version_id, 2);

        let after = svc.sign_as(&alice(), KeyPurpose::Assertion, &payload).unwrap();
        assert_eq!(after.verification_method, created.id.url("key-2"));
        assert_ne!(before.verification_method, after.verification_method);

        let key = updated
            .assertion_key(&after.verification_method)
            .unwrap()
            .unwrap();
        assert!(svc
            .cipher()
            .verify(payload.as_bytes(), after.signature.as_bytes(), key.as_bytes())
            .unwrap());
    }

    #[test]
    fn test_service_endpoints() {
        let svc = service();
        svc.create(&alice()).unwrap();
        let update = DidUpdate {
            add_services: vec![ServiceEndpoint {
                id: "#hub".into(),
                kind: "IdentityHub".into(),
                service_endpoint: "https://hub.example.com".into(),
            }],
            ..DidUpdate::default()
        };
        let doc = svc.update(&alice(), &update).unwrap();
        assert_eq!(doc.service.len(), 1);
        assert!(matches!(svc.update(&alice(), &update), Err(DidError::InvalidArgument(_))));
    }

    #[test]
    fn test_revoke_then_update_and_sign_fail() {
        let svc = service();
        svc.create(&alice()).unwrap();
        let revoked = svc.revoke(&alice(), Some("lost device".into())).unwrap();
        assert_eq!(revoked.status, DocumentStatus::Revoked);
        assert_eq!(svc.resolve(&alice()).unwrap().status, DocumentStatus::Revoked);

        assert!(matches!(
            svc.update(&alice(), &DidUpdate::rotate()),
            Err(DidError::InvalidTransition { operation: "update", .. })
        ));
        assert!(matches!(
            svc.update(&alice(), &DidUpdate::default()),
            Err(DidError::InvalidTransition { .. })
        ));
        assert!(matches!(
            svc.revoke(&alice(), None),
            Err(DidError::InvalidTransition { operation: "revoke", .. })
        ));
        let payload = CanonicalBytes::new(&"x").unwrap();
        assert!(matches!(
            svc.sign_as(&alice(), KeyPurpose::Assertion, &payload),
            Err(DidError::InvalidTransition { operation: "sign", .. })
        ));
    }

    #[test]
    fn test_history_records_transitions() {
        let svc = service();
        svc.create(&alice()).unwrap();
        svc.update(&alice(), &DidUpdate::rotate()).unwrap();
        svc.revoke(&alice(), None).unwrap();
        let log = svc.history(&alice()).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[1].to_state, DocumentStatus::Revoked);
        assert_eq!(log[1].version, 3);
    }

    #[test]
    fn test_invalid_method_rejected() {
        let cipher = Cipher::new(Arc::new(CapabilityRegistry::new()), ScryptParams::default()).unwrap();
        assert!(DidService::new(Arc::new(cipher), "Bad-Method").is_err());
    }
}
