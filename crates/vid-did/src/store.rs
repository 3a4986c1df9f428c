//! # Document Store
//!
//! Local state behind `resolve`. Maps each DID to its record and each client
//! to the DID it controls.
//!
//! ## Locking discipline
//!
//! The outer maps are held only long enough to look up or insert an entry.
//! Each record has its own `RwLock`: one writer per DID, concurrent readers,
//! and operations on different DIDs never contend.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use vid_core::{ClientId, Did};

use crate::error::DidError;
use crate::keyring::Keyring;
use crate::lifecycle::AnyDocument;

/// A document and the secrets for its active keys.
#[derive(Debug)]
pub struct DidRecord {
    /// Current document and audit trail.
    pub document: AnyDocument,
    /// Secrets of the active verification methods.
    pub keyring: Keyring,
}

/// Shared handle to one record.
pub type RecordHandle = Arc<RwLock<DidRecord>>;

/// In-memory DID registry.
#[derive(Debug, Default)]
pub struct DidStore {
    records: RwLock<HashMap<Did, RecordHandle>>,
    bindings: RwLock<HashMap<ClientId, Did>>,
}

impl DidStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new record and bind it to `owner`.
    ///
    /// # Errors
    ///
    /// `AlreadyBound` if `owner` controls a DID, `InvalidArgument` if the DID
    /// is already stored.
    pub fn insert(&self, owner: &ClientId, record: DidRecord) -> Result<Did, DidError> {
        let did = record.document.document().id.clone();
        let mut bindings = self.bindings.write();
        if bindings.contains_key(owner) {
            return Err(DidError::AlreadyBound(owner.clone()));
        }
        let mut records = self.records.write();
        if records.contains_key(&did) {
            return Err(DidError::InvalidArgument(format!("{did} already exists")));
        }
        records.insert(did.clone(), Arc::new(RwLock::new(record)));
        bindings.insert(owner.clone(), did.clone());
        Ok(did)
    }

    /// The DID bound to `owner`.
    pub fn bound_did(&self, owner: &ClientId) -> Option<Did> {
        self.bindings.read().get(owner).cloned()
    }

    /// Record for `did`.
    pub fn get(&self, did: &Did) -> Result<RecordHandle, DidError> {
        self.records
            .read()
            .get(did)
            .cloned()
            .ok_or_else(|| DidError::NotFound(did.to_string()))
    }

    /// Record bound to `owner`.
    pub fn get_bound(&self, owner: &ClientId) -> Result<RecordHandle, DidError> {
        let did = self
            .bound_did(owner)
            .ok_or_else(|| DidError::NotFound(format!("client {owner}")))?;
        self.get(&did)
    }

    /// Number of stored DIDs.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}
