//! # Session Keyring
//!
//! Secret keys of the active verification methods, indexed by DID URL.
//!
//! ## Security Invariant
//!
//! Secrets are `SecretKey` values and are zeroized when replaced, cleared or
//! dropped. The keyring is not `Serialize`, and its `Debug` output lists key
//! ids only.

use std::collections::HashMap;

use vid_crypto::SecretKey;

/// In-memory secret key custody for one DID.
#[derive(Default)]
pub struct Keyring {
    keys: HashMap<String, SecretKey>,
}

impl Keyring {
    /// Empty keyring.
    pub fn new() -> Self {
        Self::default()
    }

    /// Keyring holding one key.
    pub fn with_key(id: impl Into<String>, key: SecretKey) -> Self {
        let mut ring = Self::new();
        ring.keys.insert(id.into(), key);
        ring
    }

    /// Secret for verification method `id`.
    pub fn get(&self, id: &str) -> Option<&SecretKey> {
        self.keys.get(id)
    }

    /// Drop every key and keep only `key` under `id`.
    pub fn replace_all(&mut self, id: impl Into<String>, key: SecretKey) {
        self.keys.clear();
        self.keys.insert(id.into(), key);
    }

    /// Drop every key.
    pub fn clear(&mut self) {
        self.keys.clear();
    }

    /// Number of held keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether no keys are held.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl std::fmt::Debug for Keyring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<&str> = self.keys.keys().map(String::as_str).collect();
        ids.sort_unstable();
        f.debug_struct("Keyring").field("key_ids", &ids).finish()
    }
}
