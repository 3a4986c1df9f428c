//! Update payloads for active DID documents.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::document::{DidDocument, ServiceEndpoint};
use crate::error::DidError;

/// Changes requested by `update_did`.
///
/// Applied in a fixed order: removals, additions, then key rotation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DidUpdate {
    /// Replace every verification method with a freshly generated key.
    pub rotate_key: bool,
    /// Services to add. Ids must not collide with remaining services.
    pub add_services: Vec<ServiceEndpoint>,
    /// Ids of services to remove. Each must exist.
    pub remove_services: Vec<String>,
}

impl DidUpdate {
    /// Key rotation only.
    pub fn rotate() -> Self {
        Self {
            rotate_key: true,
            ..Self::default()
        }
    }

    /// Whether the update changes nothing.
    pub fn is_empty(&self) -> bool {
        !self.rotate_key && self.add_services.is_empty() && self.remove_services.is_empty()
    }

    /// Check the update against `document` without modifying it.
    pub fn validate(&self, document: &DidDocument) -> Result<(), DidError> {
        if self.is_empty() {
            return Err(DidError::InvalidArgument("update changes nothing".into()));
        }

        let existing: HashSet<&str> = document.service.iter().map(|s| s.id.as_str()).collect();
        let mut removed = HashSet::new();
        for id in &self.remove_services {
            if !existing.contains(id.as_str()) {
                return Err(DidError::InvalidArgument(format!("unknown service {id:?}")));
            }
            if !removed.insert(id.as_str()) {
                return Err(DidError::InvalidArgument(format!("service {id:?} removed twice")));
            }
        }

        let mut remaining: HashSet<&str> = existing.difference(&removed).copied().collect();
        for service in &self.add_services {
            if service.id.trim().is_empty() || service.service_endpoint.trim().is_empty() {
                return Err(DidError::InvalidArgument(
                    "service id and endpoint must be non-empty".into(),
                ));
            }
            if !remaining.insert(service.id.as_str()) {
                return Err(DidError::InvalidArgument(format!(
                    "duplicate service id {:?}",
                    service.id
                )));
            }
        }
        Ok(())
    }
}
