//! # Identifier Newtypes
//!
//! `Did`, `ClientId` and `SessionId` keep the three identifier namespaces of
//! the engine apart: a client id can never be passed where a DID is expected.
//!
//! ## DID syntax
//!
//! `did:<method>:<method-specific-id>` where the method is `[a-z0-9]+` and the
//! id is a non-empty run of `[A-Za-z0-9._:%-]`. Fragments (`#key-1`) are not
//! part of a `Did`. Use [`Did::url`] to build a DID URL.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// A validated decentralized identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Did(String);

impl Did {
    /// Validate and wrap a DID string.
    pub fn new(s: impl Into<String>) -> Result<Self, ValidationError> {
        let s = s.into();
        let rest = s
            .strip_prefix("did:")
            .ok_or_else(|| ValidationError::new("did", format!("missing did: scheme in {s:?}")))?;
        let (method, id) = rest
            .split_once(':')
            .ok_or_else(|| ValidationError::new("did", format!("missing method in {s:?}")))?;
        validate_method(method)?;
        if id.is_empty() {
            return Err(ValidationError::new("did", "empty method-specific id"));
        }
        if let Some(bad) = id
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | ':' | '%' | '-')))
        {
            return Err(ValidationError::new(
                "did",
                format!("character {bad:?} not allowed in method-specific id"),
            ));
        }
        Ok(Self(s))
    }

    /// Build a DID from its parts.
    pub fn from_parts(method: &str, method_specific_id: &str) -> Result<Self, ValidationError> {
        Self::new(format!("did:{method}:{method_specific_id}"))
    }

    /// The method name (e.g. `vid`).
    pub fn method(&self) -> &str {
        self.0
            .split(':')
            .nth(1)
            .unwrap_or_default()
    }

    /// Everything after `did:<method>:`.
    pub fn method_specific_id(&self) -> &str {
        let prefix = 4 + self.method().len() + 1;
        self.0.get(prefix..).unwrap_or_default()
    }

    /// The DID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// DID URL with the given fragment: `did:vid:abc#key-1`.
    pub fn url(&self, fragment: &str) -> String {
        format!("{}#{fragment}", self.0)
    }

    /// Split a DID URL into the DID and its fragment.
    pub fn split_url(url: &str) -> Result<(Self, &str), ValidationError> {
        let (did, fragment) = url
            .split_once('#')
            .ok_or_else(|| ValidationError::new("did url", format!("no fragment in {url:?}")))?;
        if fragment.is_empty() {
            return Err(ValidationError::new("did url", "empty fragment"));
        }
        Ok((Self::new(did)?, fragment))
    }
}

/// Check a DID method name: non-empty, lowercase ASCII letters and digits.
pub fn validate_method(method: &str) -> Result<(), ValidationError> {
    if method.is_empty()
        || !method
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    {
        return Err(ValidationError::new(
            "did method",
            format!("{method:?} must be non-empty lowercase alphanumeric"),
        ));
    }
    Ok(())
}

impl TryFrom<String> for Did {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Did> for String {
    fn from(did: Did) -> Self {
        did.0
    }
}

impl std::str::FromStr for Did {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl std::fmt::Display for Did {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The caller's stable identity reference supplied at initialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(String);

impl ClientId {
    /// Maximum accepted length in bytes.
    pub const MAX_LEN: usize = 256;

    /// Validate a client id: non-blank, bounded, no control characters.
    pub fn new(s: impl Into<String>) -> Result<Self, ValidationError> {
        let s = s.into();
        if s.trim().is_empty() {
            return Err(ValidationError::new("client id", "must not be blank"));
        }
        if s.len() > Self::MAX_LEN {
            return Err(ValidationError::new(
                "client id",
                format!("{} bytes exceeds limit of {}", s.len(), Self::MAX_LEN),
            ));
        }
        if s.chars().any(char::is_control) {
            return Err(ValidationError::new("client id", "contains control characters"));
        }
        Ok(Self(s))
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque handle for one initialized session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Generate a fresh random session id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session:{}", self.0)
    }
}
