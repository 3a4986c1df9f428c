//! # DID Documents
//!
//! The serialized form returned by `resolve`. Field names follow DID Core
//! JSON (`verificationMethod`, `publicKeyJwk`, `serviceEndpoint`), with
//! `versionId` and `status` carrying the lifecycle position.
//!
//! ```json
//! {
//!   "@context": ["https://www.w3.org/ns/did/v1"],
//!   "id": "did:vid:EiB...",
//!   "verificationMethod": [{
//!     "id": "did:vid:EiB...#key-1",
//!     "type": "EcdsaSecp256k1VerificationKey2019",
//!     "controller": "did:vid:EiB...",
//!     "publicKeyJwk": { "kty": "EC", "crv": "secp256k1", "x": "...", "y": "..." }
//!   }],
//!   "authentication": ["did:vid:EiB...#key-1"],
//!   "assertionMethod": ["did:vid:EiB...#key-1"],
//!   "service": [],
//!   "versionId": 1,
//!   "status": "active",
//!   "created": "2026-01-15T12:00:00Z",
//!   "updated": "2026-01-15T12:00:00Z"
//! }
//! ```

use serde::{Deserialize, Serialize};

use vid_core::{sha256_digest, CanonicalBytes, CanonicalizationError, ContentDigest, Did, Timestamp};
use vid_crypto::{CryptoError, PublicKey};

/// DID Core context URI.
pub const DID_CONTEXT: &str = "https://www.w3.org/ns/did/v1";

/// Verification method type for secp256k1 keys.
pub const VERIFICATION_KEY_TYPE: &str = "EcdsaSecp256k1VerificationKey2019";

/// Lifecycle status as it appears in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    /// Usable for updates, issuance and signing.
    Active,
    /// Terminal.
    Revoked,
}

impl DocumentStatus {
    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Revoked => "revoked",
        }
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A secp256k1 public key as a JSON Web Key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyJwk {
    /// Always `EC`.
    pub kty: String,
    /// Always `secp256k1`.
    pub crv: String,
    /// Affine x, unpadded base64url.
    pub x: String,
    /// Affine y, unpadded base64url.
    pub y: String,
}

impl PublicKeyJwk {
    /// JWK for `key`.
    pub fn from_public_key(key: &PublicKey) -> Result<Self, CryptoError> {
        let (x, y) = key.jwk_coordinates()?;
        Ok(Self {
            kty: "EC".into(),
            crv: "secp256k1".into(),
            x,
            y,
        })
    }

    /// Decode back into a validated key.
    pub fn to_public_key(&self) -> Result<PublicKey, CryptoError> {
        if self.kty != "EC" || self.crv != "secp256k1" {
            return Err(CryptoError::InvalidKey(format!(
                "unsupported jwk {}/{}",
                self.kty, self.crv
            )));
        }
        PublicKey::from_jwk_coordinates(&self.x, &self.y)
    }
}

/// A public key bound to a DID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethod {
    /// DID URL, `<did>#key-N`.
    pub id: String,
    /// Key type.
    #[serde(rename = "type")]
    pub kind: String,
    /// Controlling DID.
    pub controller: Did,
    /// The key.
    pub public_key_jwk: PublicKeyJwk,
}

/// A service endpoint advertised by the DID subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceEndpoint {
    /// Service id, unique within the document.
    pub id: String,
    /// Service type.
    #[serde(rename = "type")]
    pub kind: String,
    /// Endpoint URI.
    pub service_endpoint: String,
}

/// A DID document snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidDocument {
    /// JSON-LD context.
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    /// The DID.
    pub id: Did,
    /// Current keys.
    pub verification_method: Vec<VerificationMethod>,
    /// Verification method ids usable for authentication.
    pub authentication: Vec<String>,
    /// Verification method ids usable for assertions (credential issuance).
    pub assertion_method: Vec<String>,
    /// Service endpoints.
    #[serde(default)]
    pub service: Vec<ServiceEndpoint>,
    /// Starts at 1, incremented by every update and by revocation.
    pub version_id: u64,
    /// Lifecycle status.
    pub status: DocumentStatus,
    /// Creation time.
    pub created: Timestamp,
    /// Time of the latest transition.
    pub updated: Timestamp,
}

impl DidDocument {
    /// The canonical (JCS) encoding.
    pub fn canonical_bytes(&self) -> Result<CanonicalBytes, CanonicalizationError> {
        CanonicalBytes::new(self)
    }

    /// SHA-256 over the canonical encoding.
    pub fn digest(&self) -> Result<ContentDigest, CanonicalizationError> {
        Ok(sha256_digest(&self.canonical_bytes()?))
    }

    /// Look up a verification method by its full DID URL.
    pub fn verification_method(&self, id: &str) -> Option<&VerificationMethod> {
        self.verification_method.iter().find(|vm| vm.id == id)
    }

    /// The public key of an assertion method, if `id` names one.
    pub fn assertion_key(&self, id: &str) -> Option<Result<PublicKey, CryptoError>> {
        self.assertion_method.iter().find(|m| *m == id)?;
        self.verification_method(id)
            .map(|vm| vm.public_key_jwk.to_public_key())
    }

    /// The public key of an authentication method, if `id` names one.
    pub fn authentication_key(&self, id: &str) -> Option<Result<PublicKey, CryptoError>> {
        self.authentication.iter().find(|m| *m == id)?;
        self.verification_method(id)
            .map(|vm| vm.public_key_jwk.to_public_key())
    }

    /// Whether the document is revoked.
    pub fn is_revoked(&self) -> bool {
        self.status == DocumentStatus::Revoked
    }
}
