//! Verification outcomes.
//!
//! A negative verdict is a normal result, not an error. Errors from the
//! verify operations mean the check could not be carried out at all.

use serde::{Deserialize, Serialize};

/// Outcome of checking one proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verdict {
    /// Signer known, active, unexpired, signature correct.
    Valid,
    /// Signature wrong, undecodable, or made with a key the signer does not
    /// currently hold for this purpose.
    InvalidSignature,
    /// Signer's DID is revoked.
    IssuerRevoked,
    /// Signer's DID is unknown.
    IssuerNotFound,
    /// `expirationDate` has passed.
    Expired,
}

impl Verdict {
    /// Whether this is [`Verdict::Valid`].
    pub fn is_valid(&self) -> bool {
        matches!(self, Verdict::Valid)
    }

    /// Kebab-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Valid => "valid",
            Verdict::InvalidSignature => "invalid-signature",
            Verdict::IssuerRevoked => "issuer-revoked",
            Verdict::IssuerNotFound => "issuer-not-found",
            Verdict::Expired => "expired",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict for one credential inside a presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialCheck {
    /// Zero-based position in the presentation.
    pub index: usize,
    /// Credential id.
    pub id: String,
    /// Outcome.
    pub verdict: Verdict,
}

/// Outcome of verifying a presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentationVerification {
    /// Holder proof outcome.
    pub holder: Verdict,
    /// One entry per embedded credential, in order.
    pub credentials: Vec<CredentialCheck>,
}

impl PresentationVerification {
    /// True only if the holder proof and every credential are valid.
    pub fn is_valid(&self) -> bool {
        self.holder.is_valid() && self.credentials.iter().all(|c| c.verdict.is_valid())
    }

    /// Credentials that did not verify.
    pub fn failures(&self) -> Vec<&CredentialCheck> {
        self.credentials
            .iter()
            .filter(|c| !c.verdict.is_valid())
            .collect()
    }
}
