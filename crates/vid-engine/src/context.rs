//! # Session Context
//!
//! [`Configuration`] is the host's bootstrap input; [`Context`] is the
//! capability token `Engine::init` returns and every operation requires.
//!
//! ## Security Invariant
//!
//! Client secrets are zeroized on drop and never appear in `Debug` output.
//! A context is only honoured while its session is open and its secret still
//! matches the secret enrolled for its client id.

use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use vid_core::{ClientId, SessionId};

/// Session bootstrap input. Immutable once built.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Configuration {
    client_id: String,
    client_secret: String,
}

impl Configuration {
    /// New bootstrap input.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// The caller's identity reference.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// The shared secret.
    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }
}

impl std::fmt::Debug for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Configuration")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// A bound session.
#[derive(Clone)]
pub struct Context {
    session: SessionId,
    client_id: ClientId,
    secret: Zeroizing<Vec<u8>>,
}

impl Context {
    pub(crate) fn new(session: SessionId, client_id: ClientId, secret: &[u8]) -> Self {
        Self {
            session,
            client_id,
            secret: Zeroizing::new(secret.to_vec()),
        }
    }

    /// Session identifier.
    pub fn session_id(&self) -> SessionId {
        self.session
    }

    /// Client this session belongs to.
    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    pub(crate) fn secret(&self) -> &[u8] {
        &self.secret
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("session", &self.session)
            .field("client_id", &self.client_id)
            .field("secret", &"<redacted>")
            .finish()
    }
}
