//! # Engine
//!
//! One [`Engine`] owns a capability registry, the cipher core built on it,
//! the DID store and the credential service. Hosts register handlers, open
//! sessions with [`Engine::init`], then call one typed method per operation.
//!
//! ## Session model
//!
//! ```text
//! register_handler()* ──▶ init(config) ──▶ Context ──▶ operations … ──▶ close(ctx)
//! ```
//!
//! The first `init` for a client id enrols an HMAC-SHA256 verifier of its
//! secret (keyed by the client id). Later sessions for the same client must
//! present the same secret. Every operation re-checks its context: the
//! session must be open, belong to the context's client, and carry the
//! enrolled secret.
//!
//! ## Diagnostics
//!
//! Every operation emits `"<op> (BEGIN)"` and `"<op> ( END )"` to the debug
//! sink at [`LogLevel::Debug`], and failures at [`LogLevel::Error`]. Session
//! management does not touch the sink, so `init` leaves the registry open for
//! registration. The context is checked before the sink is resolved: a call
//! rejected with `Context` only logs through `tracing` and leaves the
//! registry unsealed.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use vid_core::{ClientId, SessionId};
use vid_crypto::{
    CapabilityRegistry, Cipher, DerivationPath, Handler, KeyPair, LogLevel, SecretKey, Signature,
};
use vid_did::{DidDocument, DidService, DidUpdate, TransitionRecord};
use vid_vc::{
    CredentialRequest, PresentationVerification, VcService, VerifiableCredential,
    VerifiablePresentation, Verdict,
};

use crate::boundary::BufferTable;
use crate::config::EngineConfig;
use crate::context::{Configuration, Context};
use crate::error::EngineError;

/// The identity engine.
pub struct Engine {
    config: EngineConfig,
    capabilities: Arc<CapabilityRegistry>,
    cipher: Arc<Cipher>,
    dids: Arc<DidService>,
    vcs: VcService,
    sessions: RwLock<HashMap<SessionId, ClientId>>,
    enrolled: RwLock<HashMap<ClientId, [u8; 32]>>,
    pub(crate) buffers: BufferTable,
}

impl Engine {
    /// Engine with a fresh, empty capability registry.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        Self::with_capabilities(config, Arc::new(CapabilityRegistry::new()))
    }

    /// Engine over a caller-built registry.
    pub fn with_capabilities(
        config: EngineConfig,
        capabilities: Arc<CapabilityRegistry>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let cipher = Arc::new(
            Cipher::new(Arc::clone(&capabilities), config.scrypt)
                .map_err(|e| EngineError::Config(e.to_string()))?,
        );
        let dids = Arc::new(
            DidService::new(Arc::clone(&cipher), config.did_method.clone())
                .map_err(|e| EngineError::Config(e.to_string()))?,
        );
        Ok(Self {
            vcs: VcService::new(Arc::clone(&dids)),
            config,
            capabilities,
            cipher,
            dids,
            sessions: RwLock::new(HashMap::new()),
            enrolled: RwLock::new(HashMap::new()),
            buffers: BufferTable::default(),
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The engine's capability registry.
    pub fn capabilities(&self) -> &Arc<CapabilityRegistry> {
        &self.capabilities
    }

    /// Install a host handler. Fails once any operation has run.
    pub fn register_handler(&self, slot_name: &str, handler: Handler) -> Result<(), EngineError> {
        self.capabilities.register(slot_name, handler)?;
        Ok(())
    }

    // ─── Sessions ────────────────────────────────────────────────────

    /// Open a session.
    ///
    /// # Errors
    ///
    /// `Config` for a blank client id or secret, a secret that differs from
    /// the one enrolled for the client, or when `max_sessions` are open.
    pub fn init(&self, configuration: &Configuration) -> Result<Context, EngineError> {
        let client_id = ClientId::new(configuration.client_id())
            .map_err(|e| EngineError::Config(e.to_string()))?;
        let secret = configuration.client_secret().as_bytes();
        if configuration.client_secret().trim().is_empty() {
            return Err(EngineError::Config("client secret must not be blank".into()));
        }

        let mut sessions = self.sessions.write();
        if sessions.len() >= self.config.max_sessions {
            return Err(EngineError::Config(format!(
                "session limit of {} reached",
                self.config.max_sessions
            )));
        }
        {
            let mut enrolled = self.enrolled.write();
            match enrolled.get(&client_id) {
                Some(tag) => {
                    if !self.cipher.digest_verify(secret, tag, client_id.as_str().as_bytes())? {
                        return Err(EngineError::Config(format!(
                            "client secret for {client_id} does not match the enrolled secret"
                        )));
                    }
                }
                None => {
                    let tag = self.cipher.digest(secret, client_id.as_str().as_bytes())?;
                    enrolled.insert(client_id.clone(), tag);
                    tracing::debug!(client = %client_id, "client enrolled");
                }
            }
        }

        let session = SessionId::new();
        sessions.insert(session, client_id.clone());
        tracing::info!(client = %client_id, %session, "session opened");
        Ok(Context::new(session, client_id, secret))
    }

    /// End a session. The context is unusable afterwards.
    pub fn close(&self, ctx: &Context) -> Result<(), EngineError> {
        self.authorize(ctx)?;
        self.sessions.write().remove(&ctx.session_id());
        tracing::info!(client = %ctx.client_id(), session = %ctx.session_id(), "session closed");
        Ok(())
    }

    /// Number of open sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }

    pub(crate) fn authorize(&self, ctx: &Context) -> Result<(), EngineError> {
        match self.sessions.read().get(&ctx.session_id()) {
            Some(owner) if owner == ctx.client_id() => {}
            Some(_) => {
                return Err(EngineError::Context(format!(
                    "{} is not bound to client {}",
                    ctx.session_id(),
                    ctx.client_id()
                )))
            }
            None => {
                return Err(EngineError::Context(format!("{} is not open", ctx.session_id())))
            }
        }
        let tag = self
            .enrolled
            .read()
            .get(ctx.client_id())
            .copied()
            .ok_or_else(|| EngineError::Context(format!("client {} is not enrolled", ctx.client_id())))?;
        if !self
            .cipher
            .digest_verify(ctx.secret(), &tag, ctx.client_id().as_str().as_bytes())?
        {
            return Err(EngineError::Context("context secret does not match".into()));
        }
        Ok(())
    }

    fn run<T>(
        &self,
        op: &'static str,
        ctx: &Context,
        f: impl FnOnce(&ClientId) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        if let Err(e) = self.authorize(ctx) {
            tracing::warn!(op, session = %ctx.session_id(), "rejected: {e}");
            return Err(e);
        }
        let sink = self.capabilities.debug_sink();
        sink.emit(LogLevel::Debug, &format!("{op} (BEGIN)"));
        let result = f(ctx.client_id());
        if let Err(e) = &result {
            sink.emit(LogLevel::Error, &format!("{op} failed [{}]: {e}", e.code()));
        }
        sink.emit(LogLevel::Debug, &format!("{op} ( END )"));
        result
    }

    // ─── DID ─────────────────────────────────────────────────────────

    /// Create the context's DID.
    ///
    /// `InvalidState` if the client already has one.
    pub fn create_did(&self, ctx: &Context) -> Result<DidDocument, EngineError> {
        self.run("create_did", ctx, |client| Ok(self.dids.create(client)?))
    }

    /// Create the context's DID from the signing branch of a BIP39 phrase.
    ///
    /// Recreating from the same phrase yields the same DID and key.
    /// `InvalidArgument` for a phrase that does not parse or a DID already
    /// held by another client.
    pub fn create_did_from_mnemonic(&self, ctx: &Context, phrase: &str) -> Result<DidDocument, EngineError> {
        self.run("create_did_from_mnemonic", ctx, |client| {
            Ok(self.dids.create_from_mnemonic(client, phrase)?)
        })
    }

    /// Current document of the context's DID.
    pub fn resolve_did(&self, ctx: &Context) -> Result<DidDocument, EngineError> {
        self.run("resolve_did", ctx, |client| Ok(self.dids.resolve(client)?))
    }

    /// Apply `update` to the context's DID.
    ///
    /// `InvalidState` once revoked; `InvalidArgument` for an empty or
    /// inconsistent update.
    pub fn update_did(&self, ctx: &Context, update: &DidUpdate) -> Result<DidDocument, EngineError> {
        self.run("update_did", ctx, |client| Ok(self.dids.update(client, update)?))
    }

    /// Revoke the context's DID. A second revoke is `InvalidState`.
    pub fn revoke_did(&self, ctx: &Context, reason: Option<String>) -> Result<DidDocument, EngineError> {
        self.run("revoke_did", ctx, |client| Ok(self.dids.revoke(client, reason)?))
    }

    /// Transition audit trail of the context's DID.
    pub fn did_history(&self, ctx: &Context) -> Result<Vec<TransitionRecord>, EngineError> {
        self.run("did_history", ctx, |client| Ok(self.dids.history(client)?))
    }

    // ─── Credentials ─────────────────────────────────────────────────

    /// Issue a credential from the context's DID.
    pub fn create_credentials(
        &self,
        ctx: &Context,
        request: &CredentialRequest,
    ) -> Result<VerifiableCredential, EngineError> {
        self.run("create_credentials", ctx, |client| Ok(self.vcs.issue(client, request)?))
    }

    /// Wrap `credentials` in a presentation held by the context's DID.
    pub fn create_presentations(
        &self,
        ctx: &Context,
        credentials: Vec<VerifiableCredential>,
    ) -> Result<VerifiablePresentation, EngineError> {
        self.run("create_presentations", ctx, |client| {
            Ok(self.vcs.present(client, credentials)?)
        })
    }

    /// Verify one credential against its issuer's current document.
    pub fn verify_credentials(
        &self,
        ctx: &Context,
        credential: &VerifiableCredential,
    ) -> Result<Verdict, EngineError> {
        self.run("verify_credentials", ctx, |_| Ok(self.vcs.verify_credential(credential)?))
    }

    /// Verify a presentation and each credential in it.
    pub fn verify_presentations(
        &self,
        ctx: &Context,
        presentation: &VerifiablePresentation,
    ) -> Result<PresentationVerification, EngineError> {
        self.run("verify_presentations", ctx, |_| {
            Ok(self.vcs.verify_presentation(presentation)?)
        })
    }

    // ─── Cipher ──────────────────────────────────────────────────────

    /// Fresh secp256k1 keypair.
    pub fn keypair_generate(&self, ctx: &Context) -> Result<KeyPair, EngineError> {
        self.run("keypair_generate", ctx, |_| Ok(self.cipher.keypair_generate()?))
    }

    /// Keypair at `path` derived from a BIP39 phrase.
    pub fn keypair_from_mnemonic(
        &self,
        ctx: &Context,
        phrase: &str,
        path: &DerivationPath,
    ) -> Result<KeyPair, EngineError> {
        self.run("keypair_from_mnemonic", ctx, |_| {
            Ok(self.cipher.keypair_from_mnemonic(phrase, path)?)
        })
    }

    /// Sign `message`.
    pub fn sign(&self, ctx: &Context, message: &[u8], secret_key: &SecretKey) -> Result<Signature, EngineError> {
        self.run("sign", ctx, |_| Ok(self.cipher.sign(message, secret_key)?))
    }

    /// `Ok(false)` for a well-formed signature that does not verify.
    pub fn verify(
        &self,
        ctx: &Context,
        message: &[u8],
        signature: &[u8],
        public_key: &[u8],
    ) -> Result<bool, EngineError> {
        self.run("verify", ctx, |_| Ok(self.cipher.verify(message, signature, public_key)?))
    }

    /// Encrypt under a key derived from `secret`.
    pub fn encrypt(&self, ctx: &Context, plaintext: &[u8], secret: &[u8]) -> Result<Vec<u8>, EngineError> {
        self.run("encrypt", ctx, |_| Ok(self.cipher.encrypt(plaintext, secret)?))
    }

    /// Decrypt; `Crypto` on a wrong secret or tampering.
    pub fn decrypt(&self, ctx: &Context, ciphertext: &[u8], secret: &[u8]) -> Result<Vec<u8>, EngineError> {
        self.run("decrypt", ctx, |_| Ok(self.cipher.decrypt(ciphertext, secret)?))
    }

    /// HMAC-SHA256 keyed digest.
    pub fn digest(&self, ctx: &Context, content: &[u8], secret: &[u8]) -> Result<[u8; 32], EngineError> {
        self.run("digest", ctx, |_| Ok(self.cipher.digest(content, secret)?))
    }

    /// Constant-time keyed digest check.
    pub fn digest_verify(
        &self,
        ctx: &Context,
        content: &[u8],
        digest: &[u8],
        secret: &[u8],
    ) -> Result<bool, EngineError> {
        self.run("digest_verify", ctx, |_| {
            Ok(self.cipher.digest_verify(content, digest, secret)?)
        })
    }

    // ─── Codec ───────────────────────────────────────────────────────

    /// URL-safe padded base64.
    pub fn base64_encode(&self, ctx: &Context, bytes: &[u8]) -> Result<String, EngineError> {
        self.run("base64_encode", ctx, |_| Ok(vid_core::base64_encode(bytes)))
    }

    /// Strict inverse of [`Self::base64_encode`].
    pub fn base64_decode(&self, ctx: &Context, encoded: &str) -> Result<Vec<u8>, EngineError> {
        self.run("base64_decode", ctx, |_| Ok(vid_core::base64_decode(encoded)?))
    }

    /// SHA-256 multihash, base64url.
    pub fn multihash(&self, ctx: &Context, content: &[u8]) -> Result<String, EngineError> {
        self.run("multihash", ctx, |_| Ok(vid_core::multihash(content)))
    }

    /// `length` random bytes; `InvalidArgument` for zero.
    pub fn random_bytes(&self, ctx: &Context, length: usize) -> Result<Vec<u8>, EngineError> {
        self.run("random_bytes", ctx, |_| Ok(self.cipher.random_bytes(length)?))
    }

    /// Fresh BIP39 phrase of the configured length.
    pub fn bip39_mnemonic(&self, ctx: &Context) -> Result<String, EngineError> {
        self.run("bip39_mnemonic", ctx, |_| {
            Ok(self.cipher.bip39_mnemonic(self.config.mnemonic_words)?)
        })
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("capabilities", &self.capabilities)
            .field("sessions", &self.session_count())
            .field("dids", &self.dids.len())
            .finish()
    }
}
