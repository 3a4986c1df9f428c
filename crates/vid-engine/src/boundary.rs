//! # Request Boundary
//!
//! The external surface of the engine: a JSON [`Request`] goes in, a
//! [`BufferHandle`] to the JSON result comes out. Result bytes live in
//! buffers obtained from the `allocator` capability until the caller
//! releases them.
//!
//! ## Buffer ownership
//!
//! ```text
//! dispatch() ──▶ Live(bytes) ──read()*──▶ dispose() ──▶ Disposed (tombstone)
//!                                                          │
//!                                  read()/dispose() ──▶ UseAfterFree
//! ```
//!
//! The engine never frees a buffer on its own. `dispose` zeroizes the bytes
//! before handing them to the `deallocator` capability, and the tombstone
//! keeps a stale handle from being mistaken for an unknown one.
//!
//! Tombstones hold no bytes, but one map entry per disposed handle stays for
//! the life of the engine. That is the price of reporting every double
//! release as `UseAfterFree`; handle numbers are never reused.
//!
//! ## Authorization
//!
//! `dispatch` checks the context before it decodes any request field, so a
//! closed or foreign context is always `Context`, whatever else is wrong
//! with the request.
//!
//! ## Binary fields
//!
//! Messages, plaintexts and secrets are UTF-8 text. Ciphertexts are
//! URL-safe padded base64. Keys, signatures and digests are lowercase hex.
//! Byte results are returned as `{"hex": …, "utf8": …}` with `utf8` null when
//! the bytes are not valid UTF-8.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use zeroize::Zeroize;

use vid_core::codec::{from_hex, to_hex};
use vid_crypto::{CapabilityError, CapabilityRegistry, DerivationPath, SecretKey};
use vid_did::DidUpdate;
use vid_vc::{CredentialRequest, VerifiableCredential, VerifiablePresentation};

use crate::context::Context;
use crate::engine::Engine;
use crate::error::EngineError;

// ─── Buffers ─────────────────────────────────────────────────────────

/// Opaque reference to a result buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BufferHandle(u64);

impl BufferHandle {
    /// Handle from its raw number, e.g. one received back from a host.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw handle number.
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for BufferHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "buffer#{}", self.0)
    }
}

enum Slot {
    Live(Vec<u8>),
    Disposed,
}

/// Handle table for boundary buffers. Disposed entries stay as tombstones.
#[derive(Default)]
pub(crate) struct BufferTable {
    next: AtomicU64,
    slots: Mutex<HashMap<u64, Slot>>,
}

impl BufferTable {
    fn store(&self, capabilities: &CapabilityRegistry, bytes: &[u8]) -> Result<BufferHandle, EngineError> {
        let mut buffer = capabilities.allocator().allocate(bytes.len())?;
        if buffer.len() != bytes.len() {
            return Err(CapabilityError::AllocationFailed {
                requested: bytes.len(),
                reason: format!("allocator returned {} bytes", buffer.len()),
            }
            .into());
        }
        buffer.copy_from_slice(bytes);
        let raw = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        self.slots.lock().insert(raw, Slot::Live(buffer));
        Ok(BufferHandle(raw))
    }

    fn read(&self, handle: BufferHandle) -> Result<Vec<u8>, EngineError> {
        match self.slots.lock().get(&handle.0) {
            Some(Slot::Live(bytes)) => Ok(bytes.clone()),
            Some(Slot::Disposed) => Err(EngineError::UseAfterFree(handle)),
            None => Err(unknown(handle)),
        }
    }

    fn dispose(&self, capabilities: &CapabilityRegistry, handle: BufferHandle) -> Result<(), EngineError> {
        let mut buffer = {
            let mut slots = self.slots.lock();
            let slot = slots.get_mut(&handle.0).ok_or_else(|| unknown(handle))?;
            match std::mem::replace(slot, Slot::Disposed) {
                Slot::Live(bytes) => bytes,
                Slot::Disposed => return Err(EngineError::UseAfterFree(handle)),
            }
        };
        buffer.zeroize();
        capabilities.deallocator().release(buffer);
        Ok(())
    }

    /// Buffers dispatched but not yet disposed.
    pub(crate) fn live(&self) -> usize {
        self.slots
            .lock()
            .values()
            .filter(|slot| matches!(slot, Slot::Live(_)))
            .count()
    }

    /// Disposed handles still remembered.
    pub(crate) fn tombstones(&self) -> usize {
        self.slots
            .lock()
            .values()
            .filter(|slot| matches!(slot, Slot::Disposed))
            .count()
    }
}

fn unknown(handle: BufferHandle) -> EngineError {
    EngineError::InvalidArgument(format!("{handle} was never issued"))
}

// ─── Requests ────────────────────────────────────────────────────────

/// One boundary call, tagged by `op`.
///
/// ```json
/// {"op": "create_credentials", "credential": {"claims": {"role": "admin"}}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    /// Create the context's DID.
    CreateDid,
    /// Create the context's DID from a BIP39 phrase.
    CreateDidFromMnemonic {
        mnemonic: String,
    },
    /// Current document of the context's DID.
    ResolveDid,
    /// Rotate keys or change services.
    UpdateDid {
        update: DidUpdate,
    },
    /// Revoke the context's DID.
    RevokeDid {
        #[serde(default)]
        reason: Option<String>,
    },
    /// Transition audit trail.
    DidHistory,
    /// Issue a credential.
    CreateCredentials {
        credential: CredentialRequest,
    },
    /// Bundle credentials into a presentation.
    CreatePresentations {
        credentials: Vec<VerifiableCredential>,
    },
    /// Verify one credential.
    VerifyCredentials {
        credential: VerifiableCredential,
    },
    /// Verify a presentation.
    VerifyPresentations {
        presentation: VerifiablePresentation,
    },
    /// Fresh keypair (hex).
    KeypairGenerate,
    /// Keypair derived from a BIP39 phrase, on the signing branch unless
    /// `path` is given.
    KeypairFromMnemonic {
        mnemonic: String,
        #[serde(default)]
        path: Option<String>,
    },
    /// Sign a text message with a hex secret key.
    Sign {
        message: String,
        secret_key: String,
    },
    /// Verify a hex signature.
    Verify {
        message: String,
        signature: String,
        public_key: String,
    },
    /// Encrypt text under a secret.
    Encrypt {
        plaintext: String,
        secret: String,
    },
    /// Decrypt base64 ciphertext.
    Decrypt {
        ciphertext: String,
        secret: String,
    },
    /// Keyed digest of text.
    Digest {
        content: String,
        secret: String,
    },
    /// Check a hex keyed digest.
    DigestVerify {
        content: String,
        digest: String,
        secret: String,
    },
    /// Base64-encode text.
    Base64Encode {
        text: String,
    },
    /// Decode base64.
    Base64Decode {
        encoded: String,
    },
    /// Multihash of text.
    Multihash {
        content: String,
    },
    /// Random bytes. Zero or negative lengths are `InvalidArgument`.
    RandomBytes {
        length: i64,
    },
    /// Fresh mnemonic phrase.
    Bip39Mnemonic,
}

impl Request {
    /// The `op` tag.
    pub fn op(&self) -> &'static str {
        match self {
            Self::CreateDid => "create_did",
            Self::CreateDidFromMnemonic { .. } => "create_did_from_mnemonic",
            Self::ResolveDid => "resolve_did",
            Self::UpdateDid { .. } => "update_did",
            Self::RevokeDid { .. } => "revoke_did",
            Self::DidHistory => "did_history",
            Self::CreateCredentials { .. } => "create_credentials",
            Self::CreatePresentations { .. } => "create_presentations",
            Self::VerifyCredentials { .. } => "verify_credentials",
            Self::VerifyPresentations { .. } => "verify_presentations",
            Self::KeypairGenerate => "keypair_generate",
            Self::KeypairFromMnemonic { .. } => "keypair_from_mnemonic",
            Self::Sign { .. } => "sign",
            Self::Verify { .. } => "verify",
            Self::Encrypt { .. } => "encrypt",
            Self::Decrypt { .. } => "decrypt",
            Self::Digest { .. } => "digest",
            Self::DigestVerify { .. } => "digest_verify",
            Self::Base64Encode { .. } => "base64_encode",
            Self::Base64Decode { .. } => "base64_decode",
            Self::Multihash { .. } => "multihash",
            Self::RandomBytes { .. } => "random_bytes",
            Self::Bip39Mnemonic => "bip39_mnemonic",
        }
    }
}

fn bytes_output(bytes: &[u8]) -> Value {
    json!({
        "hex": to_hex(bytes),
        "utf8": std::str::from_utf8(bytes).ok(),
    })
}

// ─── Dispatch ────────────────────────────────────────────────────────

impl Engine {
    /// Run `request` and return a handle to its JSON result.
    pub fn dispatch(&self, ctx: &Context, request: Request) -> Result<BufferHandle, EngineError> {
        let op = request.op();
        if let Err(e) = self.authorize(ctx) {
            tracing::warn!(op, session = %ctx.session_id(), "rejected: {e}");
            return Err(e);
        }
        let value = self.execute(ctx, request)?;
        let mut bytes = serde_json::to_vec(&value)?;
        let handle = self.buffers.store(self.capabilities(), &bytes);
        bytes.zeroize();
        let handle = handle?;
        tracing::debug!(op, %handle, "result buffer issued");
        Ok(handle)
    }

    /// Parse a JSON request and dispatch it. Malformed JSON is `Encoding`.
    pub fn dispatch_json(&self, ctx: &Context, request: &str) -> Result<BufferHandle, EngineError> {
        self.authorize(ctx)?;
        let request: Request = serde_json::from_str(request)?;
        self.dispatch(ctx, request)
    }

    /// Copy out a live buffer.
    pub fn read(&self, handle: BufferHandle) -> Result<Vec<u8>, EngineError> {
        self.buffers.read(handle)
    }

    /// Release a buffer. A second release is `UseAfterFree`.
    pub fn dispose(&self, handle: BufferHandle) -> Result<(), EngineError> {
        self.buffers.dispose(self.capabilities(), handle)?;
        tracing::debug!(%handle, "result buffer disposed");
        Ok(())
    }

    /// Buffers not yet disposed.
    pub fn live_buffers(&self) -> usize {
        self.buffers.live()
    }

    fn execute(&self, ctx: &Context, request: Request) -> Result<Value, EngineError> {
        let value = match request {
            Request::CreateDid => serde_json::to_value(self.create_did(ctx)?)?,
            Request::CreateDidFromMnemonic { mnemonic } => {
                serde_json::to_value(self.create_did_from_mnemonic(ctx, &mnemonic)?)?
            }
            Request::ResolveDid => serde_json::to_value(self.resolve_did(ctx)?)?,
            Request::UpdateDid { update } => serde_json::to_value(self.update_did(ctx, &update)?)?,
            Request::RevokeDid { reason } => serde_json::to_value(self.revoke_did(ctx, reason)?)?,
            Request::DidHistory => serde_json::to_value(self.did_history(ctx)?)?,
            Request::CreateCredentials { credential } => {
                serde_json::to_value(self.create_credentials(ctx, &credential)?)?
            }
            Request::CreatePresentations { credentials } => {
                serde_json::to_value(self.create_presentations(ctx, credentials)?)?
            }
            Request::VerifyCredentials { credential } => {
                let verdict = self.verify_credentials(ctx, &credential)?;
                json!({ "valid": verdict.is_valid(), "verdict": verdict })
            }
            Request::VerifyPresentations { presentation } => {
                let result = self.verify_presentations(ctx, &presentation)?;
                json!({
                    "valid": result.is_valid(),
                    "holder": result.holder,
                    "credentials": result.credentials,
                })
            }
            Request::KeypairGenerate => {
                let keypair = self.keypair_generate(ctx)?;
                json!({
                    "public_key": keypair.public_key.to_hex(),
                    "secret_key": keypair.secret_key.expose_hex().as_str(),
                })
            }
            Request::KeypairFromMnemonic { mnemonic, path } => {
                let path = match path {
                    Some(path) => path.parse::<DerivationPath>()?,
                    None => DerivationPath::sign(),
                };
                let keypair = self.keypair_from_mnemonic(ctx, &mnemonic, &path)?;
                json!({
                    "path": path.to_string(),
                    "public_key": keypair.public_key.to_hex(),
                    "secret_key": keypair.secret_key.expose_hex().as_str(),
                })
            }
            Request::Sign { message, secret_key } => {
                let secret_key = SecretKey::from_hex(&secret_key)?;
                let signature = self.sign(ctx, message.as_bytes(), &secret_key)?;
                json!({ "signature": signature.to_hex() })
            }
            Request::Verify {
                message,
                signature,
                public_key,
            } => {
                let valid = self.verify(
                    ctx,
                    message.as_bytes(),
                    &from_hex(&signature)?,
                    &from_hex(&public_key)?,
                )?;
                json!({ "valid": valid })
            }
            Request::Encrypt { plaintext, secret } => {
                let ciphertext = self.encrypt(ctx, plaintext.as_bytes(), secret.as_bytes())?;
                json!({ "ciphertext": vid_core::base64_encode(&ciphertext) })
            }
            Request::Decrypt { ciphertext, secret } => {
                let ciphertext = vid_core::base64_decode(&ciphertext)?;
                bytes_output(&self.decrypt(ctx, &ciphertext, secret.as_bytes())?)
            }
            Request::Digest { content, secret } => {
                let digest = self.digest(ctx, content.as_bytes(), secret.as_bytes())?;
                json!({ "digest": to_hex(&digest) })
            }
            Request::DigestVerify {
                content,
                digest,
                secret,
            } => {
                let valid =
                    self.digest_verify(ctx, content.as_bytes(), &from_hex(&digest)?, secret.as_bytes())?;
                json!({ "valid": valid })
            }
            Request::Base64Encode { text } => {
                json!({ "encoded": self.base64_encode(ctx, text.as_bytes())? })
            }
            Request::Base64Decode { encoded } => bytes_output(&self.base64_decode(ctx, &encoded)?),
            Request::Multihash { content } => {
                json!({ "multihash": self.multihash(ctx, content.as_bytes())? })
            }
            Request::RandomBytes { length } => {
                let length = usize::try_from(length)
                    .ok()
                    .filter(|&n| n > 0)
                    .ok_or_else(|| EngineError::InvalidArgument(format!("length must be positive, got {length}")))?;
                bytes_output(&self.random_bytes(ctx, length)?)
            }
            Request::Bip39Mnemonic => json!({ "mnemonic": self.bip39_mnemonic(ctx)? }),
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::context::Configuration;

    fn setup() -> (Engine, Context) {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let ctx = engine.init(&Configuration::new("alice", "s3cret")).unwrap();
        (engine, ctx)
    }

    fn result(engine: &Engine, handle: BufferHandle) -> Value {
        serde_json::from_slice(&engine.read(handle).unwrap()).unwrap()
    }

    #[test]
    fn test_request_wire_format() {
        let request: Request = serde_json::from_str(r#"{"op":"create_did"}"#).unwrap();
        assert_eq!(request, Request::CreateDid);
        let request: Request =
            serde_json::from_str(r#"{"op":"random_bytes","length":8}"#).unwrap();
        assert_eq!(request.op(), "random_bytes");
        let json = serde_json::to_value(Request::RevokeDid { reason: None }).unwrap();
        assert_eq!(json["op"], "revoke_did");
        assert!(serde_json::from_str::<Request>(r#"{"op":"launch_rockets"}"#).is_err());
    }

    #[test]
    fn test_dispatch_read_dispose() {
        let (engine, ctx) = setup();
        let handle = engine
            .dispatch(&ctx, Request::Multihash { content: r#"{"k":"UNiD"}"#.into() })
            .unwrap();
        assert_eq!(
            result(&engine, handle)["multihash"],
            "EiCV-xR1ReD5lj1xKLOGjRhlJIqIP17Pjum_CLVjRv9KDA"
        );
        assert_eq!(engine.live_buffers(), 1);
        engine.dispose(handle).unwrap();
        assert_eq!(engine.live_buffers(), 0);
        assert!(matches!(engine.read(handle), Err(EngineError::UseAfterFree(h)) if h == handle));
        assert!(matches!(engine.dispose(handle), Err(EngineError::UseAfterFree(_))));
    }

    #[test]
    fn test_unknown_handle_is_invalid_argument() {
        let (engine, _ctx) = setup();
        let err = engine.dispose(BufferHandle::from_raw(42)).unwrap_err();
        assert_eq!(err.kind(), "InvalidArgument");
        assert_eq!(engine.read(BufferHandle::from_raw(42)).unwrap_err().kind(), "InvalidArgument");
    }

    #[test]
    fn test_malformed_request_is_encoding_error() {
        let (engine, ctx) = setup();
        assert_eq!(engine.dispatch_json(&ctx, "{not json").unwrap_err().kind(), "EncodingError");
        assert_eq!(engine.live_buffers(), 0);
    }

    #[test]
    fn test_failed_operation_issues_no_buffer() {
        let (engine, ctx) = setup();
        let err = engine.dispatch(&ctx, Request::ResolveDid).unwrap_err();
        assert_eq!(err.code(), 70);
        assert_eq!(engine.live_buffers(), 0);
    }

    #[test]
    fn test_sign_and_verify_over_the_boundary() {
        let (engine, ctx) = setup();
        let keys = result(&engine, engine.dispatch(&ctx, Request::KeypairGenerate).unwrap());
        let public_key = keys["public_key"].as_str().unwrap().to_string();
        let secret_key = keys["secret_key"].as_str().unwrap().to_string();
        assert_eq!(public_key.len(), 66);

        let signed = engine
            .dispatch(
                &ctx,
                Request::Sign {
                    message: "hello".into(),
                    secret_key,
                },
            )
            .unwrap();
        let signature = result(&engine, signed)["signature"].as_str().unwrap().to_string();
        let verified = engine
            .dispatch(
                &ctx,
                Request::Verify {
                    message: "hello".into(),
                    signature,
                    public_key,
                },
            )
            .unwrap();
        assert_eq!(result(&engine, verified)["valid"], true);
    }

    #[test]
    fn test_closed_context_is_checked_before_fields() {
        let (engine, ctx) = setup();
        engine.close(&ctx).unwrap();
        let requests = [
            Request::Sign { message: "m".into(), secret_key: "zz".into() },
            Request::Decrypt { ciphertext: "***".into(), secret: "pw".into() },
            Request::RandomBytes { length: -1 },
            Request::KeypairFromMnemonic { mnemonic: "nope".into(), path: Some("q/1".into()) },
        ];
        for request in requests {
            assert_eq!(engine.dispatch(&ctx, request).unwrap_err().kind(), "ContextError");
        }
        assert_eq!(engine.dispatch_json(&ctx, "{not json").unwrap_err().kind(), "ContextError");
        assert!(!engine.capabilities().is_sealed());
    }

    #[test]
    fn test_random_bytes_length_must_be_positive() {
        let (engine, ctx) = setup();
        for length in ["-1", "0", "-9223372036854775808"] {
            let request = format!(r#"{{"op":"random_bytes","length":{length}}}"#);
            let err = engine.dispatch_json(&ctx, &request).unwrap_err();
            assert_eq!(err.kind(), "InvalidArgument", "{length}");
        }
        let handle = engine.dispatch_json(&ctx, r#"{"op":"random_bytes","length":3}"#).unwrap();
        assert_eq!(result(&engine, handle)["hex"].as_str().unwrap().len(), 6);
        assert_eq!(engine.live_buffers(), 1);
    }

    #[test]
    fn test_keypair_from_mnemonic_over_the_boundary() {
        let (engine, ctx) = setup();
        let phrase = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
        let request = serde_json::json!({ "op": "keypair_from_mnemonic", "mnemonic": phrase });
        let keys = result(&engine, engine.dispatch_json(&ctx, &request.to_string()).unwrap());
        assert_eq!(keys["path"], "m/44'/0'/0'/0/10");
        assert_eq!(
            keys["secret_key"],
            "15bc3384414c6e9eab4e0ef17b656188b4c427f7954b0beb6066bf734e8216e0"
        );

        let request = serde_json::json!({
            "op": "keypair_from_mnemonic", "mnemonic": phrase, "path": "m/44'/0'/0'/0/20"
        });
        let keys = result(&engine, engine.dispatch_json(&ctx, &request.to_string()).unwrap());
        assert_eq!(
            keys["public_key"],
            "021f1725cf4b3f465ee29cf99c57b6e8cb7912e65a3be2ff1011e8836230d0d329"
        );

        let request = serde_json::json!({ "op": "keypair_from_mnemonic", "mnemonic": phrase, "path": "44/0" });
        assert_eq!(engine.dispatch_json(&ctx, &request.to_string()).unwrap_err().kind(), "InvalidArgument");
    }

    #[test]
    fn test_disposed_handles_leave_empty_tombstones() {
        let (engine, ctx) = setup();
        let handles: Vec<_> = (0..16)
            .map(|_| engine.dispatch(&ctx, Request::Bip39Mnemonic).unwrap())
            .collect();
        for handle in &handles {
            engine.dispose(*handle).unwrap();
        }
        assert_eq!(engine.live_buffers(), 0);
        assert_eq!(engine.buffers.tombstones(), 16);
        assert!(handles
            .iter()
            .all(|h| matches!(engine.dispose(*h), Err(EngineError::UseAfterFree(_)))));
        assert_eq!(engine.buffers.tombstones(), 16);
    }

    #[test]
    fn test_bytes_output_shape() {
        let (engine, ctx) = setup();
        let handle = engine
            .dispatch(&ctx, Request::Base64Decode { encoded: "aGk=".into() })
            .unwrap();
        let out = result(&engine, handle);
        assert_eq!(out["hex"], "6869");
        assert_eq!(out["utf8"], "hi");
        assert_eq!(bytes_output(&[0xff])["utf8"], Value::Null);
    }
}
