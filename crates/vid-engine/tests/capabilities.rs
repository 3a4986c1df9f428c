//! Host capability injection through the engine.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use vid_crypto::builtin::{K256Signer, K256Verifier};
use vid_crypto::{CapabilityError, CryptoError, EcdsaSigner, EcdsaVerifier, Handler, LogLevel};
use vid_engine::EngineError;
use vid_vc::Verdict;

struct CountingSigner(Arc<AtomicUsize>);

impl EcdsaSigner for CountingSigner {
    fn sign(&self, secret_key: &[u8], message: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        K256Signer.sign(secret_key, message)
    }
}

struct RejectingVerifier;

impl EcdsaVerifier for RejectingVerifier {
    fn verify(&self, _public_key: &[u8], _message: &[u8], _signature: &[u8]) -> Result<bool, CryptoError> {
        Ok(false)
    }
}

struct BrokenVerifier;

impl EcdsaVerifier for BrokenVerifier {
    fn verify(&self, _public_key: &[u8], _message: &[u8], _signature: &[u8]) -> Result<bool, CryptoError> {
        Err(CryptoError::Handler {
            slot: vid_crypto::CapabilitySlot::EcdsaVerify,
            reason: "secure element offline".into(),
        })
    }
}

#[test]
fn test_debug_sink_sees_operation_boundaries() {
    let engine = common::engine();
    let messages = Arc::new(Mutex::new(Vec::<(LogLevel, String)>::new()));
    let sink = Arc::clone(&messages);
    engine
        .register_handler(
            "debug_message",
            Handler::debug(move |level: LogLevel, message: &str| {
                sink.lock().push((level, message.to_string()));
            }),
        )
        .unwrap();

    let ctx = common::session(&engine, "alice");
    engine.create_did(&ctx).unwrap();
    engine.resolve_did(&ctx).unwrap();

    let log = messages.lock();
    let debug: Vec<&str> = log
        .iter()
        .filter(|(level, _)| *level == LogLevel::Debug)
        .map(|(_, m)| m.as_str())
        .collect();
    assert_eq!(
        debug,
        vec![
            "create_did (BEGIN)",
            "create_did ( END )",
            "resolve_did (BEGIN)",
            "resolve_did ( END )",
        ]
    );
}

#[test]
fn test_failed_operation_is_reported_to_sink() {
    let engine = common::engine();
    let messages = Arc::new(Mutex::new(Vec::<(LogLevel, String)>::new()));
    let sink = Arc::clone(&messages);
    engine
        .register_handler(
            "debug",
            Handler::debug(move |level: LogLevel, message: &str| {
                sink.lock().push((level, message.to_string()));
            }),
        )
        .unwrap();
    let ctx = common::session(&engine, "alice");
    engine.resolve_did(&ctx).unwrap_err();

    let log = messages.lock();
    assert!(log
        .iter()
        .any(|(level, m)| *level == LogLevel::Error && m.starts_with("resolve_did failed [70]")));
    assert_eq!(log.last().map(|(_, m)| m.as_str()), Some("resolve_did ( END )"));
}

#[test]
fn test_injected_signer_is_used_for_issuance() {
    let engine = common::engine();
    let calls = Arc::new(AtomicUsize::new(0));
    engine
        .register_handler("ecdsa_sign", Handler::ecdsa_sign(CountingSigner(Arc::clone(&calls))))
        .unwrap();

    let ctx = common::session(&engine, "alice");
    engine.create_did(&ctx).unwrap();
    let credential = engine.create_credentials(&ctx, &common::role("admin")).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(engine.verify_credentials(&ctx, &credential).unwrap(), Verdict::Valid);
}

#[test]
fn test_injected_verifier_decides_verdict() {
    let engine = common::engine();
    engine
        .register_handler("ecdsa_verify", Handler::ecdsa_verify(RejectingVerifier))
        .unwrap();
    let ctx = common::session(&engine, "alice");
    engine.create_did(&ctx).unwrap();
    let credential = engine.create_credentials(&ctx, &common::role("admin")).unwrap();
    assert_eq!(
        engine.verify_credentials(&ctx, &credential).unwrap(),
        Verdict::InvalidSignature
    );
}

#[test]
fn test_failing_handler_is_an_error_not_a_verdict() {
    let engine = common::engine();
    engine
        .register_handler("ecdsa_verify", Handler::ecdsa_verify(BrokenVerifier))
        .unwrap();
    let ctx = common::session(&engine, "alice");
    engine.create_did(&ctx).unwrap();
    let credential = engine.create_credentials(&ctx, &common::role("admin")).unwrap();
    let err = engine.verify_credentials(&ctx, &credential).unwrap_err();
    assert_eq!(err.kind(), "CryptoError");

    // The engine stays usable.
    assert!(engine.resolve_did(&ctx).is_ok());
}

#[test]
fn test_registration_rules() {
    let engine = common::engine();
    let noop = || Handler::debug(|_: LogLevel, _: &str| {});

    let err = engine.register_handler("gpu", noop()).unwrap_err();
    assert!(matches!(err, EngineError::Capability(CapabilityError::UnknownSlot(_))));

    let err = engine.register_handler("ecdsa_sign", noop()).unwrap_err();
    assert!(matches!(err, EngineError::Capability(CapabilityError::ShapeMismatch { .. })));

    engine.register_handler("debug", noop()).unwrap();
    let err = engine.register_handler("debug_message", noop()).unwrap_err();
    assert!(matches!(err, EngineError::Capability(CapabilityError::AlreadyRegistered(_))));
    assert_eq!(err.code(), 30);
}

#[test]
fn test_registration_closes_after_first_operation() {
    let engine = common::engine();
    let ctx = common::session(&engine, "alice");
    engine.random_bytes(&ctx, 8).unwrap();

    let err = engine
        .register_handler("ecdsa_verify", Handler::ecdsa_verify(K256Verifier))
        .unwrap_err();
    assert!(matches!(err, EngineError::Capability(CapabilityError::Sealed(_))));
    assert!(engine.random_bytes(&ctx, 8).is_ok());
}

#[test]
fn test_engines_do_not_share_handlers() {
    let a = common::engine();
    let b = common::engine();
    a.register_handler("ecdsa_verify", Handler::ecdsa_verify(RejectingVerifier))
        .unwrap();

    let ctx_a = common::session(&a, "alice");
    let ctx_b = common::session(&b, "alice");
    let kp = b.keypair_generate(&ctx_b).unwrap();
    let sig = b.sign(&ctx_b, b"msg", &kp.secret_key).unwrap();

    assert!(b.verify(&ctx_b, b"msg", sig.as_bytes(), kp.public_key.as_bytes()).unwrap());
    assert!(!a.verify(&ctx_a, b"msg", sig.as_bytes(), kp.public_key.as_bytes()).unwrap());
}

#[test]
fn test_injected_random_source_feeds_random_bytes() {
    let engine = common::engine();
    engine
        .register_handler(
            "crypto_trng",
            Handler::random(|dest: &mut [u8]| -> Result<(), CryptoError> {
                dest.fill(0xab);
                Ok(())
            }),
        )
        .unwrap();
    let ctx = common::session(&engine, "alice");
    assert_eq!(engine.random_bytes(&ctx, 4).unwrap(), vec![0xab; 4]);
}

#[test]
fn test_entropy_failure_is_crypto_error() {
    let engine = common::engine();
    engine
        .register_handler(
            "random",
            Handler::random(|_: &mut [u8]| -> Result<(), CryptoError> {
                Err(CryptoError::EntropyUnavailable("TRNG not ready".into()))
            }),
        )
        .unwrap();
    let ctx = common::session(&engine, "alice");
    assert_eq!(engine.keypair_generate(&ctx).unwrap_err().kind(), "CryptoError");
    assert_eq!(engine.bip39_mnemonic(&ctx).unwrap_err().kind(), "CryptoError");
    assert_eq!(engine.create_did(&ctx).unwrap_err().kind(), "CryptoError");
}
