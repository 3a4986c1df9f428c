//! # Capability Registry
//!
//! The host injects hardware-backed or platform-specific implementations of
//! memory management, diagnostics, AES, ECDSA and randomness through a
//! [`CapabilityRegistry`]. The rest of the engine only ever talks to the
//! typed traits defined here and never names a concrete implementation.
//!
//! ## Lifecycle
//!
//! ```text
//! new() ──register()*──▶ first resolve() ──▶ sealed
//!                                │
//!                                └─ register() now fails with Sealed
//! ```
//!
//! - Each slot is either empty (the built-in default is used) or holds
//!   exactly one injected handler. Registering a slot twice fails with
//!   `AlreadyRegistered`. There is no last-write-wins.
//! - The first `resolve` seals the registry. Registration is an
//!   initialization-phase activity and concurrent registration during
//!   operation is rejected, not raced.
//! - `resolve` never fails. An empty slot resolves to the default.
//!
//! ## Security Invariant
//!
//! Registries are values, not process-wide state. Two engines built from two
//! registries never observe each other's handlers.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use zeroize::Zeroizing;

use crate::builtin::{
    AesGcmSiv, HeapAllocator, K256KeypairGenerator, K256Signer, K256Verifier, OsRandom,
    TracingSink, ZeroizingDeallocator,
};
use crate::error::{CapabilityError, CryptoError};

// ─── Slots ───────────────────────────────────────────────────────────

/// Named capability slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CapabilitySlot {
    /// Boundary buffer allocation.
    Allocator,
    /// Boundary buffer release.
    Deallocator,
    /// Diagnostic message sink.
    Debug,
    /// AES-256 authenticated encryption.
    AesEncrypt,
    /// AES-256 authenticated decryption.
    AesDecrypt,
    /// ECDSA signing.
    EcdsaSign,
    /// ECDSA verification.
    EcdsaVerify,
    /// ECDSA keypair generation.
    EcdsaKeypair,
    /// Cryptographically secure random bytes.
    Random,
}

impl CapabilitySlot {
    /// Every slot, in registration-table order.
    pub const ALL: [CapabilitySlot; 9] = [
        Self::Allocator,
        Self::Deallocator,
        Self::Debug,
        Self::AesEncrypt,
        Self::AesDecrypt,
        Self::EcdsaSign,
        Self::EcdsaVerify,
        Self::EcdsaKeypair,
        Self::Random,
    ];

    /// Canonical slot name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Allocator => "allocator",
            Self::Deallocator => "deallocator",
            Self::Debug => "debug",
            Self::AesEncrypt => "aes_encrypt",
            Self::AesDecrypt => "aes_decrypt",
            Self::EcdsaSign => "ecdsa_sign",
            Self::EcdsaVerify => "ecdsa_verify",
            Self::EcdsaKeypair => "ecdsa_keypair",
            Self::Random => "random",
        }
    }
}

impl std::fmt::Display for CapabilitySlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CapabilitySlot {
    type Err = CapabilityError;

    /// Accepts canonical names and the legacy handler names
    /// (`memory_alloc`, `memory_dealloc`, `debug_message`, `crypto_trng`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "allocator" | "memory_alloc" => Ok(Self::Allocator),
            "deallocator" | "memory_dealloc" => Ok(Self::Deallocator),
            "debug" | "debug_message" => Ok(Self::Debug),
            "aes_encrypt" => Ok(Self::AesEncrypt),
            "aes_decrypt" => Ok(Self::AesDecrypt),
            "ecdsa_sign" => Ok(Self::EcdsaSign),
            "ecdsa_verify" => Ok(Self::EcdsaVerify),
            "ecdsa_keypair" => Ok(Self::EcdsaKeypair),
            "random" | "crypto_trng" => Ok(Self::Random),
            other => Err(CapabilityError::UnknownSlot(other.to_string())),
        }
    }
}

/// Severity passed to the debug sink. Codes match the host-side ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum LogLevel {
    /// System is unusable.
    Emergency = 0x00,
    /// Immediate action required.
    Alert = 0x10,
    /// Critical condition.
    Critical = 0x20,
    /// Error condition.
    Error = 0x30,
    /// Warning condition.
    Warning = 0x40,
    /// Normal but significant.
    Notice = 0x50,
    /// Informational.
    Info = 0x60,
    /// Debug-level detail.
    Debug = 0x70,
}

impl LogLevel {
    /// Numeric level code.
    pub fn code(self) -> u8 {
        self as u8
    }
}

// ─── Capability Traits ───────────────────────────────────────────────

/// Allocates zero-filled buffers of exactly `size` bytes.
pub trait MemoryAllocator: Send + Sync {
    /// Allocate a buffer.
    fn allocate(&self, size: usize) -> Result<Vec<u8>, CapabilityError>;
}

/// Takes back buffers produced by the paired allocator.
pub trait MemoryDeallocator: Send + Sync {
    /// Release a buffer. The engine has already zeroized it.
    fn release(&self, buffer: Vec<u8>);
}

/// Receives diagnostic messages.
pub trait DebugSink: Send + Sync {
    /// Emit one message.
    fn emit(&self, level: LogLevel, message: &str);
}

/// AES-256 AEAD encryption. Output is ciphertext with the tag appended.
pub trait AesEncryptor: Send + Sync {
    /// Encrypt `plaintext` under `key` and `nonce`.
    fn encrypt(&self, key: &[u8; 32], nonce: &[u8; 12], plaintext: &[u8])
        -> Result<Vec<u8>, CryptoError>;
}

/// AES-256 AEAD decryption. Must fail on tag mismatch.
pub trait AesDecryptor: Send + Sync {
    /// Decrypt `ciphertext` (tag appended) under `key` and `nonce`.
    fn decrypt(&self, key: &[u8; 32], nonce: &[u8; 12], ciphertext: &[u8])
        -> Result<Vec<u8>, CryptoError>;
}

/// ECDSA signing over a message. Returns a 64-byte `r‖s` signature.
pub trait EcdsaSigner: Send + Sync {
    /// Sign `message` with the 32-byte `secret_key`.
    fn sign(&self, secret_key: &[u8], message: &[u8]) -> Result<Vec<u8>, CryptoError>;
}

/// ECDSA verification. `Ok(false)` for a well-formed signature that does
/// not verify.
pub trait EcdsaVerifier: Send + Sync {
    /// Verify `signature` over `message` with a SEC1 `public_key`.
    fn verify(&self, public_key: &[u8], message: &[u8], signature: &[u8])
        -> Result<bool, CryptoError>;
}

/// Raw keypair output of a keypair generator.
pub struct RawKeypair {
    /// SEC1 public key (compressed or uncompressed).
    pub public_key: Vec<u8>,
    /// 32-byte secret scalar.
    pub secret_key: Zeroizing<Vec<u8>>,
}

/// ECDSA keypair generation.
pub trait EcdsaKeypairGenerator: Send + Sync {
    /// Generate a fresh keypair.
    fn generate(&self) -> Result<RawKeypair, CryptoError>;
}

/// Cryptographically secure randomness.
pub trait RandomSource: Send + Sync {
    /// Fill `dest` entirely or fail.
    fn fill(&self, dest: &mut [u8]) -> Result<(), CryptoError>;
}

// ─── Closure Adapters ────────────────────────────────────────────────

impl<F> MemoryAllocator for F
where
    F: Fn(usize) -> Result<Vec<u8>, CapabilityError> + Send + Sync,
{
    fn allocate(&self, size: usize) -> Result<Vec<u8>, CapabilityError> {
        self(size)
    }
}

impl<F> MemoryDeallocator for F
where
    F: Fn(Vec<u8>) + Send + Sync,
{
    fn release(&self, buffer: Vec<u8>) {
        self(buffer)
    }
}

impl<F> DebugSink for F
where
    F: Fn(LogLevel, &str) + Send + Sync,
{
    fn emit(&self, level: LogLevel, message: &str) {
        self(level, message)
    }
}

impl<F> RandomSource for F
where
    F: Fn(&mut [u8]) -> Result<(), CryptoError> + Send + Sync,
{
    fn fill(&self, dest: &mut [u8]) -> Result<(), CryptoError> {
        self(dest)
    }
}

// ─── Handler ─────────────────────────────────────────────────────────

/// A handler for exactly one slot.
#[derive(Clone)]
pub enum Handler {
    /// See [`MemoryAllocator`].
    Allocator(Arc<dyn MemoryAllocator>),
    /// See [`MemoryDeallocator`].
    Deallocator(Arc<dyn MemoryDeallocator>),
    /// See [`DebugSink`].
    Debug(Arc<dyn DebugSink>),
    /// See [`AesEncryptor`].
    AesEncrypt(Arc<dyn AesEncryptor>),
    /// See [`AesDecryptor`].
    AesDecrypt(Arc<dyn AesDecryptor>),
    /// See [`EcdsaSigner`].
    EcdsaSign(Arc<dyn EcdsaSigner>),
    /// See [`EcdsaVerifier`].
    EcdsaVerify(Arc<dyn EcdsaVerifier>),
    /// See [`EcdsaKeypairGenerator`].
    EcdsaKeypair(Arc<dyn EcdsaKeypairGenerator>),
    /// See [`RandomSource`].
    Random(Arc<dyn RandomSource>),
}

impl Handler {
    /// The slot this handler implements.
    pub fn slot(&self) -> CapabilitySlot {
        match self {
            Self::Allocator(_) => CapabilitySlot::Allocator,
            Self::Deallocator(_) => CapabilitySlot::Deallocator,
            Self::Debug(_) => CapabilitySlot::Debug,
            Self::AesEncrypt(_) => CapabilitySlot::AesEncrypt,
            Self::AesDecrypt(_) => CapabilitySlot::AesDecrypt,
            Self::EcdsaSign(_) => CapabilitySlot::EcdsaSign,
            Self::EcdsaVerify(_) => CapabilitySlot::EcdsaVerify,
            Self::EcdsaKeypair(_) => CapabilitySlot::EcdsaKeypair,
            Self::Random(_) => CapabilitySlot::Random,
        }
    }

    /// Wrap an allocator.
    pub fn allocator(h: impl MemoryAllocator + 'static) -> Self {
        Self::Allocator(Arc::new(h))
    }

    /// Wrap a deallocator.
    pub fn deallocator(h: impl MemoryDeallocator + 'static) -> Self {
        Self::Deallocator(Arc::new(h))
    }

    /// Wrap a debug sink.
    pub fn debug(h: impl DebugSink + 'static) -> Self {
        Self::Debug(Arc::new(h))
    }

    /// Wrap an AES encryptor.
    pub fn aes_encrypt(h: impl AesEncryptor + 'static) -> Self {
        Self::AesEncrypt(Arc::new(h))
    }

    /// Wrap an AES decryptor.
    pub fn aes_decrypt(h: impl AesDecryptor + 'static) -> Self {
        Self::AesDecrypt(Arc::new(h))
    }

    /// Wrap an ECDSA signer.
    pub fn ecdsa_sign(h: impl EcdsaSigner + 'static) -> Self {
        Self::EcdsaSign(Arc::new(h))
    }

    /// Wrap an ECDSA verifier.
    pub fn ecdsa_verify(h: impl EcdsaVerifier + 'static) -> Self {
        Self::EcdsaVerify(Arc::new(h))
    }

    /// Wrap an ECDSA keypair generator.
    pub fn ecdsa_keypair(h: impl EcdsaKeypairGenerator + 'static) -> Self {
        Self::EcdsaKeypair(Arc::new(h))
    }

    /// Wrap a random source.
    pub fn random(h: impl RandomSource + 'static) -> Self {
        Self::Random(Arc::new(h))
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Handler({})", self.slot())
    }
}

// ─── Registry ────────────────────────────────────────────────────────

/// Table of injected handlers with built-in fallbacks.
#[derive(Default)]
pub struct CapabilityRegistry {
    slots: RwLock<HashMap<CapabilitySlot, Handler>>,
    sealed: AtomicBool,
}

impl CapabilityRegistry {
    /// An empty, unsealed registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler by slot name.
    ///
    /// # Errors
    ///
    /// `UnknownSlot`, `ShapeMismatch`, `AlreadyRegistered` or `Sealed`.
    pub fn register(&self, slot_name: &str, handler: Handler) -> Result<(), CapabilityError> {
        let slot = slot_name.parse::<CapabilitySlot>()?;
        self.register_slot(slot, handler)
    }

    /// Register a handler for a typed slot.
    pub fn register_slot(&self, slot: CapabilitySlot, handler: Handler) -> Result<(), CapabilityError> {
        if handler.slot() != slot {
            return Err(CapabilityError::ShapeMismatch {
                slot,
                provided: handler.slot(),
            });
        }
        let mut slots = self.slots.write();
        if self.sealed.load(Ordering::Acquire) {
            tracing::warn!(%slot, "rejected registration on sealed capability registry");
            return Err(CapabilityError::Sealed(slot));
        }
        if slots.contains_key(&slot) {
            return Err(CapabilityError::AlreadyRegistered(slot));
        }
        slots.insert(slot, handler);
        tracing::debug!(%slot, "capability handler registered");
        Ok(())
    }

    /// Seal the registry. Idempotent.
    pub fn seal(&self) {
        if !self.sealed.load(Ordering::Acquire) {
            let _guard = self.slots.write();
            if !self.sealed.swap(true, Ordering::AcqRel) {
                tracing::debug!("capability registry sealed");
            }
        }
    }

    /// Whether registration is closed.
    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    /// Whether a host handler occupies `slot`.
    pub fn is_injected(&self, slot: CapabilitySlot) -> bool {
        self.slots.read().contains_key(&slot)
    }

    /// The active handler for `slot`: injected if present, else the default.
    /// Seals the registry.
    pub fn resolve(&self, slot: CapabilitySlot) -> Handler {
        match slot {
            CapabilitySlot::Allocator => Handler::Allocator(self.allocator()),
            CapabilitySlot::Deallocator => Handler::Deallocator(self.deallocator()),
            CapabilitySlot::Debug => Handler::Debug(self.debug_sink()),
            CapabilitySlot::AesEncrypt => Handler::AesEncrypt(self.aes_encryptor()),
            CapabilitySlot::AesDecrypt => Handler::AesDecrypt(self.aes_decryptor()),
            CapabilitySlot::EcdsaSign => Handler::EcdsaSign(self.ecdsa_signer()),
            CapabilitySlot::EcdsaVerify => Handler::EcdsaVerify(self.ecdsa_verifier()),
            CapabilitySlot::EcdsaKeypair => Handler::EcdsaKeypair(self.ecdsa_keypair_generator()),
            CapabilitySlot::Random => Handler::Random(self.random_source()),
        }
    }

    /// Active allocator.
    pub fn allocator(&self) -> Arc<dyn MemoryAllocator> {
        match self.injected(CapabilitySlot::Allocator) {
            Some(Handler::Allocator(h)) => h,
            _ => Arc::new(HeapAllocator),
        }
    }

    /// Active deallocator.
    pub fn deallocator(&self) -> Arc<dyn MemoryDeallocator> {
        match self.injected(CapabilitySlot::Deallocator) {
            Some(Handler::Deallocator(h)) => h,
            _ => Arc::new(ZeroizingDeallocator),
        }
    }

    /// Active debug sink.
    pub fn debug_sink(&self) -> Arc<dyn DebugSink> {
        match self.injected(CapabilitySlot::Debug) {
            Some(Handler::Debug(h)) => h,
            _ => Arc::new(TracingSink),
        }
    }

    /// Active AES encryptor.
    pub fn aes_encryptor(&self) -> Arc<dyn AesEncryptor> {
        match self.injected(CapabilitySlot::AesEncrypt) {
            Some(Handler::AesEncrypt(h)) => h,
            _ => Arc::new(AesGcmSiv),
        }
    }

    /// Active AES decryptor.
    pub fn aes_decryptor(&self) -> Arc<dyn AesDecryptor> {
        match self.injected(CapabilitySlot::AesDecrypt) {
            Some(Handler::AesDecrypt(h)) => h,
            _ => Arc::new(AesGcmSiv),
        }
    }

    /// Active ECDSA signer.
    pub fn ecdsa_signer(&self) -> Arc<dyn EcdsaSigner> {
        match self.injected(CapabilitySlot::EcdsaSign) {
            Some(Handler::EcdsaSign(h)) => h,
            _ => Arc::new(K256Signer),
        }
    }

    /// Active ECDSA verifier.
    pub fn ecdsa_verifier(&self) -> Arc<dyn EcdsaVerifier> {
        match self.injected(CapabilitySlot::EcdsaVerify) {
            Some(Handler::EcdsaVerify(h)) => h,
            _ => Arc::new(K256Verifier),
        }
    }

    /// Active keypair generator. The default draws from [`Self::random_source`].
    pub fn ecdsa_keypair_generator(&self) -> Arc<dyn EcdsaKeypairGenerator> {
        match self.injected(CapabilitySlot::EcdsaKeypair) {
            Some(Handler::EcdsaKeypair(h)) => h,
            _ => Arc::new(K256KeypairGenerator::new(self.random_source())),
        }
    }

    /// Active random source.
    pub fn random_source(&self) -> Arc<dyn RandomSource> {
        match self.injected(CapabilitySlot::Random) {
            Some(Handler::Random(h)) => h,
            _ => Arc::new(OsRandom),
        }
    }

    fn injected(&self, slot: CapabilitySlot) -> Option<Handler> {
        self.seal();
        self.slots.read().get(&slot).cloned()
    }
}

impl std::fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut injected: Vec<_> = self.slots.read().keys().copied().collect();
        injected.sort();
        f.debug_struct("CapabilityRegistry")
            .field("injected", &injected)
            .field("sealed", &self.is_sealed())
            .finish()
    }
}
