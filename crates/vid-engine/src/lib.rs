//! # vid-engine — Verifiable Identity Engine
//!
//! The host-facing surface over the identity crates. A host builds an
//! [`Engine`] from an [`EngineConfig`], optionally injects platform handlers
//! with [`Engine::register_handler`], opens a session with [`Engine::init`],
//! and then either calls the typed operations directly or sends JSON
//! [`Request`]s through [`Engine::dispatch`] and reads the result buffers.
//!
//! ```text
//! vid-core ──▶ vid-crypto ──▶ vid-did ──▶ vid-vc ──▶ vid-engine
//! ```
//!
//! ## Crate Policy
//!
//! - Every failure is an [`EngineError`] with a stable numeric code.
//! - Negative verification results are values, not errors.
//! - Engines are independent: each owns its registry, sessions, DID store
//!   and buffers.

pub mod boundary;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;

pub use boundary::{BufferHandle, Request};
pub use config::EngineConfig;
pub use context::{Configuration, Context};
pub use engine::Engine;
pub use error::EngineError;
