//! Configuration loading and per-invocation sessions.

use std::path::Path;

use anyhow::{Context as _, Result};

use vid_core::codec::to_hex;
use vid_crypto::builtin::OsRandom;
use vid_engine::{Configuration, Context, Engine, EngineConfig};

/// Load `--config`, or the defaults when no file is given.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::from_path(path)
            .with_context(|| format!("failed to load engine config from {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

/// An engine with one open session.
pub struct Session {
    /// The engine.
    pub engine: Engine,
    /// The session's context.
    pub ctx: Context,
}

impl Session {
    /// Open a session for the given client.
    pub fn open(config: EngineConfig, client_id: &str, client_secret: &str) -> Result<Self> {
        let engine = Engine::new(config).context("failed to build engine")?;
        let ctx = engine
            .init(&Configuration::new(client_id, client_secret))
            .context("failed to open session")?;
        Ok(Self { engine, ctx })
    }

    /// A throwaway session for utility commands.
    pub fn ephemeral(config: EngineConfig) -> Result<Self> {
        let secret = vid_crypto::random_bytes(&OsRandom, 32).context("failed to draw session secret")?;
        Self::open(config, "vid-cli", &to_hex(&secret))
    }
}
