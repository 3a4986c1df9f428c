//! # Scenario
//!
//! Runs the reference flow against a fresh engine and prints each step as
//! one JSON line:
//!
//! ```text
//! init → create_did → create_credentials → verify_credentials
//!      → revoke_did → verify_credentials
//! ```
//!
//! Exits 0 when the credential verifies before revocation and reports
//! `issuer-revoked` after it; otherwise [`EXIT_NEGATIVE`](crate::EXIT_NEGATIVE).

use anyhow::Result;
use clap::Args;
use serde_json::{json, Map, Value};

use vid_engine::EngineConfig;
use vid_vc::{CredentialRequest, Verdict};

use crate::session::Session;
use crate::EXIT_NEGATIVE;

/// Scenario arguments.
#[derive(Args, Debug)]
pub struct ScenarioArgs {
    /// Client id for the session.
    #[arg(long, default_value = "alice")]
    pub client_id: String,

    /// Client secret for the session.
    #[arg(long, default_value = "s3cret")]
    pub client_secret: String,

    /// Value of the `role` claim.
    #[arg(long, default_value = "admin")]
    pub role: String,
}

/// Run the scenario.
pub fn run_scenario(args: &ScenarioArgs, config: EngineConfig) -> Result<u8> {
    let (steps, code) = scenario_steps(args, config)?;
    for step in steps {
        println!("{step}");
    }
    Ok(code)
}

/// The scenario's step records and exit code.
pub fn scenario_steps(args: &ScenarioArgs, config: EngineConfig) -> Result<(Vec<Value>, u8)> {
    let Session { engine, ctx } = Session::open(config, &args.client_id, &args.client_secret)?;
    let mut steps = vec![json!({ "step": "init", "client_id": args.client_id, "session": ctx.session_id() })];

    let document = engine.create_did(&ctx)?;
    steps.push(json!({ "step": "create_did", "document": document }));

    let mut claims = Map::new();
    claims.insert("role".into(), Value::String(args.role.clone()));
    let credential = engine.create_credentials(
        &ctx,
        &CredentialRequest {
            claims,
            ..CredentialRequest::default()
        },
    )?;
    steps.push(json!({ "step": "create_credentials", "credential": credential }));

    let before = engine.verify_credentials(&ctx, &credential)?;
    steps.push(json!({ "step": "verify_credentials", "verdict": before }));

    let revoked = engine.revoke_did(&ctx, None)?;
    steps.push(json!({ "step": "revoke_did", "status": revoked.status, "version_id": revoked.version_id }));

    let after = engine.verify_credentials(&ctx, &credential)?;
    steps.push(json!({ "step": "verify_credentials", "verdict": after }));

    let code = if before == Verdict::Valid && after == Verdict::IssuerRevoked {
        0
    } else {
        EXIT_NEGATIVE
    };
    Ok((steps, code))
}
