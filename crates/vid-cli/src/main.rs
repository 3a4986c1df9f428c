//! # vid CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use vid_cli::codec::{run_codec, CodecCommand};
use vid_cli::crypto::{run_crypto, CryptoCommand};
use vid_cli::request::{run_request, RequestArgs};
use vid_cli::scenario::{run_scenario, ScenarioArgs};
use vid_cli::session::{load_config, Session};

/// Verifiable identity toolkit.
///
/// DID lifecycle, verifiable credentials, and the codec and cipher
/// utilities they are built on.
#[derive(Parser, Debug)]
#[command(name = "vid", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a YAML engine configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(flatten)]
    Codec(CodecCommand),

    #[command(flatten)]
    Crypto(CryptoCommand),

    /// Run the create → issue → verify → revoke → verify flow.
    Scenario(ScenarioArgs),

    /// Dispatch JSON requests through the engine boundary.
    Request(RequestArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = load_config(cli.config.as_deref()).and_then(|config| match &cli.command {
        Commands::Codec(command) => run_codec(command, &Session::ephemeral(config)?),
        Commands::Crypto(command) => run_crypto(command, &Session::ephemeral(config)?),
        Commands::Scenario(args) => run_scenario(args, config),
        Commands::Request(args) => run_request(args, config),
    });

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}
