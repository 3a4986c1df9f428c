//! # Codec Utilities
//!
//! ```bash
//! vid encode "hello"
//! vid decode aGVsbG8=
//! vid hash '{"k":"UNiD"}'
//! vid random --length 16
//! vid mnemonic
//! ```

use anyhow::Result;
use clap::Subcommand;

use vid_core::codec::to_hex;

use crate::session::Session;

/// Codec subcommands.
#[derive(Subcommand, Debug)]
pub enum CodecCommand {
    /// Base64-encode text (URL-safe, padded).
    Encode {
        /// Text to encode.
        text: String,
    },
    /// Decode base64. Prints text when the bytes are UTF-8, else hex.
    Decode {
        /// Base64 input.
        encoded: String,
    },
    /// SHA-256 multihash of text.
    Hash {
        /// Content to hash.
        content: String,
    },
    /// Random bytes, hex-encoded.
    Random {
        /// Number of bytes.
        #[arg(long, default_value_t = 32)]
        length: usize,
    },
    /// A fresh BIP39 mnemonic.
    Mnemonic,
}

/// Run a codec subcommand.
pub fn run_codec(command: &CodecCommand, session: &Session) -> Result<u8> {
    let Session { engine, ctx } = session;
    match command {
        CodecCommand::Encode { text } => println!("{}", engine.base64_encode(ctx, text.as_bytes())?),
        CodecCommand::Decode { encoded } => {
            let bytes = engine.base64_decode(ctx, encoded)?;
            println!("{}", printable(&bytes));
        }
        CodecCommand::Hash { content } => println!("{}", engine.multihash(ctx, content.as_bytes())?),
        CodecCommand::Random { length } => println!("{}", to_hex(&engine.random_bytes(ctx, *length)?)),
        CodecCommand::Mnemonic => println!("{}", engine.bip39_mnemonic(ctx)?),
    }
    Ok(0)
}

/// UTF-8 text as-is, anything else as hex.
pub fn printable(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => to_hex(bytes),
    }
}
