//! # Cipher Utilities
//!
//! Keys, signatures and digests are hex on the command line; ciphertexts are
//! base64. `verify` and `digest-verify` exit with
//! [`EXIT_NEGATIVE`](crate::EXIT_NEGATIVE) when the check fails.
//!
//! ```bash
//! vid keygen
//! vid derive "<twelve words>" --path "m/44'/0'/0'/0/20"
//! vid sign --secret-key <HEX> "message"
//! vid verify --public-key <HEX> --signature <HEX> "message"
//! vid encrypt --secret pw "plaintext"
//! vid decrypt --secret pw <BASE64>
//! vid digest --secret key "content"
//! vid digest-verify --secret key --digest <HEX> "content"
//! ```

use anyhow::{Context as _, Result};
use clap::Subcommand;

use vid_core::codec::{from_hex, to_hex};
use vid_crypto::{DerivationPath, SecretKey, SIGN_DERIVATION_PATH};

use crate::codec::printable;
use crate::session::Session;
use crate::verdict_exit;

/// Cipher subcommands.
#[derive(Subcommand, Debug)]
pub enum CryptoCommand {
    /// Generate a secp256k1 keypair and print it as JSON.
    Keygen,
    /// Derive a keypair from a BIP39 phrase and print it as JSON.
    Derive {
        /// BIP32 path, e.g. m/44'/0'/0'/0/10.
        #[arg(long, default_value = SIGN_DERIVATION_PATH)]
        path: String,
        /// Mnemonic phrase.
        mnemonic: String,
    },
    /// Sign a message.
    Sign {
        /// Secret key, 32 bytes hex.
        #[arg(long)]
        secret_key: String,
        /// Message text.
        message: String,
    },
    /// Verify a signature.
    Verify {
        /// Public key, SEC1 hex.
        #[arg(long)]
        public_key: String,
        /// Signature, 64 bytes hex.
        #[arg(long)]
        signature: String,
        /// Message text.
        message: String,
    },
    /// Encrypt text under a secret.
    Encrypt {
        /// Shared secret.
        #[arg(long)]
        secret: String,
        /// Plaintext.
        plaintext: String,
    },
    /// Decrypt base64 ciphertext.
    Decrypt {
        /// Shared secret.
        #[arg(long)]
        secret: String,
        /// Ciphertext, base64.
        ciphertext: String,
    },
    /// HMAC-SHA256 keyed digest.
    Digest {
        /// Key.
        #[arg(long)]
        secret: String,
        /// Content.
        content: String,
    },
    /// Check a keyed digest.
    DigestVerify {
        /// Key.
        #[arg(long)]
        secret: String,
        /// Expected digest, hex.
        #[arg(long)]
        digest: String,
        /// Content.
        content: String,
    },
}

/// Run a cipher subcommand.
pub fn run_crypto(command: &CryptoCommand, session: &Session) -> Result<u8> {
    let Session { engine, ctx } = session;
    match command {
        CryptoCommand::Keygen => {
            let keypair = engine.keypair_generate(ctx)?;
            let out = serde_json::json!({
                "public_key": keypair.public_key.to_hex(),
                "secret_key": keypair.secret_key.expose_hex().as_str(),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        CryptoCommand::Derive { path, mnemonic } => {
            let path: DerivationPath = path.parse().context("invalid --path")?;
            let keypair = engine.keypair_from_mnemonic(ctx, mnemonic, &path)?;
            let out = serde_json::json!({
                "path": path.to_string(),
                "public_key": keypair.public_key.to_hex(),
                "secret_key": keypair.secret_key.expose_hex().as_str(),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        CryptoCommand::Sign { secret_key, message } => {
            let secret_key = SecretKey::from_hex(secret_key).context("invalid --secret-key")?;
            let signature = engine.sign(ctx, message.as_bytes(), &secret_key)?;
            println!("{}", signature.to_hex());
        }
        CryptoCommand::Verify {
            public_key,
            signature,
            message,
        } => {
            let signature = from_hex(signature).context("invalid --signature")?;
            let public_key = from_hex(public_key).context("invalid --public-key")?;
            let valid = engine.verify(ctx, message.as_bytes(), &signature, &public_key)?;
            println!("{}", if valid { "valid" } else { "invalid" });
            return Ok(verdict_exit(valid));
        }
        CryptoCommand::Encrypt { secret, plaintext } => {
            let ciphertext = engine.encrypt(ctx, plaintext.as_bytes(), secret.as_bytes())?;
            println!("{}", vid_core::base64_encode(&ciphertext));
        }
        CryptoCommand::Decrypt { secret, ciphertext } => {
            let ciphertext = engine.base64_decode(ctx, ciphertext)?;
            let plaintext = engine.decrypt(ctx, &ciphertext, secret.as_bytes())?;
            println!("{}", printable(&plaintext));
        }
        CryptoCommand::Digest { secret, content } => {
            let digest = engine.digest(ctx, content.as_bytes(), secret.as_bytes())?;
            println!("{}", to_hex(&digest));
        }
        CryptoCommand::DigestVerify {
            secret,
            digest,
            content,
        } => {
            let digest = from_hex(digest).context("invalid --digest")?;
            let valid = engine.digest_verify(ctx, content.as_bytes(), &digest, secret.as_bytes())?;
            println!("{}", if valid { "valid" } else { "invalid" });
            return Ok(verdict_exit(valid));
        }
    }
    Ok(0)
}
