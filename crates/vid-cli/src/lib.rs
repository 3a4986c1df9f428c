//! # vid-cli — Verifiable Identity CLI
//!
//! Provides the `vid` command-line interface over [`vid_engine`].
//!
//! ## Subcommands
//!
//! - `vid encode | decode | hash | random | mnemonic`: codec utilities.
//! - `vid keygen | derive | sign | verify | encrypt | decrypt | digest | digest-verify`:
//!   cipher utilities.
//! - `vid scenario`: the init → create → issue → verify → revoke → verify flow.
//! - `vid request <FILE>`: dispatch a JSON request and print the result buffer.
//!
//! ## Exit codes
//!
//! `0` success, `1` error, `2` a verification ran and came back negative.

pub mod codec;
pub mod crypto;
pub mod request;
pub mod scenario;
pub mod session;

/// Exit code for a negative verification result.
pub const EXIT_NEGATIVE: u8 = 2;

/// Exit code for `valid`.
pub fn verdict_exit(valid: bool) -> u8 {
    if valid {
        0
    } else {
        EXIT_NEGATIVE
    }
}
