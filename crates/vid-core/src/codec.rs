//! # Base64 Codecs
//!
//! Two fixed encodings are used across the engine:
//!
//! - **Padded URL-safe** ([`base64_encode`] / [`base64_decode`]): the
//!   general purpose codec exposed at the boundary.
//! - **Unpadded URL-safe** ([`base64url_encode_unpadded`] /
//!   [`base64url_decode_unpadded`]): identifiers, JWK coordinates and proof
//!   values, where `=` would need escaping.
//!
//! Decoding is strict in both cases. Characters outside the alphabet, missing
//! or surplus padding, and non-zero trailing bits are all rejected. A decoder
//! that tolerated them would let two different strings decode to the same
//! bytes.

use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine as _;

use crate::error::EncodingError;

/// Encode bytes as padded URL-safe base64.
pub fn base64_encode(bytes: &[u8]) -> String {
    URL_SAFE.encode(bytes)
}

/// Decode padded URL-safe base64.
pub fn base64_decode(input: &str) -> Result<Vec<u8>, EncodingError> {
    Ok(URL_SAFE.decode(input)?)
}

/// Encode bytes as unpadded URL-safe base64.
pub fn base64url_encode_unpadded(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode unpadded URL-safe base64. Input carrying `=` padding is rejected.
pub fn base64url_decode_unpadded(input: &str) -> Result<Vec<u8>, EncodingError> {
    Ok(URL_SAFE_NO_PAD.decode(input)?)
}

/// Lowercase hex rendering, used for key material in diagnostics and the CLI.
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Parse a hex string (case-insensitive, surrounding whitespace ignored).
pub fn from_hex(input: &str) -> Result<Vec<u8>, crate::ValidationError> {
    let input = input.trim();
    if input.len() % 2 != 0 {
        return Err(crate::ValidationError::new(
            "hex",
            format!("odd length {}", input.len()),
        ));
    }
    (0..input.len())
        .step_by(2)
        .map(|i| {
            input
                .get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| {
                    crate::ValidationError::new("hex", format!("invalid digit pair at offset {i}"))
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_padded_vector() {
        assert_eq!(base64_encode(b"0123456789abcdef"), "MDEyMzQ1Njc4OWFiY2RlZg==");
        assert_eq!(
            base64_decode("MDEyMzQ1Njc4OWFiY2RlZg==").unwrap(),
            b"0123456789abcdef"
        );
    }

    #[test]
    fn test_known_unpadded_vector() {
        assert_eq!(base64url_encode_unpadded(b"0123456789abcdef"), "MDEyMzQ1Njc4OWFiY2RlZg");
    }

    #[test]
    fn test_url_safe_alphabet() {
        let encoded = base64_encode(&[0xfb, 0xff, 0xfe]);
        assert_eq!(encoded, "-__-");
        assert!(base64_decode("+//+").is_err());
    }

    #[test]
    fn test_missing_padding_rejected() {
        assert!(base64_decode("MDEyMzQ1Njc4OWFiY2RlZg").is_err());
    }

    #[test]
    fn test_surplus_padding_rejected() {
        assert!(base64_decode("MDEyMzQ1Njc4OWFiY2RlZg===").is_err());
        assert!(base64url_decode_unpadded("MDEyMzQ1Njc4OWFiY2RlZg==").is_err());
    }

    #[test]
    fn test_non_alphabet_rejected() {
        assert!(matches!(
            base64_decode("MDEy*zQ1"),
            Err(EncodingError::Base64(_))
        ));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(base64_encode(&[]), "");
        assert!(base64_decode("").unwrap().is_empty());
    }

    #[test]
    fn test_hex_round_trip_and_errors() {
        assert_eq!(to_hex(&[0x00, 0xab, 0xff]), "00abff");
        assert_eq!(from_hex(" 00ABff ").unwrap(), vec![0x00, 0xab, 0xff]);
        assert!(from_hex("abc").is_err());
        assert!(from_hex("zz").is_err());
    }
}
