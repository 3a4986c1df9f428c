//! # BIP39 Mnemonics
//!
//! English phrases from fresh entropy drawn through the `random` capability.
//! The entropy buffer is zeroized once the phrase is built.
//! [`mnemonic_to_seed`] turns a phrase back into the 64-byte seed that
//! [`derivation`](crate::derivation) expands into keys.

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::capability::RandomSource;
use crate::error::CryptoError;
use crate::random::random_array;

/// Number of words in a generated phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct WordCount(u8);

impl WordCount {
    /// Twelve words, 128 bits of entropy.
    pub const TWELVE: WordCount = WordCount(12);

    /// Validate a word count (12, 15, 18, 21 or 24).
    pub fn new(words: u8) -> Result<Self, CryptoError> {
        match words {
            12 | 15 | 18 | 21 | 24 => Ok(Self(words)),
            other => Err(CryptoError::InvalidArgument(format!(
                "mnemonic word count must be 12, 15, 18, 21 or 24, got {other}"
            ))),
        }
    }

    /// Word count.
    pub fn get(self) -> u8 {
        self.0
    }

    /// Entropy length in bytes.
    pub fn entropy_len(self) -> usize {
        usize::from(self.0) / 3 * 4
    }
}

impl Default for WordCount {
    fn default() -> Self {
        Self::TWELVE
    }
}

impl TryFrom<u8> for WordCount {
    type Error = CryptoError;

    fn try_from(words: u8) -> Result<Self, Self::Error> {
        Self::new(words)
    }
}

impl From<WordCount> for u8 {
    fn from(w: WordCount) -> u8 {
        w.0
    }
}

/// Generate a phrase of `words` words.
pub fn bip39_mnemonic(source: &dyn RandomSource, words: WordCount) -> Result<String, CryptoError> {
    let entropy = random_array::<32>(source)?;
    let mnemonic = bip39::Mnemonic::from_entropy(&entropy[..words.entropy_len()])
        .map_err(|e| CryptoError::Mnemonic(e.to_string()))?;
    Ok(mnemonic.to_string())
}

/// BIP39 seed of `phrase` (PBKDF2-HMAC-SHA512, 2048 rounds).
///
/// Surrounding and repeated whitespace and letter case are ignored. An
/// empty `passphrase` gives the standard unprotected seed.
pub fn mnemonic_to_seed(phrase: &str, passphrase: &str) -> Result<Zeroizing<[u8; 64]>, CryptoError> {
    let normalized = Zeroizing::new(
        phrase
            .split_whitespace()
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join(" "),
    );
    let mnemonic = bip39::Mnemonic::parse_normalized(&normalized)
        .map_err(|e| CryptoError::InvalidArgument(format!("mnemonic phrase: {e}")))?;
    Ok(Zeroizing::new(mnemonic.to_seed_normalized(passphrase)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::OsRandom;

    #[test]
    fn test_default_is_twelve_words() {
        let phrase = bip39_mnemonic(&OsRandom, WordCount::default()).unwrap();
        assert_eq!(phrase.split(' ').count(), 12);
        assert!(bip39::Mnemonic::parse_normalized(&phrase).is_ok());
    }

    #[test]
    fn test_every_word_count_is_supported() {
        for n in [12u8, 15, 18, 21, 24] {
            let phrase = bip39_mnemonic(&OsRandom, WordCount::new(n).unwrap()).unwrap();
            assert_eq!(phrase.split(' ').count(), usize::from(n));
        }
    }

    #[test]
    fn test_invalid_word_counts_rejected() {
        for n in [0u8, 11, 13, 25] {
            assert!(WordCount::new(n).is_err());
        }
    }

    #[test]
    fn test_entropy_lengths() {
        assert_eq!(WordCount::TWELVE.entropy_len(), 16);
        assert_eq!(WordCount::new(24).unwrap().entropy_len(), 32);
    }

    #[test]
    fn test_fixed_entropy_gives_known_phrase() {
        let zeros = |dest: &mut [u8]| -> Result<(), CryptoError> {
            dest.fill(0);
            Ok(())
        };
        let phrase = bip39_mnemonic(&zeros, WordCount::TWELVE).unwrap();
        assert_eq!(
            phrase,
            "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about"
        );
    }

    #[test]
    fn test_serde_rejects_bad_counts() {
        assert_eq!(serde_json::from_str::<WordCount>("24").unwrap().get(), 24);
        assert!(serde_json::from_str::<WordCount>("13").is_err());
    }

    #[test]
    fn test_seed_of_reference_phrase() {
        let phrase = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
        let seed = mnemonic_to_seed(phrase, "").unwrap();
        assert_eq!(
            vid_core::codec::to_hex(seed.as_ref()),
            "5eb00bbddcf069084889a8ab9155568165f5c453ccb85e70811aaed6f6da5fc1\
             9a5ac40b389cd370d086206dec8aa6c43daea6690f20ad3d8d48b2d2ce9e38e4"
        );
        let messy = "  Abandon abandon abandon abandon abandon abandon\nabandon abandon abandon abandon abandon ABOUT ";
        assert_eq!(mnemonic_to_seed(messy, "").unwrap(), seed);
        assert_ne!(mnemonic_to_seed(phrase, "TREZOR").unwrap(), seed);
    }

    #[test]
    fn test_seed_rejects_bad_phrases() {
        let bad_checksum = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon";
        for phrase in ["", "not a mnemonic", bad_checksum] {
            assert!(matches!(
                mnemonic_to_seed(phrase, ""),
                Err(CryptoError::InvalidArgument(_))
            ));
        }
    }
}
