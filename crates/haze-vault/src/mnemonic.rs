//! BIP-39 mnemonic handling.
//!
//! The mnemonic is the wallet's master secret in word form: 24 words
//! generated from 256 bits of entropy, or any valid phrase accepted on
//! restore. Word buffers are wiped on drop and `Debug` output is redacted
//! so the phrase cannot leak through logs.

use std::fmt;

use bip39::Language;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::VaultError;

/// A validated BIP-39 mnemonic phrase.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Mnemonic {
    words: Vec<String>,
}

impl Mnemonic {
    /// Generate a fresh 24-word mnemonic from 256 bits of OS entropy.
    pub fn generate() -> Self {
        let mut entropy: [u8; 32] = rand::random();
        let generated = bip39::Mnemonic::from_entropy_in(Language::English, &entropy)
            .expect("32 bytes of entropy always produce a valid mnemonic");
        entropy.zeroize();
        let words = generated
            .to_string()
            .split_whitespace()
            .map(str::to_string)
            .collect();
        Self { words }
    }

    /// Parse and validate a phrase.
    ///
    /// Whitespace runs collapse to single spaces and letters are
    /// lowercased before validation, so restores survive sloppy input.
    pub fn from_phrase(phrase: &str) -> Result<Self, VaultError> {
        let normalized = phrase
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        let parsed = bip39::Mnemonic::parse_in(Language::English, &normalized)
            .map_err(|e| VaultError::InvalidMnemonic(e.to_string()))?;
        let words = parsed
            .to_string()
            .split_whitespace()
            .map(str::to_string)
            .collect();
        Ok(Self { words })
    }

    /// The canonical space-separated phrase.
    pub fn phrase(&self) -> String {
        self.words.join(" ")
    }

    /// Number of words in the phrase.
    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// Expand the phrase into the 64-byte BIP-39 seed (empty passphrase).
    pub fn to_seed(&self) -> [u8; 64] {
        let parsed = bip39::Mnemonic::parse_in(Language::English, &self.phrase())
            .expect("stored words are validated on construction");
        parsed.to_seed("")
    }
}

impl fmt::Debug for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mnemonic").finish_non_exhaustive()
    }
}
