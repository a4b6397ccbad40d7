//! BIP-39 seed management
//!
//! Converts between 32 bytes of wallet entropy and a 24-word phrase.

use bip39::{Language, Mnemonic};
use rand::rngs::OsRng;
use rand::RngCore;
use std::fmt;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Number of words in a wallet phrase
pub const PHRASE_WORDS: usize = 24;

/// Entropy length backing a 24-word phrase
pub const SEED_LEN: usize = 32;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SeedError {
    #[error("Invalid mnemonic checksum")]
    InvalidChecksum,
    #[error("Word #{position} is not in the dictionary")]
    InvalidWord { position: usize },
    #[error("Expected 24 words, got {0}")]
    WrongLength(usize),
    #[error("Expected a 32-byte seed, got {0} bytes")]
    InvalidSeedLength(usize),
    #[error("Invalid mnemonic: {0}")]
    InvalidMnemonic(String),
}

/// Raw wallet entropy. Wiped from memory on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecretSeed([u8; SEED_LEN]);

impl SecretSeed {
    pub fn new(bytes: [u8; SEED_LEN]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, SeedError> {
        let bytes: [u8; SEED_LEN] = bytes
            .try_into()
            .map_err(|_| SeedError::InvalidSeedLength(bytes.len()))?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; SEED_LEN] {
        &self.0
    }
}

impl fmt::Debug for SecretSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretSeed(<redacted>)")
    }
}

/// A normalized 24-word phrase (single spaces, lowercase)
#[derive(Clone, PartialEq, Eq)]
pub struct MnemonicPhrase(Zeroizing<String>);

impl MnemonicPhrase {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.0.split(' ')
    }
}

impl fmt::Debug for MnemonicPhrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MnemonicPhrase(<redacted>)")
    }
}

/// Generate a new 24-word phrase from fresh OS entropy
pub fn generate_phrase() -> Result<MnemonicPhrase, SeedError> {
    let mut entropy = Zeroizing::new([0u8; SEED_LEN]);
    OsRng.fill_bytes(&mut entropy[..]);
    encode_seed(&SecretSeed::new(*entropy))
}

/// Encode a seed as its 24-word phrase
pub fn encode_seed(seed: &SecretSeed) -> Result<MnemonicPhrase, SeedError> {
    let mnemonic = Mnemonic::from_entropy_in(Language::English, seed.as_bytes())
        .map_err(|e| SeedError::InvalidMnemonic(e.to_string()))?;
    Ok(MnemonicPhrase(Zeroizing::new(mnemonic.to_string())))
}

/// Decode a phrase back to its seed, verifying the checksum
pub fn decode_phrase(phrase: &str) -> Result<SecretSeed, SeedError> {
    let normalized = normalize(phrase);
    let count = normalized.split(' ').filter(|w| !w.is_empty()).count();
    if count != PHRASE_WORDS {
        return Err(SeedError::WrongLength(count));
    }

    let mnemonic = Mnemonic::parse_in(Language::English, normalized.as_str()).map_err(|e| match e {
        bip39::Error::InvalidChecksum => SeedError::InvalidChecksum,
        bip39::Error::UnknownWord(idx) => SeedError::InvalidWord { position: idx + 1 },
        bip39::Error::BadWordCount(n) => SeedError::WrongLength(n),
        other => SeedError::InvalidMnemonic(other.to_string()),
    })?;

    let (entropy, len) = mnemonic.to_entropy_array();
    let entropy = Zeroizing::new(entropy);
    SecretSeed::from_slice(&entropy[..len])
}

/// Parse and normalize a phrase without keeping the seed
pub fn parse_phrase(phrase: &str) -> Result<MnemonicPhrase, SeedError> {
    decode_phrase(phrase)?;
    Ok(MnemonicPhrase(normalize(phrase)))
}

fn normalize(phrase: &str) -> Zeroizing<String> {
    let lowered = Zeroizing::new(phrase.to_lowercase());
    Zeroizing::new(lowered.split_whitespace().collect::<Vec<_>>().join(" "))
}
