//! Key derivation from the wallet seed
//!
//! Expands the seed with BIP-39 PBKDF2 and derives an Ed25519 key via SLIP-10.

use crate::seed::{SecretSeed, SeedError};
use bip39::{Language, Mnemonic};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use hmac::{Hmac, Mac};
use sha2::Sha512;
use std::fmt;
use thiserror::Error;
use zeroize::Zeroizing;

/// SLIP-10 derivation path for TON keys (SLIP-44 coin type 607)
pub const TON_PATH: &str = "m/44'/607'/0'";

const HARDENED: u32 = 0x8000_0000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("Expected a 32-byte seed, got {0} bytes")]
    InvalidSeedLength(usize),
    #[error("Derivation failed: {0}")]
    DerivationFailed(String),
    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

/// Ed25519 signing identity for one wallet
#[derive(Clone)]
pub struct KeyPair {
    signing: SigningKey,
}

impl KeyPair {
    pub fn from_secret_bytes(secret: &[u8; 32]) -> Self {
        Self {
            signing: SigningKey::from_bytes(secret),
        }
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.signing.verifying_key().to_bytes()
    }

    pub fn secret_key(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.signing.to_bytes())
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing.sign(message).to_bytes()
    }

    pub fn verify(&self, message: &[u8], signature: &[u8; 64]) -> bool {
        verify_signature(&self.public_key(), message, signature)
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &hex::encode(self.public_key()))
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Verify an Ed25519 signature against a raw public key
pub fn verify_signature(public_key: &[u8; 32], message: &[u8], signature: &[u8; 64]) -> bool {
    let Ok(key) = VerifyingKey::from_bytes(public_key) else {
        return false;
    };
    key.verify(message, &Signature::from_bytes(signature)).is_ok()
}

/// Derive the wallet keypair from its seed
pub fn derive_keypair(seed: &SecretSeed) -> Result<KeyPair, KeyError> {
    let mnemonic = Mnemonic::from_entropy_in(Language::English, seed.as_bytes())
        .map_err(|e| KeyError::DerivationFailed(e.to_string()))?;
    let expanded = Zeroizing::new(mnemonic.to_seed(""));
    derive_slip10(&expanded[..], TON_PATH)
}

/// Derive the wallet keypair from raw seed bytes
pub fn derive_keypair_from_bytes(bytes: &[u8]) -> Result<KeyPair, KeyError> {
    let seed = SecretSeed::from_slice(bytes).map_err(|e| match e {
        SeedError::InvalidSeedLength(n) => KeyError::InvalidSeedLength(n),
        other => KeyError::DerivationFailed(other.to_string()),
    })?;
    derive_keypair(&seed)
}

/// SLIP-10 Ed25519 derivation (hardened indices only)
pub fn derive_slip10(seed: &[u8], path: &str) -> Result<KeyPair, KeyError> {
    let indices = parse_path(path)?;

    let mut mac = Hmac::<Sha512>::new_from_slice(b"ed25519 seed")
        .map_err(|e| KeyError::DerivationFailed(e.to_string()))?;
    mac.update(seed);
    let mut node = Zeroizing::new([0u8; 64]);
    node.copy_from_slice(&mac.finalize().into_bytes());

    for index in indices {
        let mut mac = Hmac::<Sha512>::new_from_slice(&node[32..])
            .map_err(|e| KeyError::DerivationFailed(e.to_string()))?;
        mac.update(&[0x00]);
        mac.update(&node[..32]);
        mac.update(&index.to_be_bytes());
        node.copy_from_slice(&mac.finalize().into_bytes());
    }

    let mut secret = Zeroizing::new([0u8; 32]);
    secret.copy_from_slice(&node[..32]);
    Ok(KeyPair::from_secret_bytes(&secret))
}

fn parse_path(path: &str) -> Result<Vec<u32>, KeyError> {
    let rest = path
        .trim()
        .strip_prefix('m')
        .ok_or_else(|| KeyError::InvalidPath(path.to_string()))?;

    let mut indices = Vec::new();
    for part in rest.split('/').filter(|p| !p.is_empty()) {
        let num = part
            .strip_suffix('\'')
            .or_else(|| part.strip_suffix('h'))
            .ok_or_else(|| KeyError::InvalidPath(format!("{} is not hardened", part)))?;
        let num: u32 = num
            .parse()
            .map_err(|_| KeyError::InvalidPath(format!("Invalid component: {}", part)))?;
        if num >= HARDENED {
            return Err(KeyError::InvalidPath(format!("Index out of range: {}", part)));
        }
        indices.push(num | HARDENED);
    }
    Ok(indices)
}
