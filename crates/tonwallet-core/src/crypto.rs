//! Password-based encryption for secrets at rest
//!
//! Argon2id derives an AES-256-GCM key from the password; each encryption
//! draws a fresh salt and nonce.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use thiserror::Error;
use zeroize::Zeroizing;

const ARGON2_M_COST: u32 = 65536; // 64 MiB
const ARGON2_T_COST: u32 = 3;
const ARGON2_P_COST: u32 = 4;
const KEY_LEN: usize = 32;

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),
    #[error("Decryption failed: invalid password or corrupted data")]
    DecryptionFailed,
    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),
    #[error("Invalid ciphertext format")]
    InvalidFormat,
}

/// `salt (16) || nonce (12) || ciphertext + tag`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedSecret {
    salt: [u8; SALT_LEN],
    nonce: [u8; NONCE_LEN],
    ciphertext: Vec<u8>,
}

impl EncryptedSecret {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(SALT_LEN + NONCE_LEN + self.ciphertext.len());
        bytes.extend_from_slice(&self.salt);
        bytes.extend_from_slice(&self.nonce);
        bytes.extend_from_slice(&self.ciphertext);
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() < SALT_LEN + NONCE_LEN + TAG_LEN + 1 {
            return Err(CryptoError::InvalidFormat);
        }
        let mut salt = [0u8; SALT_LEN];
        let mut nonce = [0u8; NONCE_LEN];
        salt.copy_from_slice(&bytes[..SALT_LEN]);
        nonce.copy_from_slice(&bytes[SALT_LEN..SALT_LEN + NONCE_LEN]);
        Ok(Self {
            salt,
            nonce,
            ciphertext: bytes[SALT_LEN + NONCE_LEN..].to_vec(),
        })
    }
}

fn derive_key(password: &str, salt: &[u8; SALT_LEN]) -> Result<Zeroizing<[u8; KEY_LEN]>, CryptoError> {
    let params = Params::new(ARGON2_M_COST, ARGON2_T_COST, ARGON2_P_COST, Some(KEY_LEN))
        .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    argon2
        .hash_password_into(password.as_bytes(), salt, &mut key[..])
        .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))?;
    Ok(key)
}

/// Encrypt `secret` under `password`
pub fn encrypt_secret(secret: &[u8], password: &str) -> Result<EncryptedSecret, CryptoError> {
    if secret.is_empty() {
        return Err(CryptoError::EncryptionFailed("empty secret".into()));
    }

    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&Aes256Gcm::generate_nonce(&mut OsRng));

    let key = derive_key(password, &salt)?;
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key[..]));
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), secret)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    Ok(EncryptedSecret {
        salt,
        nonce,
        ciphertext,
    })
}

/// Decrypt a secret; fails on a wrong password or tampered data
pub fn decrypt_secret(
    encrypted: &EncryptedSecret,
    password: &str,
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let key = derive_key(password, &encrypted.salt)?;
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key[..]));
    cipher
        .decrypt(Nonce::from_slice(&encrypted.nonce), encrypted.ciphertext.as_slice())
        .map(Zeroizing::new)
        .map_err(|_| CryptoError::DecryptionFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"abandon abandon abandon art";

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let encrypted = encrypt_secret(SECRET, "correct horse battery staple").unwrap();
        let decrypted = decrypt_secret(&encrypted, "correct horse battery staple").unwrap();
        assert_eq!(&decrypted[..], SECRET);
    }

    #[test]
    fn test_wrong_password_fails() {
        let encrypted = encrypt_secret(SECRET, "right").unwrap();
        assert!(matches!(
            decrypt_secret(&encrypted, "wrong"),
            Err(CryptoError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_fresh_salt_and_nonce_each_time() {
        let a = encrypt_secret(SECRET, "pw").unwrap();
        let b = encrypt_secret(SECRET, "pw").unwrap();
        assert_ne!(a.to_bytes(), b.to_bytes());
    }

    #[test]
    fn test_bytes_roundtrip_and_tamper() {
        let encrypted = encrypt_secret(SECRET, "pw").unwrap();
        let mut bytes = encrypted.to_bytes();
        assert_eq!(bytes.len(), SALT_LEN + NONCE_LEN + SECRET.len() + TAG_LEN);

        let restored = EncryptedSecret::from_bytes(&bytes).unwrap();
        assert_eq!(&decrypt_secret(&restored, "pw").unwrap()[..], SECRET);

        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        let tampered = EncryptedSecret::from_bytes(&bytes).unwrap();
        assert!(decrypt_secret(&tampered, "pw").is_err());
    }

    #[test]
    fn test_truncated_input_rejected() {
        assert!(matches!(
            EncryptedSecret::from_bytes(&[0u8; 20]),
            Err(CryptoError::InvalidFormat)
        ));
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(encrypt_secret(b"", "pw").is_err());
    }
}
