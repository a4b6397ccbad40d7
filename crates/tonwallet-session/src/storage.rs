//! Secret storage for the wallet phrase
//!
//! The session persists the normalized phrase once and reads it back on
//! resume. Absence is not an error: `load` returns `Ok(None)`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tonwallet_core::{decrypt_secret, encrypt_secret, CryptoError, EncryptedSecret};
use zeroize::Zeroizing;

/// File name of the encrypted phrase inside the data directory
pub const SEED_FILE: &str = "wallet.seed";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Encryption error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Stored secret is corrupt: {0}")]
    Corrupt(String),
}

pub trait SecretStore: Send + Sync {
    fn load(&self) -> Result<Option<Zeroizing<String>>, StorageError>;

    fn save(&self, phrase: &str) -> Result<(), StorageError>;
}

/// Process-local store; the phrase is lost on exit
#[derive(Default)]
pub struct MemoryStore {
    slot: Mutex<Option<Zeroizing<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_phrase(phrase: &str) -> Self {
        Self {
            slot: Mutex::new(Some(Zeroizing::new(phrase.to_string()))),
        }
    }
}

impl SecretStore for MemoryStore {
    fn load(&self) -> Result<Option<Zeroizing<String>>, StorageError> {
        let slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        Ok(slot.clone())
    }

    fn save(&self, phrase: &str) -> Result<(), StorageError> {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(Zeroizing::new(phrase.to_string()));
        Ok(())
    }
}

/// Password-encrypted phrase on disk (Argon2id + AES-256-GCM)
pub struct EncryptedFileStore {
    path: PathBuf,
    password: Zeroizing<String>,
}

impl EncryptedFileStore {
    pub fn new(path: impl Into<PathBuf>, password: &str) -> Self {
        Self {
            path: path.into(),
            password: Zeroizing::new(password.to_string()),
        }
    }

    /// Store at `<data_dir>/wallet.seed`
    pub fn in_dir(data_dir: &Path, password: &str) -> Self {
        Self::new(data_dir.join(SEED_FILE), password)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SecretStore for EncryptedFileStore {
    fn load(&self) -> Result<Option<Zeroizing<String>>, StorageError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&self.path)?;
        let encrypted = EncryptedSecret::from_bytes(&bytes)?;
        let plain = decrypt_secret(&encrypted, &self.password)?;
        let phrase = std::str::from_utf8(&plain)
            .map_err(|_| StorageError::Corrupt("phrase is not UTF-8".into()))?;
        Ok(Some(Zeroizing::new(phrase.to_string())))
    }

    fn save(&self, phrase: &str) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let encrypted = encrypt_secret(phrase.as_bytes(), &self.password)?;

        // replace atomically
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, encrypted.to_bytes())?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600))?;
        }
        fs::rename(&tmp, &self.path)?;
        log::debug!("Wallet secret written to {}", self.path.display());
        Ok(())
    }
}
