//! tonwallet Session
//!
//! The stateful surface of the wallet. A [`WalletSession`] owns one identity
//! and talks to three collaborators:
//! - [`LedgerClient`](tonwallet_ledger::LedgerClient) for balance, seqno and submission
//! - [`Bookkeeping`](tonwallet_history::Bookkeeping) for the transaction log
//! - [`SecretStore`] for the phrase at rest
//!
//! # Example
//!
//! ```ignore
//! let session = WalletSession::new(ledger, bookkeeping, store, SessionConfig::default())?;
//! let opened = session.open(OpenMode::GenerateNew)?;
//! let sent = session.send("UQ...", "1.5", None).await?;
//! ```

pub mod error;
pub mod session;
pub mod storage;

pub use error::{ErrorKind, SyncWarning, WalletError};
pub use session::{
    OpenMode, OpenOutcome, RefreshOutcome, SendOutcome, SessionConfig, WalletSession,
    DEFAULT_VALIDITY_SECS,
};
pub use storage::{EncryptedFileStore, MemoryStore, SecretStore, StorageError, SEED_FILE};
