//! Session errors and non-fatal warnings

use thiserror::Error;
use tonwallet_core::{AddressError, AmountError, KeyError, SeedError};
use tonwallet_history::BookkeepingError;
use tonwallet_ledger::LedgerError;

/// Coarse classification of a [`WalletError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected user input; nothing was sent anywhere
    Input,
    /// Operation not valid in the current session state
    State,
    /// An external collaborator failed
    Collaborator,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("Invalid mnemonic checksum")]
    InvalidChecksum,

    #[error("Word #{position} is not in the dictionary")]
    InvalidWord { position: usize },

    #[error("Expected 24 words, got {0}")]
    WrongLength(usize),

    #[error("Expected a 32-byte seed, got {0} bytes")]
    InvalidSeedLength(usize),

    #[error("{0}")]
    InvalidAmount(AmountError),

    #[error("Invalid destination: {0}")]
    InvalidDestination(AddressError),

    #[error("No wallet is open")]
    SessionNotOpen,

    #[error("A wallet is already open in this session")]
    SessionAlreadyOpen,

    #[error("No stored wallet secret found")]
    NoStoredSecret,

    #[error("Ledger unreachable: {0}")]
    LedgerUnreachable(String),

    #[error("Submission failed: {0}")]
    SubmissionFailed(LedgerError),

    #[error("Bookkeeping unreachable: {0}")]
    BookkeepingUnreachable(String),

    #[error("Could not store wallet secret: {0}")]
    StorageWriteFailed(String),

    #[error("Could not read wallet secret: {0}")]
    StorageReadFailed(String),

    #[error("Wallet derivation failed: {0}")]
    Build(String),
}

impl WalletError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WalletError::InvalidChecksum
            | WalletError::InvalidWord { .. }
            | WalletError::WrongLength(_)
            | WalletError::InvalidSeedLength(_)
            | WalletError::InvalidAmount(_)
            | WalletError::InvalidDestination(_) => ErrorKind::Input,
            WalletError::SessionNotOpen
            | WalletError::SessionAlreadyOpen
            | WalletError::NoStoredSecret
            | WalletError::Build(_) => ErrorKind::State,
            WalletError::LedgerUnreachable(_)
            | WalletError::SubmissionFailed(_)
            | WalletError::BookkeepingUnreachable(_)
            | WalletError::StorageWriteFailed(_)
            | WalletError::StorageReadFailed(_) => ErrorKind::Collaborator,
        }
    }
}

impl From<SeedError> for WalletError {
    fn from(e: SeedError) -> Self {
        match e {
            SeedError::InvalidChecksum => WalletError::InvalidChecksum,
            SeedError::InvalidWord { position } => WalletError::InvalidWord { position },
            SeedError::WrongLength(n) => WalletError::WrongLength(n),
            SeedError::InvalidSeedLength(n) => WalletError::InvalidSeedLength(n),
            SeedError::InvalidMnemonic(msg) => WalletError::Build(msg),
        }
    }
}

impl From<KeyError> for WalletError {
    fn from(e: KeyError) -> Self {
        match e {
            KeyError::InvalidSeedLength(n) => WalletError::InvalidSeedLength(n),
            other => WalletError::Build(other.to_string()),
        }
    }
}

impl From<LedgerError> for WalletError {
    fn from(e: LedgerError) -> Self {
        WalletError::LedgerUnreachable(match e {
            LedgerError::Unreachable(msg) | LedgerError::SubmissionRejected(msg) => msg,
        })
    }
}

impl From<BookkeepingError> for WalletError {
    fn from(e: BookkeepingError) -> Self {
        match e {
            BookkeepingError::Unreachable(msg) => WalletError::BookkeepingUnreachable(msg),
        }
    }
}

/// Problems that did not fail the operation but leave history incomplete
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncWarning {
    /// The transfer was submitted but bookkeeping did not store it; it is
    /// kept locally under a synthesized id
    #[error("Transfer sent but not recorded by bookkeeping: {0}")]
    HistorySyncWarning(BookkeepingError),

    /// History could not be listed; only local records are shown
    #[error("History unavailable, showing local records only: {0}")]
    HistoryUnavailable(BookkeepingError),

    /// The refresh after a successful send failed
    #[error("Refresh after send failed: {0}")]
    RefreshFailed(WalletError),
}
