//! Wallet session
//!
//! A session starts uninitialized and becomes active once `open` succeeds.
//! The identity (keypair + address) is set exactly once and never changes.
//!
//! ```text
//! send:    validate -> seqno -> build -> submit -> record -> refresh
//! refresh: (balance || history) -> reconcile
//! ```

use crate::error::{SyncWarning, WalletError};
use crate::storage::SecretStore;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use tonwallet_core::{
    build_transfer, decode_phrase, derive_keypair, encode_seed, generate_phrase, parse_address,
    Address, Amount, Balance, KeyPair, MnemonicPhrase, Payload, SecretSeed, SendMode,
    TransferRequest, WalletContract, WalletVersion,
};
use tonwallet_history::{
    reconcile, Bookkeeping, NewTxRecord, PendingLog, TransactionHistory, TxId, TxRecord,
};
use tonwallet_ledger::{LedgerClient, Network};
use zeroize::Zeroizing;

/// Seconds a signed transfer stays valid
pub const DEFAULT_VALIDITY_SECS: u32 = 60;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub version: WalletVersion,
    pub workchain: i8,
    pub network: Network,
    pub send_mode: SendMode,
    pub validity_secs: u32,
    /// Where locally pending records are persisted, if anywhere
    pub pending_log_path: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            version: WalletVersion::V3R2,
            workchain: 0,
            network: Network::Mainnet,
            send_mode: SendMode::default(),
            validity_secs: DEFAULT_VALIDITY_SECS,
            pending_log_path: None,
        }
    }
}

impl SessionConfig {
    fn contract(&self) -> WalletContract {
        WalletContract {
            version: self.version,
            workchain: self.workchain,
        }
    }
}

/// How to obtain the wallet secret when opening
pub enum OpenMode {
    GenerateNew,
    RestoreFromPhrase(Zeroizing<String>),
    /// Reuse the phrase already in secret storage
    Resume,
}

impl OpenMode {
    pub fn restore(phrase: &str) -> Self {
        OpenMode::RestoreFromPhrase(Zeroizing::new(phrase.to_string()))
    }
}

#[derive(Debug)]
pub struct OpenOutcome {
    pub address: Address,
    /// The new phrase, only for `GenerateNew`; show it to the user once
    pub phrase: Option<MnemonicPhrase>,
}

#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub balance: Balance,
    pub history: TransactionHistory,
    pub warnings: Vec<SyncWarning>,
}

#[derive(Debug, Clone)]
pub struct SendOutcome {
    /// Hex hash of the submitted external message
    pub message_hash: String,
    pub sequence_number: u32,
    pub record: TxRecord,
    /// Present when the follow-up refresh succeeded
    pub refresh: Option<RefreshOutcome>,
    pub warnings: Vec<SyncWarning>,
}

struct Identity {
    keys: KeyPair,
    address: Address,
}

/// One wallet, its collaborators and its pending records
pub struct WalletSession<L, B, S> {
    ledger: L,
    bookkeeping: B,
    store: S,
    config: SessionConfig,
    identity: OnceLock<Identity>,
    open_lock: Mutex<()>,
    send_lock: tokio::sync::Mutex<()>,
    pending: Mutex<PendingLog>,
}

impl<L, B, S> WalletSession<L, B, S>
where
    L: LedgerClient,
    B: Bookkeeping,
    S: SecretStore,
{
    /// Create an uninitialized session, loading any persisted pending records
    pub fn new(ledger: L, bookkeeping: B, store: S, config: SessionConfig) -> Result<Self, WalletError> {
        let pending = match &config.pending_log_path {
            Some(path) => PendingLog::load(path)
                .map_err(|e| WalletError::StorageReadFailed(e.to_string()))?,
            None => PendingLog::new(),
        };
        Ok(Self {
            ledger,
            bookkeeping,
            store,
            config,
            identity: OnceLock::new(),
            open_lock: Mutex::new(()),
            send_lock: tokio::sync::Mutex::new(()),
            pending: Mutex::new(pending),
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn bookkeeping(&self) -> &B {
        &self.bookkeeping
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn is_open(&self) -> bool {
        self.identity.get().is_some()
    }

    /// The wallet's display address (non-bounceable)
    pub fn address(&self) -> Result<Address, WalletError> {
        Ok(self.identity()?.address)
    }

    /// Records submitted but not yet listed by bookkeeping
    pub fn pending_records(&self) -> Vec<TxRecord> {
        self.lock_pending().records().to_vec()
    }

    /// Open the wallet; on failure the session stays uninitialized
    pub fn open(&self, mode: OpenMode) -> Result<OpenOutcome, WalletError> {
        let _guard = self.open_lock.lock().unwrap_or_else(|e| e.into_inner());
        if self.is_open() {
            return Err(WalletError::SessionAlreadyOpen);
        }

        let (identity, phrase) = match mode {
            OpenMode::GenerateNew => {
                let phrase = generate_phrase()?;
                self.store
                    .save(phrase.as_str())
                    .map_err(|e| WalletError::StorageWriteFailed(e.to_string()))?;
                let seed = decode_phrase(phrase.as_str())?;
                (self.derive_identity(&seed)?, Some(phrase))
            }
            OpenMode::RestoreFromPhrase(text) => {
                let seed = decode_phrase(&text)?;
                let identity = self.derive_identity(&seed)?;
                let normalized = encode_seed(&seed)?;
                self.store
                    .save(normalized.as_str())
                    .map_err(|e| WalletError::StorageWriteFailed(e.to_string()))?;
                (identity, None)
            }
            OpenMode::Resume => {
                let stored = self
                    .store
                    .load()
                    .map_err(|e| WalletError::StorageReadFailed(e.to_string()))?
                    .ok_or(WalletError::NoStoredSecret)?;
                let seed = decode_phrase(&stored)?;
                (self.derive_identity(&seed)?, None)
            }
        };

        let address = identity.address;
        self.identity
            .set(identity)
            .map_err(|_| WalletError::SessionAlreadyOpen)?;
        log::info!("Opened wallet {} on {}", address, self.config.network);
        Ok(OpenOutcome { address, phrase })
    }

    /// Send `amount` (decimal text) to `destination` (address text)
    ///
    /// Sends from one session run one at a time; the sequence number is
    /// always fetched fresh. Once the ledger accepts the message the send
    /// has succeeded, and bookkeeping or refresh problems become warnings.
    pub async fn send(
        &self,
        destination: &str,
        amount: &str,
        comment: Option<&str>,
    ) -> Result<SendOutcome, WalletError> {
        let identity = self.identity()?;
        let amount = Amount::from_decimal_str(amount).map_err(WalletError::InvalidAmount)?;
        let destination = parse_address(destination).map_err(WalletError::InvalidDestination)?;
        let payload = comment
            .filter(|c| !c.is_empty())
            .map(|c| Payload::Comment(c.to_string()));

        let mut warnings = Vec::new();
        let send_guard = self.send_lock.lock().await;

        let sequence_number = self.ledger.get_sequence_number(&identity.address).await?;
        let request = TransferRequest {
            destination,
            amount,
            sequence_number,
            send_mode: self.config.send_mode,
            payload,
            valid_until: self.valid_until(),
        };
        let signed = build_transfer(request, &identity.keys, self.config.contract())
            .map_err(|e| WalletError::Build(e.to_string()))?;

        self.ledger
            .submit(&signed)
            .await
            .map_err(WalletError::SubmissionFailed)?;
        let message_hash = signed.hash_hex();
        log::info!(
            "Sent {} to {} (seqno {}, message {})",
            amount,
            destination,
            sequence_number,
            message_hash
        );

        let new_record = NewTxRecord::sent(amount, destination.to_string());
        let id = match self.bookkeeping.record_transaction(&new_record).await {
            Ok(id) => id,
            Err(e) => {
                log::warn!("Bookkeeping did not record message {}: {}", message_hash, e);
                warnings.push(SyncWarning::HistorySyncWarning(e));
                TxId::local(&message_hash)
            }
        };
        let record = new_record.into_record(id, Utc::now());
        self.remember_pending(record.clone());
        drop(send_guard);

        let refresh = match self.refresh().await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                log::warn!("Refresh after send failed: {}", e);
                warnings.push(SyncWarning::RefreshFailed(e));
                None
            }
        };

        Ok(SendOutcome {
            message_hash,
            sequence_number,
            record,
            refresh,
            warnings,
        })
    }

    /// Fetch the balance and rebuild the history
    ///
    /// A ledger failure fails the refresh. A bookkeeping failure falls back
    /// to local records with a [`SyncWarning::HistoryUnavailable`].
    pub async fn refresh(&self) -> Result<RefreshOutcome, WalletError> {
        let address = self.identity()?.address;

        let (balance, listed) = tokio::join!(
            self.ledger.get_balance(&address),
            self.bookkeeping.list_transactions(&address),
        );
        let balance = balance?;

        let mut warnings = Vec::new();
        let history = match listed {
            Ok(records) => {
                self.resync_unassigned().await;
                let local = {
                    let mut pending = self.lock_pending();
                    let pruned = pending.prune(records.iter().map(|r| &r.id));
                    if pruned > 0 {
                        log::debug!("{} pending records confirmed by bookkeeping", pruned);
                        self.persist_pending(&pending);
                    }
                    pending.records().to_vec()
                };
                reconcile(records, local)
            }
            Err(e) => {
                log::warn!("History unavailable: {}", e);
                warnings.push(SyncWarning::HistoryUnavailable(e));
                reconcile(Vec::new(), self.pending_records())
            }
        };

        Ok(RefreshOutcome {
            balance,
            history,
            warnings,
        })
    }

    /// Re-post pending records bookkeeping never stored
    ///
    /// Runs under the send lock so a record is never posted twice. Entries
    /// that still fail keep their local id until a later refresh.
    async fn resync_unassigned(&self) {
        let has_unassigned = self.lock_pending().unassigned().next().is_some();
        if !has_unassigned {
            return;
        }
        let _send_guard = self.send_lock.lock().await;

        let unassigned: Vec<TxRecord> = self.lock_pending().unassigned().cloned().collect();
        for record in unassigned {
            match self
                .bookkeeping
                .record_transaction(&NewTxRecord::from_record(&record))
                .await
            {
                Ok(id) => {
                    log::info!("Bookkeeping recorded {} as {}", record.id, id);
                    let mut pending = self.lock_pending();
                    pending.reassign(&record.id, id);
                    self.persist_pending(&pending);
                }
                Err(e) => {
                    log::warn!("Bookkeeping still unavailable for {}: {}", record.id, e);
                    break;
                }
            }
        }
    }

    fn identity(&self) -> Result<&Identity, WalletError> {
        self.identity.get().ok_or(WalletError::SessionNotOpen)
    }

    fn derive_identity(&self, seed: &SecretSeed) -> Result<Identity, WalletError> {
        let keys = derive_keypair(seed)?;
        let address = self
            .config
            .contract()
            .address(&keys.public_key())
            .map_err(|e| WalletError::Build(e.to_string()))?
            .with_flags(false, self.config.network.is_testnet());
        Ok(Identity { keys, address })
    }

    fn valid_until(&self) -> u32 {
        let now = u32::try_from(Utc::now().timestamp()).unwrap_or(u32::MAX);
        now.saturating_add(self.config.validity_secs)
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, PendingLog> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn remember_pending(&self, record: TxRecord) {
        let mut pending = self.lock_pending();
        pending.push(record);
        self.persist_pending(&pending);
    }

    fn persist_pending(&self, pending: &PendingLog) {
        if let Some(path) = &self.config.pending_log_path {
            if let Err(e) = pending.save(path) {
                log::warn!("Could not save pending records to {}: {}", path.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.send_mode.bits(), 3);
        assert_eq!(config.validity_secs, DEFAULT_VALIDITY_SECS);
        assert_eq!(config.contract(), WalletContract::default());
    }

    #[test]
    fn test_open_mode_restore_helper() {
        match OpenMode::restore("a b c") {
            OpenMode::RestoreFromPhrase(p) => assert_eq!(p.as_str(), "a b c"),
            _ => panic!("expected restore mode"),
        }
    }
}
