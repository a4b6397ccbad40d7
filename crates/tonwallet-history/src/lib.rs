//! tonwallet History
//!
//! The wallet's transaction history is assembled from two sources:
//! - The bookkeeping service, which stores records and assigns ids
//! - Locally pending records for transfers bookkeeping has not stored yet
//!
//! [`reconcile`] merges them into one newest-first list with bookkeeping
//! taking precedence.

pub mod bookkeeping;
pub mod reconcile;
pub mod record;
pub mod state;

pub use bookkeeping::{Bookkeeping, BookkeepingError, HttpBookkeeping};
pub use reconcile::{reconcile, TransactionHistory};
pub use record::{Direction, NewTxRecord, TxId, TxRecord, TxStatus};
pub use state::{PendingLog, StateError};
