//! Transaction records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tonwallet_core::Amount;

/// Identifier of a history entry
///
/// `Assigned` ids come from the bookkeeping service. `Local` ids are
/// synthesized for records bookkeeping has not acknowledged yet.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TxId {
    Assigned(u64),
    Local(String),
}

impl TxId {
    /// Local id for a submitted message
    pub fn local(message_hash: &str) -> Self {
        TxId::Local(format!("local-{}", message_hash))
    }

    pub fn is_local(&self) -> bool {
        matches!(self, TxId::Local(_))
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxId::Assigned(id) => write!(f, "{}", id),
            TxId::Local(id) => f.write_str(id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Sent,
    Received,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Sent => "sent",
            Direction::Received => "received",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settlement status; later variants are further along
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Completed,
}

impl TxStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Some(TxStatus::Pending),
            "completed" => Some(TxStatus::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxStatus::Pending => f.write_str("pending"),
            TxStatus::Completed => f.write_str("completed"),
        }
    }
}

/// One entry of the wallet's transaction history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRecord {
    pub id: TxId,
    pub direction: Direction,
    pub amount: Amount,
    /// The other party's address, as text
    pub counterparty: String,
    pub status: TxStatus,
    pub timestamp: DateTime<Utc>,
}

/// A record to be stored by bookkeeping, which assigns the id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTxRecord {
    pub direction: Direction,
    pub amount: Amount,
    pub counterparty: String,
}

impl NewTxRecord {
    pub fn sent(amount: Amount, counterparty: impl Into<String>) -> Self {
        Self {
            direction: Direction::Sent,
            amount,
            counterparty: counterparty.into(),
        }
    }

    /// The bookkeeping request that would store `record`
    pub fn from_record(record: &TxRecord) -> Self {
        Self {
            direction: record.direction,
            amount: record.amount,
            counterparty: record.counterparty.clone(),
        }
    }

    /// Materialize as a pending record under `id`
    pub fn into_record(self, id: TxId, timestamp: DateTime<Utc>) -> TxRecord {
        TxRecord {
            id,
            direction: self.direction,
            amount: self.amount,
            counterparty: self.counterparty,
            status: TxStatus::Pending,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tx_id_ordering() {
        assert!(TxId::Assigned(2) > TxId::Assigned(1));
        assert!(TxId::Local("a".into()) > TxId::Assigned(u64::MAX));
    }

    #[test]
    fn test_tx_id_serde_untagged() {
        assert_eq!(serde_json::to_string(&TxId::Assigned(7)).unwrap(), "7");
        assert_eq!(
            serde_json::from_str::<TxId>(r#""local-ab""#).unwrap(),
            TxId::Local("local-ab".into())
        );
        assert_eq!(serde_json::from_str::<TxId>("12").unwrap(), TxId::Assigned(12));
    }

    #[test]
    fn test_local_id() {
        let id = TxId::local("deadbeef");
        assert!(id.is_local());
        assert_eq!(id.to_string(), "local-deadbeef");
    }

    #[test]
    fn test_status_progression() {
        assert!(TxStatus::Completed > TxStatus::Pending);
        assert_eq!(TxStatus::parse("COMPLETED"), Some(TxStatus::Completed));
        assert_eq!(TxStatus::parse("failed"), None);
    }

    #[test]
    fn test_new_record_is_pending() {
        let amount = Amount::from_nano(5).unwrap();
        let record = NewTxRecord::sent(amount, "UQabc").into_record(TxId::Assigned(1), Utc::now());
        assert_eq!(record.status, TxStatus::Pending);
        assert_eq!(record.direction, Direction::Sent);
        assert_eq!(record.counterparty, "UQabc");
    }
}
