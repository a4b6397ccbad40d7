//! Merging bookkeeping history with locally pending records

use crate::record::{TxId, TxRecord, TxStatus};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Transaction history, newest first, unique by id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionHistory {
    records: Vec<TxRecord>,
}

impl TransactionHistory {
    pub fn records(&self) -> &[TxRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<TxRecord> {
        self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &TxRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &TxId) -> Option<&TxRecord> {
        self.records.iter().find(|r| &r.id == id)
    }

    pub fn pending(&self) -> impl Iterator<Item = &TxRecord> {
        self.records.iter().filter(|r| r.status == TxStatus::Pending)
    }
}

impl IntoIterator for TransactionHistory {
    type Item = TxRecord;
    type IntoIter = std::vec::IntoIter<TxRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

/// Union of both sources by id
///
/// For an id present in both, the bookkeeping record wins. Within
/// bookkeeping, duplicates resolve to the most advanced status; within the
/// local list the first occurrence is kept. Ordered by timestamp, then id,
/// both descending.
pub fn reconcile(bookkeeping: Vec<TxRecord>, local: Vec<TxRecord>) -> TransactionHistory {
    let mut by_id: HashMap<TxId, TxRecord> = HashMap::with_capacity(bookkeeping.len());
    for record in bookkeeping {
        match by_id.entry(record.id.clone()) {
            Entry::Occupied(mut existing) => {
                if record.status > existing.get().status {
                    existing.insert(record);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
        }
    }

    // existing entries are bookkeeping records or earlier local ones
    for record in local {
        by_id.entry(record.id.clone()).or_insert(record);
    }

    let mut records: Vec<TxRecord> = by_id.into_values().collect();
    records.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| b.id.cmp(&a.id))
    });
    TransactionHistory { records }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Direction;
    use chrono::{DateTime, TimeZone, Utc};
    use proptest::prelude::*;
    use std::collections::HashSet;
    use tonwallet_core::Amount;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn record(id: TxId, status: TxStatus, secs: i64) -> TxRecord {
        TxRecord {
            id,
            direction: Direction::Sent,
            amount: Amount::from_nano(1_000).unwrap(),
            counterparty: "UQDnuKfcBFbPfcUm63GjmeMRmT9b7JcVhjwVik-YHCrmMQsb".into(),
            status,
            timestamp: at(secs),
        }
    }

    fn ids(history: &TransactionHistory) -> Vec<TxId> {
        history.iter().map(|r| r.id.clone()).collect()
    }

    #[test]
    fn test_bookkeeping_status_wins() {
        let remote = vec![
            record(TxId::Assigned(1), TxStatus::Completed, 10),
            record(TxId::Assigned(2), TxStatus::Pending, 20),
        ];
        let local = vec![
            record(TxId::Assigned(1), TxStatus::Pending, 10),
            record(TxId::local("x"), TxStatus::Pending, 30),
        ];
        let history = reconcile(remote, local);

        assert_eq!(
            ids(&history),
            vec![TxId::local("x"), TxId::Assigned(2), TxId::Assigned(1)]
        );
        assert_eq!(history.get(&TxId::Assigned(1)).unwrap().status, TxStatus::Completed);
        assert_eq!(history.pending().count(), 2);
    }

    #[test]
    fn test_equal_timestamps_order_by_id() {
        let remote = vec![
            record(TxId::Assigned(3), TxStatus::Completed, 0),
            record(TxId::Assigned(9), TxStatus::Completed, 0),
        ];
        let local = vec![record(TxId::local("a"), TxStatus::Pending, 0)];
        let history = reconcile(remote, local);
        assert_eq!(
            ids(&history),
            vec![TxId::local("a"), TxId::Assigned(9), TxId::Assigned(3)]
        );
    }

    #[test]
    fn test_duplicates_within_a_source() {
        let remote = vec![
            record(TxId::Assigned(1), TxStatus::Pending, 0),
            record(TxId::Assigned(1), TxStatus::Completed, 5),
            record(TxId::Assigned(1), TxStatus::Pending, 9),
        ];
        let local = vec![
            record(TxId::local("a"), TxStatus::Pending, 1),
            record(TxId::local("a"), TxStatus::Pending, 2),
        ];
        let history = reconcile(remote, local);

        assert_eq!(history.len(), 2);
        let merged = history.get(&TxId::Assigned(1)).unwrap();
        assert_eq!(merged.status, TxStatus::Completed);
        assert_eq!(merged.timestamp, at(5));
        assert_eq!(history.get(&TxId::local("a")).unwrap().timestamp, at(1));
    }

    #[test]
    fn test_empty_inputs() {
        assert!(reconcile(Vec::new(), Vec::new()).is_empty());
    }

    fn arb_record() -> impl Strategy<Value = TxRecord> {
        (
            prop_oneof![
                (0u64..8).prop_map(TxId::Assigned),
                "[a-c]".prop_map(TxId::Local),
            ],
            any::<bool>(),
            0i64..5,
        )
            .prop_map(|(id, done, secs)| {
                let status = if done { TxStatus::Completed } else { TxStatus::Pending };
                record(id, status, secs)
            })
    }

    proptest! {
        #[test]
        fn prop_reconcile_is_idempotent(
            remote in prop::collection::vec(arb_record(), 0..12),
            local in prop::collection::vec(arb_record(), 0..12),
        ) {
            let once = reconcile(remote, local);
            let twice = reconcile(once.clone().into_records(), Vec::new());
            prop_assert_eq!(&twice, &once);

            let as_local = reconcile(Vec::new(), once.clone().into_records());
            prop_assert_eq!(&as_local, &once);
        }

        #[test]
        fn prop_no_duplicate_ids_and_sorted(
            remote in prop::collection::vec(arb_record(), 0..12),
            local in prop::collection::vec(arb_record(), 0..12),
        ) {
            let history = reconcile(remote.clone(), local.clone());
            let unique: HashSet<_> = history.iter().map(|r| &r.id).collect();
            prop_assert_eq!(unique.len(), history.len());

            for pair in history.records().windows(2) {
                prop_assert!((pair[0].timestamp, &pair[0].id) > (pair[1].timestamp, &pair[1].id));
            }

            // every input id survives
            for r in remote.iter().chain(local.iter()) {
                prop_assert!(history.get(&r.id).is_some());
            }
        }
    }
}
