//! Locally pending records
//!
//! Transfers submitted to the ledger but not yet acknowledged by
//! bookkeeping. Kept in memory and optionally persisted as JSON.

use crate::record::{TxId, TxRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StateError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingLog {
    records: Vec<TxRecord>,
}

impl PendingLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from file, or start empty if it does not exist
    pub fn load(path: &Path) -> Result<Self, StateError> {
        if path.exists() {
            let contents = fs::read_to_string(path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::new())
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), StateError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Append a record unless its id is already logged
    pub fn push(&mut self, record: TxRecord) -> bool {
        if self.records.iter().any(|r| r.id == record.id) {
            return false;
        }
        self.records.push(record);
        true
    }

    /// Drop entries bookkeeping now reports; returns how many were removed
    pub fn prune<'a>(&mut self, known: impl IntoIterator<Item = &'a TxId>) -> usize {
        let known: HashSet<&TxId> = known.into_iter().collect();
        let before = self.records.len();
        self.records.retain(|r| !known.contains(&r.id));
        before - self.records.len()
    }

    /// Give a local entry the id bookkeeping assigned to it
    ///
    /// Returns false when `old` is not logged. If `new` is already logged
    /// the local entry is dropped instead.
    pub fn reassign(&mut self, old: &TxId, new: TxId) -> bool {
        let Some(pos) = self.records.iter().position(|r| &r.id == old) else {
            return false;
        };
        if self.records.iter().any(|r| r.id == new) {
            self.records.remove(pos);
        } else {
            self.records[pos].id = new;
        }
        true
    }

    /// Entries bookkeeping has not assigned an id to yet
    pub fn unassigned(&self) -> impl Iterator<Item = &TxRecord> {
        self.records.iter().filter(|r| r.id.is_local())
    }

    pub fn records(&self) -> &[TxRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
