//! Governance storage trait.

use crate::{Record, StoreError, Table, WriteBatch};

/// Versioned key-value storage for every governance collection.
///
/// Keys are UTF-8 strings; composite keys use `/` as the separator
/// (votes are keyed `proposal_id/voter`), so a prefix scan over
/// `"{proposal_id}/"` lists one proposal's votes.
pub trait GovernanceStore: Send + Sync {
    /// Fetch one record, `None` if the key is absent.
    fn get(&self, table: Table, key: &str) -> Result<Option<Record>, StoreError>;

    /// All `(key, record)` pairs whose key starts with `prefix`, in key order.
    fn scan(&self, table: Table, prefix: &str) -> Result<Vec<(String, Record)>, StoreError>;

    /// Apply every operation of `batch` atomically.
    ///
    /// On error nothing in the batch is visible to readers.
    fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;

    /// Increment and return the named counter (the first call returns 1).
    fn next_sequence(&self, name: &str) -> Result<u64, StoreError>;

    /// Number of records in `table`.
    fn count(&self, table: Table) -> Result<u64, StoreError> {
        self.scan(table, "").map(|rows| rows.len() as u64)
    }
}
