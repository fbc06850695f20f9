//! Write batching: groups several record writes into one atomic commit.
//!
//! # Usage
//!
//! ```ignore
//! let mut batch = WriteBatch::new();
//! batch.swap(Table::Proposals, &proposal_id, proposal_version, proposal_bytes);
//! batch.put(Table::Votes, &vote_key, vote_bytes);
//! store.commit(batch)?;
//! ```
//!
//! Backends must apply either every operation or none of them.

use crate::Table;

/// A single write inside a [`WriteBatch`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WriteOp {
    /// Create a record; fails with `Duplicate` if the key exists.
    Insert {
        table: Table,
        key: String,
        data: Vec<u8>,
    },
    /// Create or overwrite a record unconditionally.
    Put {
        table: Table,
        key: String,
        data: Vec<u8>,
    },
    /// Overwrite a record only if its version still equals `expected`;
    /// fails with `Conflict` otherwise and `NotFound` if it is missing.
    Swap {
        table: Table,
        key: String,
        expected: u64,
        data: Vec<u8>,
    },
}

impl WriteOp {
    pub fn table(&self) -> Table {
        match self {
            Self::Insert { table, .. } | Self::Put { table, .. } | Self::Swap { table, .. } => {
                *table
            }
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Self::Insert { key, .. } | Self::Put { key, .. } | Self::Swap { key, .. } => key,
        }
    }
}

/// An ordered list of writes committed atomically by a `GovernanceStore`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table: Table, key: &str, data: Vec<u8>) -> &mut Self {
        self.ops.push(WriteOp::Insert {
            table,
            key: key.to_string(),
            data,
        });
        self
    }

    pub fn put(&mut self, table: Table, key: &str, data: Vec<u8>) -> &mut Self {
        self.ops.push(WriteOp::Put {
            table,
            key: key.to_string(),
            data,
        });
        self
    }

    pub fn swap(&mut self, table: Table, key: &str, expected: u64, data: Vec<u8>) -> &mut Self {
        self.ops.push(WriteOp::Swap {
            table,
            key: key.to_string(),
            expected,
            data,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_keeps_operation_order() {
        let mut batch = WriteBatch::new();
        batch
            .insert(Table::Proposals, "p1", vec![1])
            .swap(Table::TreasuryAccounts, "a1", 4, vec![2])
            .put(Table::Votes, "p1/alice", vec![3]);
        assert_eq!(batch.len(), 3);
        let keys: Vec<_> = batch.ops().iter().map(WriteOp::key).collect();
        assert_eq!(keys, ["p1", "a1", "p1/alice"]);
        assert_eq!(batch.ops()[1].table(), Table::TreasuryAccounts);
    }
}
