//! Applies a [`WriteBatch`] inside a single LMDB write transaction.
//!
//! Every operation is checked against the state the transaction sees,
//! including writes made earlier in the same batch. If any operation fails
//! the transaction is dropped without `commit`, which aborts it, so none of
//! the batch becomes visible.

use heed::RwTxn;

use agora_store::{Record, StoreError, WriteBatch, WriteOp};

use crate::environment::LmdbEnvironment;
use crate::LmdbError;

impl LmdbEnvironment {
    pub(crate) fn apply_batch(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        for op in batch.into_ops() {
            self.apply_op(&mut wtxn, op)?;
        }
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn apply_op(&self, wtxn: &mut RwTxn<'_>, op: WriteOp) -> Result<(), StoreError> {
        let table = op.table();
        let db = self.db(table)?;
        let label = format!("{}/{}", table, op.key());

        let current = match db.get(wtxn, op.key().as_bytes()).map_err(LmdbError::from)? {
            Some(bytes) => Some(
                Record::from_bytes(bytes)
                    .ok_or_else(|| LmdbError::Corrupt(label.clone()))?
                    .version,
            ),
            None => None,
        };

        let (key, next) = match op {
            WriteOp::Insert { key, data, .. } => {
                if current.is_some() {
                    return Err(StoreError::Duplicate(label));
                }
                (key, Record::new(1, data))
            }
            WriteOp::Put { key, data, .. } => (key, Record::new(current.map_or(1, |v| v + 1), data)),
            WriteOp::Swap {
                key,
                expected,
                data,
                ..
            } => match current {
                None => return Err(StoreError::NotFound(label)),
                Some(found) if found != expected => {
                    return Err(StoreError::Conflict {
                        key: label,
                        expected,
                        found,
                    })
                }
                Some(found) => (key, Record::new(found + 1, data)),
            },
        };

        db.put(wtxn, key.as_bytes(), &next.to_bytes())
            .map_err(LmdbError::from)?;
        Ok(())
    }
}
