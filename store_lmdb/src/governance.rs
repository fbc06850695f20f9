//! LMDB implementation of GovernanceStore.

use agora_store::{GovernanceStore, Record, StoreError, Table, WriteBatch};

use crate::environment::LmdbEnvironment;
use crate::LmdbError;

fn sequence_key(name: &str) -> Vec<u8> {
    format!("seq/{name}").into_bytes()
}

impl GovernanceStore for LmdbEnvironment {
    fn get(&self, table: Table, key: &str) -> Result<Option<Record>, StoreError> {
        let db = self.db(table)?;
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        match db.get(&rtxn, key.as_bytes()).map_err(LmdbError::from)? {
            Some(bytes) => Record::from_bytes(bytes)
                .map(Some)
                .ok_or_else(|| LmdbError::Corrupt(format!("{table}/{key}")).into()),
            None => Ok(None),
        }
    }

    fn scan(&self, table: Table, prefix: &str) -> Result<Vec<(String, Record)>, StoreError> {
        let db = self.db(table)?;
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let mut rows = Vec::new();
        for entry in db
            .prefix_iter(&rtxn, prefix.as_bytes())
            .map_err(LmdbError::from)?
        {
            let (key, value) = entry.map_err(LmdbError::from)?;
            let key = String::from_utf8(key.to_vec())
                .map_err(|_| LmdbError::Corrupt(format!("{table}: non UTF-8 key")))?;
            let record = Record::from_bytes(value)
                .ok_or_else(|| LmdbError::Corrupt(format!("{table}/{key}")))?;
            rows.push((key, record));
        }
        Ok(rows)
    }

    fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }
        self.apply_batch(batch)
    }

    fn next_sequence(&self, name: &str) -> Result<u64, StoreError> {
        let key = sequence_key(name);
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let current = match self.meta_db.get(&wtxn, &key).map_err(LmdbError::from)? {
            Some(bytes) => {
                let arr: [u8; 8] = bytes
                    .try_into()
                    .map_err(|_| LmdbError::Corrupt(format!("sequence '{name}'")))?;
                u64::from_be_bytes(arr)
            }
            None => 0,
        };
        let next = current + 1;
        self.meta_db
            .put(&mut wtxn, &key, &next.to_be_bytes())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(next)
    }

    fn count(&self, table: Table) -> Result<u64, StoreError> {
        let db = self.db(table)?;
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(db.len(&rtxn).map_err(LmdbError::from)?)
    }
}
