//! Nullable store: thread-safe in-memory storage for testing.

use agora_store::{GovernanceStore, Record, StoreError, Table, WriteBatch, WriteOp};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

type Key = (Table, String);

#[derive(Default)]
struct Inner {
    records: BTreeMap<Key, Record>,
    sequences: HashMap<String, u64>,
    injected_conflicts: u32,
}

/// An in-memory [`GovernanceStore`] for testing.
///
/// A single mutex serialises commits, which gives batches the same
/// all-or-nothing behaviour as an LMDB write transaction.
#[derive(Default)]
pub struct NullStore {
    inner: Mutex<Inner>,
}

impl NullStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` commits fail with a version conflict, as if
    /// another writer had raced each of them.
    pub fn inject_conflicts(&self, count: u32) {
        self.inner.lock().unwrap().injected_conflicts = count;
    }

    /// Total number of records across every table.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn apply(
    staged: &mut BTreeMap<Key, Record>,
    base: &BTreeMap<Key, Record>,
    op: WriteOp,
) -> Result<(), StoreError> {
    let id = (op.table(), op.key().to_string());
    let current = staged.get(&id).or_else(|| base.get(&id)).map(|r| r.version);
    let next = match op {
        WriteOp::Insert { data, .. } => {
            if current.is_some() {
                return Err(StoreError::Duplicate(format!("{}/{}", id.0, id.1)));
            }
            Record::new(1, data)
        }
        WriteOp::Put { data, .. } => Record::new(current.map_or(1, |v| v + 1), data),
        WriteOp::Swap { expected, data, .. } => match current {
            None => return Err(StoreError::NotFound(format!("{}/{}", id.0, id.1))),
            Some(found) if found != expected => {
                return Err(StoreError::Conflict {
                    key: format!("{}/{}", id.0, id.1),
                    expected,
                    found,
                })
            }
            Some(found) => Record::new(found + 1, data),
        },
    };
    staged.insert(id, next);
    Ok(())
}

impl GovernanceStore for NullStore {
    fn get(&self, table: Table, key: &str) -> Result<Option<Record>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .records
            .get(&(table, key.to_string()))
            .cloned())
    }

    fn scan(&self, table: Table, prefix: &str) -> Result<Vec<(String, Record)>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .records
            .range((table, prefix.to_string())..)
            .take_while(|((t, k), _)| *t == table && k.starts_with(prefix))
            .map(|((_, k), r)| (k.clone(), r.clone()))
            .collect())
    }

    fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.injected_conflicts > 0 {
            inner.injected_conflicts -= 1;
            return Err(StoreError::Conflict {
                key: "injected".to_string(),
                expected: 0,
                found: 0,
            });
        }
        let mut staged = BTreeMap::new();
        for op in batch.into_ops() {
            apply(&mut staged, &inner.records, op)?;
        }
        inner.records.extend(staged);
        Ok(())
    }

    fn next_sequence(&self, name: &str) -> Result<u64, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let seq = inner.sequences.entry(name.to_string()).or_insert(0);
        *seq += 1;
        Ok(*seq)
    }
}
