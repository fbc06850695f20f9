//! Typed, versioned access to the governance store.
//!
//! Records are bincode-encoded here; the store only sees bytes and versions.
//! Every mutating operation in this crate follows the same shape: load the
//! records it touches with their versions, build a batch of `Swap`s against
//! those versions, commit, and start over if another writer got in first.

use std::sync::Arc;

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use agora_store::{GovernanceStore, Table, WriteBatch};

use crate::GovernanceError;

/// Attempts made by [`with_retry`] before a conflict is returned to the caller.
pub const MAX_ATTEMPTS: u32 = 8;

type Blake2b256 = Blake2b<U32>;

/// A decoded record together with the version it was read at.
#[derive(Clone, Debug)]
pub struct Versioned<T> {
    pub version: u64,
    pub value: T,
}

/// Shared handle over the store, cloned into every component.
#[derive(Clone)]
pub struct Repo {
    store: Arc<dyn GovernanceStore>,
}

impl Repo {
    pub fn new(store: Arc<dyn GovernanceStore>) -> Self {
        Self { store }
    }

    pub fn load<T: DeserializeOwned>(
        &self,
        table: Table,
        key: &str,
    ) -> Result<Option<Versioned<T>>, GovernanceError> {
        match self.store.get(table, key)? {
            Some(record) => Ok(Some(Versioned {
                version: record.version,
                value: bincode::deserialize(&record.data)?,
            })),
            None => Ok(None),
        }
    }

    pub fn scan<T: DeserializeOwned>(
        &self,
        table: Table,
        prefix: &str,
    ) -> Result<Vec<Versioned<T>>, GovernanceError> {
        self.store
            .scan(table, prefix)?
            .into_iter()
            .map(|(_, record)| {
                Ok(Versioned {
                    version: record.version,
                    value: bincode::deserialize(&record.data)?,
                })
            })
            .collect()
    }

    pub fn commit(&self, batch: WriteBatch) -> Result<(), GovernanceError> {
        Ok(self.store.commit(batch)?)
    }

    pub fn next_sequence(&self, name: &str) -> Result<u64, GovernanceError> {
        Ok(self.store.next_sequence(name)?)
    }
}

pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, GovernanceError> {
    Ok(bincode::serialize(value)?)
}

/// Run `attempt` until it succeeds, fails with something other than a version
/// conflict, or [`MAX_ATTEMPTS`] conflicts have been seen.
pub fn with_retry<T>(
    operation: &'static str,
    mut attempt: impl FnMut() -> Result<T, GovernanceError>,
) -> Result<T, GovernanceError> {
    let mut tries = 1;
    loop {
        match attempt() {
            Err(GovernanceError::Store(e)) if e.is_conflict() && tries < MAX_ATTEMPTS => {
                debug!(operation, attempt = tries, error = %e, "write conflict, retrying");
                tries += 1;
            }
            other => return other,
        }
    }
}

/// Lower-case hex of the first `len` characters of blake2b-256 over `parts`.
pub fn short_digest(parts: &[&[u8]], len: usize) -> String {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    let mut digest = hex::encode(hasher.finalize());
    digest.truncate(len);
    digest
}

/// Derive a record identifier `"{kind}_{chain}_{16 hex}"`.
///
/// The sequence number makes two records created in the same second with
/// identical inputs distinct.
pub fn derive_id(
    repo: &Repo,
    kind: &'static str,
    chain: &str,
    salt: &str,
    now: u64,
) -> Result<String, GovernanceError> {
    let seq = repo.next_sequence(kind)?;
    let digest = short_digest(
        &[
            chain.as_bytes(),
            &seq.to_be_bytes(),
            salt.as_bytes(),
            &now.to_be_bytes(),
        ],
        16,
    );
    Ok(format!("{kind}_{chain}_{digest}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_nullables::NullStore;
    use agora_store::StoreError;
    use std::cell::Cell;

    fn conflict() -> GovernanceError {
        GovernanceError::Store(StoreError::Conflict {
            key: "k".into(),
            expected: 1,
            found: 2,
        })
    }

    #[test]
    fn retry_recovers_from_transient_conflicts() {
        let calls = Cell::new(0);
        let result = with_retry("test", || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(conflict())
            } else {
                Ok(calls.get())
            }
        });
        assert_eq!(result.unwrap(), 3);
    }

    #[test]
    fn retry_gives_up_after_max_attempts() {
        let calls = Cell::new(0);
        let result: Result<(), _> = with_retry("test", || {
            calls.set(calls.get() + 1);
            Err(conflict())
        });
        assert!(result.unwrap_err().is_retryable());
        assert_eq!(calls.get(), MAX_ATTEMPTS);
    }

    #[test]
    fn retry_does_not_repeat_other_errors() {
        let calls = Cell::new(0);
        let result: Result<(), _> = with_retry("test", || {
            calls.set(calls.get() + 1);
            Err(GovernanceError::Validation("bad".into()))
        });
        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn derived_ids_are_distinct_and_shaped() {
        let repo = Repo::new(Arc::new(NullStore::new()));
        let a = derive_id(&repo, "proposal", "testnet-1", "alice", 100).unwrap();
        let b = derive_id(&repo, "proposal", "testnet-1", "alice", 100).unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("proposal_testnet-1_"));
        assert_eq!(a.len(), "proposal_testnet-1_".len() + 16);
    }

    #[test]
    fn short_digest_is_stable() {
        assert_eq!(short_digest(&[b"alice"], 8), short_digest(&[b"alice"], 8));
        assert_ne!(short_digest(&[b"alice"], 8), short_digest(&[b"bob"], 8));
        assert_eq!(short_digest(&[b"alice"], 8).len(), 8);
    }
}
