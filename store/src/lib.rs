//! Abstract storage traits for the Agora governance ledger.
//!
//! The LMDB backend and the in-memory test store both implement
//! [`GovernanceStore`]; the governance crate sees nothing else.
//!
//! Records are opaque byte payloads tagged with a version. Writers read a
//! record, compute its successor and commit a [`WriteBatch`] of
//! compare-and-swap operations; a batch applies completely or not at all.

pub mod batch;
pub mod error;
pub mod governance;
pub mod record;

pub use batch::{WriteBatch, WriteOp};
pub use error::StoreError;
pub use governance::GovernanceStore;
pub use record::{Record, Table};
