//! LMDB storage backend for the Agora governance ledger.
//!
//! Implements [`agora_store::GovernanceStore`] using the `heed` LMDB bindings.
//! Each logical table maps to one named LMDB database within a single
//! environment, plus a `meta` database for counters.

pub mod environment;
pub mod error;
pub mod governance;
pub mod integrity;
pub mod write_batch;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use environment::DEFAULT_MAP_SIZE;
pub use integrity::{check_data_dir, check_integrity, IntegrityReport};
