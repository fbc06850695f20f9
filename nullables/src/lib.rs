//! In-memory stand-ins for the ledger's collaborators.
//!
//! Tests hand these to `GovernanceEngine::new` in place of the system clock,
//! the LMDB store, a staking module and a chain registry. Time only moves
//! when a test moves it.

pub mod clock;
pub mod denom;
pub mod stake;
pub mod store;

pub use clock::NullClock;
pub use denom::NullChainDenom;
pub use stake::NullBondedPower;
pub use store::NullStore;
