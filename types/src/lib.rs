//! Fundamental types for the Agora governance ledger.
//!
//! Every other crate in the workspace builds on these:
//! amounts, basis points, timestamps and clocks, chain identifiers, and the
//! collaborator traits the ledger consumes from the outside world.

pub mod amount;
pub mod bps;
pub mod chain;
pub mod error;
pub mod stake;
pub mod time;

pub use amount::Amount;
pub use bps::Bps;
pub use chain::{ChainDenom, ChainId};
pub use error::AgoraError;
pub use stake::BondedPower;
pub use time::{Clock, SystemClock, Timestamp, SECS_PER_DAY};
