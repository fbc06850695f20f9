//! Staking collaborator.
//!
//! The ledger never derives voting power itself. Individual voters bring their
//! power with each vote; the total bonded power a quorum is measured against
//! comes from an external staking ledger through this trait.

use crate::{AgoraError, Amount, ChainId};

/// Reports the total voting power bonded on a chain.
pub trait BondedPower: Send + Sync {
    fn total_bonded(&self, chain: &ChainId) -> Result<Amount, AgoraError>;
}
