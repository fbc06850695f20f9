//! Nullable staking ledger: fixed bonded power per chain.

use agora_types::{AgoraError, Amount, BondedPower, ChainId};
use std::collections::HashMap;
use std::sync::Mutex;

/// Reports whatever bonded power the test configured for each chain.
#[derive(Default)]
pub struct NullBondedPower {
    by_chain: Mutex<HashMap<ChainId, Amount>>,
}

impl NullBondedPower {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor for a single chain.
    pub fn with_chain(chain: impl Into<ChainId>, bonded: u128) -> Self {
        let power = Self::new();
        power.set(chain, bonded);
        power
    }

    pub fn set(&self, chain: impl Into<ChainId>, bonded: u128) {
        self.by_chain
            .lock()
            .unwrap()
            .insert(chain.into(), Amount::new(bonded));
    }
}

impl BondedPower for NullBondedPower {
    fn total_bonded(&self, chain: &ChainId) -> Result<Amount, AgoraError> {
        self.by_chain
            .lock()
            .unwrap()
            .get(chain)
            .copied()
            .ok_or_else(|| AgoraError::UnknownChain(chain.to_string()))
    }
}
