//! Bonded power taken from the `[[chains]]` sections of the config file.

use std::collections::HashMap;

use agora_types::{AgoraError, Amount, BondedPower, ChainId};

use crate::config::ChainSection;

pub struct ConfiguredBondedPower {
    by_chain: HashMap<ChainId, Amount>,
}

impl ConfiguredBondedPower {
    pub fn from_chains(chains: &[ChainSection]) -> Self {
        Self {
            by_chain: chains
                .iter()
                .map(|chain| (chain.chain_id(), Amount::from(chain.bonded_power)))
                .collect(),
        }
    }
}

impl BondedPower for ConfiguredBondedPower {
    fn total_bonded(&self, chain: &ChainId) -> Result<Amount, AgoraError> {
        self.by_chain
            .get(chain)
            .copied()
            .ok_or_else(|| AgoraError::UnknownChain(chain.to_string()))
    }
}
