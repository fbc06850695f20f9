//! Chain denominations taken from the `[[chains]]` sections of the config file.

use std::collections::HashMap;

use agora_types::{AgoraError, ChainDenom, ChainId};

use crate::config::ChainSection;

pub struct ConfiguredDenoms {
    by_chain: HashMap<ChainId, String>,
}

impl ConfiguredDenoms {
    pub fn from_chains(chains: &[ChainSection]) -> Self {
        Self {
            by_chain: chains
                .iter()
                .map(|chain| (chain.chain_id(), chain.denom.clone()))
                .collect(),
        }
    }
}

impl ChainDenom for ConfiguredDenoms {
    fn denom(&self, chain: &ChainId) -> Result<String, AgoraError> {
        self.by_chain
            .get(chain)
            .cloned()
            .ok_or_else(|| AgoraError::UnknownChain(chain.to_string()))
    }
}
