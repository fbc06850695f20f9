//! Nullable chain registry: a fixed denomination per chain.

use agora_types::{AgoraError, ChainDenom, ChainId};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct NullChainDenom {
    by_chain: Mutex<HashMap<ChainId, String>>,
}

impl NullChainDenom {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chain(chain: impl Into<ChainId>, denom: &str) -> Self {
        let denoms = Self::new();
        denoms.set(chain, denom);
        denoms
    }

    pub fn set(&self, chain: impl Into<ChainId>, denom: &str) {
        self.by_chain
            .lock()
            .unwrap()
            .insert(chain.into(), denom.to_string());
    }
}

impl ChainDenom for NullChainDenom {
    fn denom(&self, chain: &ChainId) -> Result<String, AgoraError> {
        self.by_chain
            .lock()
            .unwrap()
            .get(chain)
            .cloned()
            .ok_or_else(|| AgoraError::UnknownChain(chain.to_string()))
    }
}
