//! Governance configuration registry, one config per chain.

use agora_store::{Table, WriteBatch};
use agora_types::{ChainId, Clock};
use std::sync::Arc;
use tracing::info;

use crate::params::{GovernanceConfig, GovernanceParams};
use crate::repo::{encode, Repo, Versioned};
use crate::GovernanceError;

#[derive(Clone)]
pub struct ConfigRegistry {
    repo: Repo,
    clock: Arc<dyn Clock>,
}

impl ConfigRegistry {
    pub fn new(repo: Repo, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    /// Validate `params` and store them as the chain's config, replacing any
    /// previous one.
    pub fn setup(
        &self,
        chain_id: &ChainId,
        params: &GovernanceParams,
    ) -> Result<GovernanceConfig, GovernanceError> {
        let config = GovernanceConfig::from_params(chain_id.clone(), params, self.clock.now())?;
        let mut batch = WriteBatch::new();
        batch.put(Table::Configs, chain_id.as_str(), encode(&config)?);
        self.repo.commit(batch)?;
        info!(
            chain_id = %chain_id,
            voting_threshold = %config.voting_threshold,
            veto_threshold = %config.veto_threshold,
            quorum = %config.quorum,
            "governance config set"
        );
        Ok(config)
    }

    pub fn get(&self, chain_id: &ChainId) -> Result<GovernanceConfig, GovernanceError> {
        self.load(chain_id).map(|v| v.value)
    }

    pub(crate) fn load(
        &self,
        chain_id: &ChainId,
    ) -> Result<Versioned<GovernanceConfig>, GovernanceError> {
        self.repo
            .load::<GovernanceConfig>(Table::Configs, chain_id.as_str())?
            .ok_or_else(|| GovernanceError::ConfigNotFound(chain_id.to_string()))
    }

    pub fn list(&self) -> Result<Vec<GovernanceConfig>, GovernanceError> {
        Ok(self
            .repo
            .scan::<GovernanceConfig>(Table::Configs, "")?
            .into_iter()
            .map(|v| v.value)
            .collect())
    }
}
