//! Daemon configuration, loaded from a TOML file.
//!
//! Every field has a serde default, so an empty file is a valid config.
//! Chains are listed as `[[chains]]` tables; amounts are whole units that
//! fit in a TOML integer and thresholds are percentages.

use std::path::{Path, PathBuf};

use agora_governance::GovernanceParams;
use agora_types::{Amount, ChainId, SECS_PER_DAY};
use agora_utils::LogFormat;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("chain '{0}' is listed twice")]
    DuplicateChain(String),

    #[error("invalid chain id '{0}'")]
    InvalidChain(String),

    #[error("chain '{0}' requires a quorum but reports no bonded power")]
    NoBondedPower(String),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Directory holding the LMDB environment.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// LMDB map size in MiB.
    #[serde(default = "default_map_size_mb")]
    pub map_size_mb: usize,

    #[serde(default)]
    pub log_format: LogFormat,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Seconds between two sweeps in `run` mode.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    #[serde(default)]
    pub chains: Vec<ChainSection>,
}

/// Governance parameters and bonded power of one chain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChainSection {
    pub chain_id: String,

    /// Total bonded voting power reported to the tally.
    #[serde(default)]
    pub bonded_power: u64,

    /// Denomination shown next to amounts in proposal descriptions.
    #[serde(default = "default_denom")]
    pub denom: String,

    #[serde(default = "default_voting_period_secs")]
    pub voting_period_secs: u64,
    #[serde(default = "default_deposit_period_secs")]
    pub deposit_period_secs: u64,
    #[serde(default = "default_min_deposit")]
    pub min_deposit: u64,
    #[serde(default = "default_max_deposit")]
    pub max_deposit: u64,
    #[serde(default = "default_min_deposit")]
    pub min_initial_deposit: u64,
    #[serde(default)]
    pub proposal_fee: u64,
    #[serde(default = "default_voting_threshold")]
    pub voting_threshold: f64,
    #[serde(default = "default_veto_quorum")]
    pub veto_threshold: f64,
    #[serde(default = "default_veto_quorum")]
    pub quorum: f64,
    #[serde(default = "default_deposit_period_secs")]
    pub max_proposal_period_secs: u64,
    #[serde(default = "default_max_pending")]
    pub max_pending_proposals: u32,
    #[serde(default = "default_emergency_threshold")]
    pub emergency_proposal_threshold: f64,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./agora_data")
}

fn default_map_size_mb() -> usize {
    1024
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_denom() -> String {
    "uatom".to_string()
}

fn default_voting_period_secs() -> u64 {
    7 * SECS_PER_DAY
}

fn default_deposit_period_secs() -> u64 {
    14 * SECS_PER_DAY
}

fn default_min_deposit() -> u64 {
    1_000
}

fn default_max_deposit() -> u64 {
    1_000_000
}

fn default_voting_threshold() -> f64 {
    50.0
}

fn default_veto_quorum() -> f64 {
    33.4
}

fn default_max_pending() -> u32 {
    10
}

fn default_emergency_threshold() -> f64 {
    60.0
}

impl DaemonConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and check that chain ids are usable and unique, and that every
    /// chain with a quorum has bonded power to measure it against.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        let mut seen = std::collections::HashSet::new();
        for chain in &config.chains {
            if !ChainId::new(chain.chain_id.as_str()).is_valid() {
                return Err(ConfigError::InvalidChain(chain.chain_id.clone()));
            }
            if !seen.insert(chain.chain_id.as_str()) {
                return Err(ConfigError::DuplicateChain(chain.chain_id.clone()));
            }
            if chain.bonded_power == 0 && chain.quorum > 0.0 {
                return Err(ConfigError::NoBondedPower(chain.chain_id.clone()));
            }
        }
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn map_size_bytes(&self) -> usize {
        self.map_size_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            map_size_mb: default_map_size_mb(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            sweep_interval_secs: default_sweep_interval_secs(),
            chains: Vec::new(),
        }
    }
}

impl ChainSection {
    pub fn chain_id(&self) -> ChainId {
        ChainId::new(self.chain_id.as_str())
    }

    pub fn to_params(&self) -> GovernanceParams {
        GovernanceParams {
            voting_period_secs: self.voting_period_secs,
            deposit_period_secs: self.deposit_period_secs,
            min_deposit: Amount::from(self.min_deposit),
            max_deposit: Amount::from(self.max_deposit),
            min_initial_deposit: Amount::from(self.min_initial_deposit),
            proposal_fee: Amount::from(self.proposal_fee),
            voting_threshold: self.voting_threshold,
            veto_threshold: self.veto_threshold,
            quorum: self.quorum,
            max_proposal_period_secs: self.max_proposal_period_secs,
            max_pending_proposals: self.max_pending_proposals,
            emergency_proposal_threshold: self.emergency_proposal_threshold,
        }
    }
}
