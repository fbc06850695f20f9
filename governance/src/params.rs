//! Per-chain governance parameters.
//!
//! Callers supply [`GovernanceParams`] with thresholds as percentages; setup
//! validates them and stores a [`GovernanceConfig`] whose thresholds are basis
//! points. Proposals copy the deadlines they need at creation, so replacing a
//! config never moves the goalposts of a proposal already in flight.

use agora_types::{Amount, Bps, ChainId, Timestamp, SECS_PER_DAY};
use serde::{Deserialize, Serialize};

use crate::GovernanceError;

/// Unvalidated governance parameters, as supplied by an operator.
#[derive(Clone, Debug, PartialEq)]
pub struct GovernanceParams {
    pub voting_period_secs: u64,
    pub deposit_period_secs: u64,
    pub min_deposit: Amount,
    pub max_deposit: Amount,
    pub min_initial_deposit: Amount,
    pub proposal_fee: Amount,
    /// Percent of the turnout that must vote yes.
    pub voting_threshold: f64,
    /// Percent of the turnout voting no-with-veto that rejects outright.
    pub veto_threshold: f64,
    /// Percent of bonded power that must vote at all.
    pub quorum: f64,
    pub max_proposal_period_secs: u64,
    pub max_pending_proposals: u32,
    pub emergency_proposal_threshold: f64,
}

impl Default for GovernanceParams {
    fn default() -> Self {
        Self {
            voting_period_secs: 7 * SECS_PER_DAY,
            deposit_period_secs: 14 * SECS_PER_DAY,
            min_deposit: Amount::new(1_000),
            max_deposit: Amount::new(1_000_000),
            min_initial_deposit: Amount::new(1_000),
            proposal_fee: Amount::ZERO,
            voting_threshold: 50.0,
            veto_threshold: 33.4,
            quorum: 33.4,
            max_proposal_period_secs: 14 * SECS_PER_DAY,
            max_pending_proposals: 10,
            emergency_proposal_threshold: 60.0,
        }
    }
}

/// The validated governance configuration of one chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceConfig {
    pub chain_id: ChainId,
    pub voting_period_secs: u64,
    pub deposit_period_secs: u64,
    pub min_deposit: Amount,
    pub max_deposit: Amount,
    pub min_initial_deposit: Amount,
    pub proposal_fee: Amount,
    pub voting_threshold: Bps,
    pub veto_threshold: Bps,
    pub quorum: Bps,
    pub max_proposal_period_secs: u64,
    pub max_pending_proposals: u32,
    pub emergency_proposal_threshold: Bps,
    pub updated_at: Timestamp,
}

fn percent(name: &str, value: f64) -> Result<Bps, GovernanceError> {
    Bps::from_percent(value).ok_or_else(|| {
        GovernanceError::Validation(format!("{name} must be between 0 and 100, got {value}"))
    })
}

impl GovernanceConfig {
    pub fn from_params(
        chain_id: ChainId,
        params: &GovernanceParams,
        now: Timestamp,
    ) -> Result<Self, GovernanceError> {
        if !chain_id.is_valid() {
            return Err(GovernanceError::Validation(format!(
                "invalid chain id '{chain_id}'"
            )));
        }
        if params.voting_period_secs == 0 {
            return Err(GovernanceError::Validation(
                "voting period must be positive".into(),
            ));
        }
        if params.deposit_period_secs == 0 {
            return Err(GovernanceError::Validation(
                "deposit period must be positive".into(),
            ));
        }
        if params.min_deposit > params.max_deposit {
            return Err(GovernanceError::Validation(format!(
                "min deposit {} exceeds max deposit {}",
                params.min_deposit, params.max_deposit
            )));
        }
        if params.min_initial_deposit > params.max_deposit {
            return Err(GovernanceError::Validation(format!(
                "min initial deposit {} exceeds max deposit {}",
                params.min_initial_deposit, params.max_deposit
            )));
        }
        if params.proposal_fee > params.max_deposit {
            return Err(GovernanceError::Validation(format!(
                "proposal fee {} exceeds max deposit {}",
                params.proposal_fee, params.max_deposit
            )));
        }

        Ok(Self {
            chain_id,
            voting_period_secs: params.voting_period_secs,
            deposit_period_secs: params.deposit_period_secs,
            min_deposit: params.min_deposit,
            max_deposit: params.max_deposit,
            min_initial_deposit: params.min_initial_deposit,
            proposal_fee: params.proposal_fee,
            voting_threshold: percent("voting threshold", params.voting_threshold)?,
            veto_threshold: percent("veto threshold", params.veto_threshold)?,
            quorum: percent("quorum", params.quorum)?,
            max_proposal_period_secs: params.max_proposal_period_secs,
            max_pending_proposals: params.max_pending_proposals,
            emergency_proposal_threshold: percent(
                "emergency proposal threshold",
                params.emergency_proposal_threshold,
            )?,
            updated_at: now,
        })
    }

    /// Initial deposit attached to a treasury spending proposal.
    pub fn spending_deposit(&self) -> Amount {
        self.proposal_fee.max(self.min_initial_deposit)
    }
}
