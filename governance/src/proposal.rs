//! Governance proposals and their lifecycle states.

use std::collections::BTreeMap;
use std::fmt;

use agora_types::{Amount, ChainId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::vote::VoteOption;
use crate::GovernanceError;

/// Where a proposal is in its life.
///
/// ```text
/// DepositPeriod -> VotingPeriod | Failed
/// VotingPeriod  -> Passed | Rejected | Failed
/// ```
/// Passed, Rejected and Failed are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalStatus {
    DepositPeriod,
    VotingPeriod,
    Passed,
    Rejected,
    Failed,
}

impl ProposalStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Passed | Self::Rejected | Self::Failed)
    }

    pub fn can_transition_to(&self, next: ProposalStatus) -> bool {
        use ProposalStatus::*;
        matches!(
            (self, next),
            (DepositPeriod, VotingPeriod)
                | (DepositPeriod, Failed)
                | (VotingPeriod, Passed)
                | (VotingPeriod, Rejected)
                | (VotingPeriod, Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DepositPeriod => "deposit_period",
            Self::VotingPeriod => "voting_period",
            Self::Passed => "passed",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a proposal ended up [`ProposalStatus::Failed`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    /// The deposit period ended below the minimum deposit.
    DepositTimeout,
    /// Turnout against bonded power stayed below quorum.
    QuorumNotMet,
}

/// Payload of a treasury spending proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendingRequest {
    pub account_id: String,
    pub recipient: String,
    pub amount: Amount,
    pub purpose: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalType {
    Text,
    ParameterChange,
    SoftwareUpgrade,
    TreasurySpending(SpendingRequest),
    CommunityPoolSpend,
    TaxRateChange,
    HaltNetwork,
    EnableIbc,
}

impl ProposalType {
    /// Stable name used in dashboards and exports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::ParameterChange => "parameter_change",
            Self::SoftwareUpgrade => "software_upgrade",
            Self::TreasurySpending(_) => "treasury_spending",
            Self::CommunityPoolSpend => "community_pool_spend",
            Self::TaxRateChange => "tax_rate_change",
            Self::HaltNetwork => "halt_network",
            Self::EnableIbc => "enable_ibc",
        }
    }

    pub fn spending(&self) -> Option<&SpendingRequest> {
        match self {
            Self::TreasurySpending(request) => Some(request),
            _ => None,
        }
    }
}

/// Running vote totals, weighted by voting power.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyResults {
    pub yes: Amount,
    pub abstain: Amount,
    pub no: Amount,
    pub no_with_veto: Amount,
}

impl TallyResults {
    fn slot(&mut self, option: VoteOption) -> &mut Amount {
        match option {
            VoteOption::Yes => &mut self.yes,
            VoteOption::Abstain => &mut self.abstain,
            VoteOption::No => &mut self.no,
            VoteOption::NoWithVeto => &mut self.no_with_veto,
        }
    }

    pub fn get(&self, option: VoteOption) -> Amount {
        match option {
            VoteOption::Yes => self.yes,
            VoteOption::Abstain => self.abstain,
            VoteOption::No => self.no,
            VoteOption::NoWithVeto => self.no_with_veto,
        }
    }

    pub fn add(&mut self, option: VoteOption, power: Amount) -> Option<()> {
        let slot = self.slot(option);
        *slot = slot.checked_add(power)?;
        Some(())
    }

    pub fn remove(&mut self, option: VoteOption, power: Amount) -> Option<()> {
        let slot = self.slot(option);
        *slot = slot.checked_sub(power)?;
        Some(())
    }

    pub fn total(&self) -> Option<Amount> {
        Amount::checked_sum([self.yes, self.abstain, self.no, self.no_with_veto])
    }
}

/// The outcome of finalizing a proposal, stored on it once terminal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TallyResult {
    pub proposal_id: String,
    pub status: ProposalStatus,
    pub passed: bool,
    pub failure_reason: Option<FailureReason>,
    pub tally: TallyResults,
    pub total: Amount,
    pub bonded_power: Amount,
    pub yes_percentage: f64,
    pub veto_percentage: f64,
    pub turnout_percentage: f64,
    pub tallied_at: Timestamp,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub proposal_id: String,
    pub chain_id: ChainId,
    pub title: String,
    pub description: String,
    pub proposal_type: ProposalType,
    pub proposer: String,
    pub initial_deposit: Amount,
    pub total_deposit: Amount,
    pub status: ProposalStatus,
    pub failure_reason: Option<FailureReason>,
    pub submit_time: Timestamp,
    pub deposit_end_time: Timestamp,
    pub voting_start_time: Timestamp,
    pub voting_end_time: Timestamp,
    pub tally_results: TallyResults,
    pub final_tally: Option<TallyResult>,
    pub metadata: BTreeMap<String, String>,
}

impl Proposal {
    /// Move to `next` if the transition table allows it.
    pub fn transition(&mut self, next: ProposalStatus) -> Result<(), GovernanceError> {
        if !self.status.can_transition_to(next) {
            return Err(GovernanceError::invalid_state(
                format!("proposal {}", self.proposal_id),
                self.status,
                "change status",
            ));
        }
        self.status = next;
        Ok(())
    }

    pub fn is_treasury_spending(&self) -> bool {
        self.proposal_type.spending().is_some()
    }
}
