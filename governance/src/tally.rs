//! Vote ledger and proposal finalization.

use std::sync::Arc;

use agora_store::{StoreError, Table, WriteBatch};
use agora_types::{AgoraError, Amount, BondedPower, Clock};
use tracing::info;

use crate::lifecycle::{finalize, ProposalLifecycle};
use crate::params::GovernanceConfig;
use crate::proposal::{FailureReason, ProposalStatus, TallyResult, TallyResults};
use crate::registry::ConfigRegistry;
use crate::repo::{encode, short_digest, with_retry, Repo, Versioned};
use crate::vote::{vote_key, Vote, VoteOption};
use crate::GovernanceError;

/// Terminal status a tally resolves to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Outcome {
    pub status: ProposalStatus,
    pub failure_reason: Option<FailureReason>,
}

/// Apply the decision rule to final vote totals.
///
/// Quorum is checked first: if the turnout against `bonded_power` is below
/// the chain's quorum the proposal fails whatever the split. Otherwise it
/// passes when someone voted, yes reaches the voting threshold and
/// no-with-veto stays below the veto threshold.
pub fn decide(
    tally: &TallyResults,
    bonded_power: Amount,
    config: &GovernanceConfig,
) -> Result<Outcome, GovernanceError> {
    let total = tally.total().ok_or(AgoraError::Overflow("tally total"))?;
    if !config.quorum.is_reached_by(total, bonded_power) {
        return Ok(Outcome {
            status: ProposalStatus::Failed,
            failure_reason: Some(FailureReason::QuorumNotMet),
        });
    }
    let passed = !total.is_zero()
        && config.voting_threshold.is_reached_by(tally.yes, total)
        && !config.veto_threshold.is_reached_by(tally.no_with_veto, total);
    Ok(Outcome {
        status: if passed {
            ProposalStatus::Passed
        } else {
            ProposalStatus::Rejected
        },
        failure_reason: None,
    })
}

#[derive(Clone)]
pub struct TallyEngine {
    repo: Repo,
    clock: Arc<dyn Clock>,
    bonded_power: Arc<dyn BondedPower>,
    registry: ConfigRegistry,
    lifecycle: ProposalLifecycle,
}

impl TallyEngine {
    pub fn new(
        repo: Repo,
        clock: Arc<dyn Clock>,
        bonded_power: Arc<dyn BondedPower>,
        registry: ConfigRegistry,
        lifecycle: ProposalLifecycle,
    ) -> Self {
        Self {
            repo,
            clock,
            bonded_power,
            registry,
            lifecycle,
        }
    }

    /// Record a vote, replacing the voter's previous vote if there is one.
    pub fn cast_vote(
        &self,
        proposal_id: &str,
        voter: &str,
        option: VoteOption,
        voting_power: Amount,
    ) -> Result<Vote, GovernanceError> {
        with_retry("cast_vote", || {
            let Versioned { version, value: mut proposal } = self.lifecycle.load(proposal_id)?;
            if proposal.status != ProposalStatus::VotingPeriod {
                return Err(GovernanceError::invalid_state(
                    format!("proposal {proposal_id}"),
                    proposal.status,
                    "accept votes",
                ));
            }
            let now = self.clock.now();
            if now > proposal.voting_end_time {
                return Err(GovernanceError::PeriodExpired("voting"));
            }
            if voter.trim().is_empty() {
                return Err(GovernanceError::Validation("voter must not be empty".into()));
            }
            if voting_power.is_zero() {
                return Err(GovernanceError::Validation(
                    "voting power must be positive".into(),
                ));
            }

            let key = vote_key(proposal_id, voter);
            let previous = self.repo.load::<Vote>(Table::Votes, &key)?;
            if let Some(prev) = &previous {
                proposal
                    .tally_results
                    .remove(prev.value.option, prev.value.voting_power)
                    .ok_or_else(|| {
                        StoreError::Corruption(format!(
                            "tally of {proposal_id} is missing the vote of {voter}"
                        ))
                    })?;
            }
            proposal
                .tally_results
                .add(option, voting_power)
                .ok_or(AgoraError::Overflow("tally"))?;

            let vote = Vote {
                vote_id: format!("vote_{proposal_id}_{}", short_digest(&[voter.as_bytes()], 8)),
                proposal_id: proposal_id.to_string(),
                voter: voter.to_string(),
                option,
                voting_power,
                voted_at: now,
            };

            let mut batch = WriteBatch::new();
            batch.swap(Table::Proposals, proposal_id, version, encode(&proposal)?);
            match &previous {
                Some(prev) => batch.swap(Table::Votes, &key, prev.version, encode(&vote)?),
                None => batch.insert(Table::Votes, &key, encode(&vote)?),
            };
            self.repo.commit(batch)?;

            info!(
                proposal_id,
                voter,
                option = %option,
                power = %voting_power,
                revote = previous.is_some(),
                "vote recorded"
            );
            Ok(vote)
        })
    }

    /// Finalize a proposal whose deadline has passed and return its result.
    ///
    /// Once a proposal is terminal its stored result is returned unchanged.
    pub fn tally_votes(&self, proposal_id: &str) -> Result<TallyResult, GovernanceError> {
        with_retry("tally_votes", || {
            let current = self.lifecycle.load(proposal_id)?;
            let proposal = &current.value;
            if proposal.status.is_terminal() {
                return proposal.final_tally.clone().ok_or_else(|| {
                    StoreError::Corruption(format!("terminal proposal {proposal_id} has no result"))
                        .into()
                });
            }

            let now = self.clock.now();
            let status = proposal.status;
            match status {
                ProposalStatus::DepositPeriod if now > proposal.deposit_end_time => finalize(
                    &self.repo,
                    current,
                    ProposalStatus::Failed,
                    Some(FailureReason::DepositTimeout),
                    Amount::ZERO,
                    now,
                ),
                ProposalStatus::VotingPeriod if now > proposal.voting_end_time => {
                    let config = self.registry.get(&proposal.chain_id)?;
                    let bonded = self.bonded_power.total_bonded(&proposal.chain_id)?;
                    let outcome = decide(&proposal.tally_results, bonded, &config)?;
                    finalize(
                        &self.repo,
                        current,
                        outcome.status,
                        outcome.failure_reason,
                        bonded,
                        now,
                    )
                }
                status => Err(GovernanceError::invalid_state(
                    format!("proposal {proposal_id}"),
                    status,
                    "be tallied before its deadline",
                )),
            }
        })
    }

    /// Live votes on a proposal, one per voter.
    pub fn votes(&self, proposal_id: &str) -> Result<Vec<Vote>, GovernanceError> {
        Ok(self
            .repo
            .scan::<Vote>(Table::Votes, &format!("{proposal_id}/"))?
            .into_iter()
            .map(|v| v.value)
            .collect())
    }
}
