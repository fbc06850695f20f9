//! Proposal creation, deposits and the deposit-period deadline.

use std::collections::BTreeMap;
use std::sync::Arc;

use agora_store::{Table, WriteBatch};
use agora_types::{AgoraError, Amount, ChainId, Clock, Timestamp};
use tracing::{debug, info};

use crate::proposal::{
    FailureReason, Proposal, ProposalStatus, ProposalType, TallyResult, TallyResults,
};
use crate::params::GovernanceConfig;
use crate::registry::ConfigRegistry;
use crate::repo::{derive_id, encode, with_retry, Repo, Versioned};
use crate::treasury::settle_spending;
use crate::GovernanceError;

/// Everything a caller supplies to open a proposal.
#[derive(Clone, Debug)]
pub struct ProposalDraft {
    pub chain_id: ChainId,
    pub title: String,
    pub description: String,
    pub proposal_type: ProposalType,
    pub proposer: String,
    pub initial_deposit: Amount,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Clone)]
pub struct ProposalLifecycle {
    repo: Repo,
    clock: Arc<dyn Clock>,
    registry: ConfigRegistry,
}

impl ProposalLifecycle {
    pub fn new(repo: Repo, clock: Arc<dyn Clock>, registry: ConfigRegistry) -> Self {
        Self {
            repo,
            clock,
            registry,
        }
    }

    /// Open a proposal in the deposit period.
    ///
    /// If the initial deposit already meets the chain's minimum deposit the
    /// proposal goes straight to the voting period. Treasury spending
    /// proposals are opened through the treasury instead, which records the
    /// spending request alongside the proposal.
    pub fn create_proposal(&self, draft: ProposalDraft) -> Result<Proposal, GovernanceError> {
        if draft.proposal_type.spending().is_some() {
            return Err(GovernanceError::Validation(
                "treasury spending proposals must be submitted through the treasury".into(),
            ));
        }
        let proposal = with_retry("create_proposal", || {
            let config = self.registry.load(&draft.chain_id)?;
            let proposal = self.prepare(draft.clone(), &config.value)?;
            let mut batch = WriteBatch::new();
            self.admit(&mut batch, &proposal, &config)?;
            self.repo.commit(batch)?;
            Ok(proposal)
        })?;
        log_created(&proposal);
        Ok(proposal)
    }

    /// Validate a draft against `config` and build the proposal without storing it.
    pub(crate) fn prepare(
        &self,
        draft: ProposalDraft,
        config: &GovernanceConfig,
    ) -> Result<Proposal, GovernanceError> {
        if draft.title.trim().is_empty() {
            return Err(GovernanceError::Validation("title must not be empty".into()));
        }
        if draft.proposer.trim().is_empty() {
            return Err(GovernanceError::Validation(
                "proposer must not be empty".into(),
            ));
        }
        if draft.initial_deposit < config.min_initial_deposit {
            return Err(GovernanceError::InsufficientDeposit {
                have: draft.initial_deposit.raw(),
                need: config.min_initial_deposit.raw(),
            });
        }
        if draft.initial_deposit > config.max_deposit {
            return Err(GovernanceError::Validation(format!(
                "initial deposit {} exceeds max deposit {}",
                draft.initial_deposit, config.max_deposit
            )));
        }
        let now = self.clock.now();
        let proposal_id = derive_id(
            &self.repo,
            "proposal",
            draft.chain_id.as_str(),
            &draft.proposer,
            now.as_secs(),
        )?;
        let deposit_end_time = now.plus_secs(config.deposit_period_secs);
        let voting_end_time = deposit_end_time.plus_secs(config.voting_period_secs);

        let mut proposal = Proposal {
            proposal_id,
            chain_id: draft.chain_id,
            title: draft.title,
            description: draft.description,
            proposal_type: draft.proposal_type,
            proposer: draft.proposer,
            initial_deposit: draft.initial_deposit,
            total_deposit: draft.initial_deposit,
            status: ProposalStatus::DepositPeriod,
            failure_reason: None,
            submit_time: now,
            deposit_end_time,
            voting_start_time: deposit_end_time,
            voting_end_time,
            tally_results: TallyResults::default(),
            final_tally: None,
            metadata: draft.metadata,
        };
        if proposal.total_deposit >= config.min_deposit {
            proposal.transition(ProposalStatus::VotingPeriod)?;
        }
        Ok(proposal)
    }

    /// Stage the insert of `proposal` if its chain is below the pending limit.
    ///
    /// The batch also swaps the chain's config record at the version `config`
    /// was read at, so two creations on one chain cannot both count the same
    /// set of pending proposals: the second commit conflicts and recounts.
    pub(crate) fn admit(
        &self,
        batch: &mut WriteBatch,
        proposal: &Proposal,
        config: &Versioned<GovernanceConfig>,
    ) -> Result<(), GovernanceError> {
        let pending = self
            .list_proposals(&proposal.chain_id)?
            .iter()
            .filter(|p| !p.status.is_terminal())
            .count();
        if pending >= config.value.max_pending_proposals as usize {
            return Err(GovernanceError::Validation(format!(
                "chain {} already has {pending} pending proposals",
                proposal.chain_id
            )));
        }
        batch
            .swap(
                Table::Configs,
                proposal.chain_id.as_str(),
                config.version,
                encode(&config.value)?,
            )
            .insert(Table::Proposals, &proposal.proposal_id, encode(proposal)?);
        Ok(())
    }

    /// Add `amount` to a proposal's deposit.
    pub fn submit_deposit(
        &self,
        proposal_id: &str,
        depositor: &str,
        amount: Amount,
    ) -> Result<Proposal, GovernanceError> {
        with_retry("submit_deposit", || {
            let Versioned { version, value: mut proposal } = self.load(proposal_id)?;
            if proposal.status != ProposalStatus::DepositPeriod {
                return Err(GovernanceError::invalid_state(
                    format!("proposal {proposal_id}"),
                    proposal.status,
                    "accept deposits",
                ));
            }
            if self.clock.now() > proposal.deposit_end_time {
                return Err(GovernanceError::PeriodExpired("deposit"));
            }
            if amount.is_zero() {
                return Err(GovernanceError::Validation(
                    "deposit amount must be positive".into(),
                ));
            }

            let config = self.registry.get(&proposal.chain_id)?;
            let total = proposal
                .total_deposit
                .checked_add(amount)
                .ok_or(AgoraError::Overflow("total deposit"))?;
            if total > config.max_deposit {
                return Err(GovernanceError::Validation(format!(
                    "total deposit {total} would exceed max deposit {}",
                    config.max_deposit
                )));
            }
            proposal.total_deposit = total;
            if total >= config.min_deposit {
                proposal.transition(ProposalStatus::VotingPeriod)?;
            }

            let mut batch = WriteBatch::new();
            batch.swap(Table::Proposals, proposal_id, version, encode(&proposal)?);
            self.repo.commit(batch)?;

            info!(
                proposal_id,
                depositor,
                amount = %amount,
                total = %proposal.total_deposit,
                status = %proposal.status,
                "deposit accepted"
            );
            Ok(proposal)
        })
    }

    /// Fail a proposal whose deposit period ended below the minimum deposit.
    ///
    /// Returns `None` when the proposal is not (or no longer) in that situation.
    pub fn expire_deposit(&self, proposal_id: &str) -> Result<Option<TallyResult>, GovernanceError> {
        with_retry("expire_deposit", || {
            let current = self.load(proposal_id)?;
            let now = self.clock.now();
            if current.value.status != ProposalStatus::DepositPeriod
                || now <= current.value.deposit_end_time
            {
                debug!(proposal_id, status = %current.value.status, "deposit not expired");
                return Ok(None);
            }
            let result = finalize(
                &self.repo,
                current,
                ProposalStatus::Failed,
                Some(FailureReason::DepositTimeout),
                Amount::ZERO,
                now,
            )?;
            Ok(Some(result))
        })
    }

    pub fn get_proposal(&self, proposal_id: &str) -> Result<Proposal, GovernanceError> {
        self.load(proposal_id).map(|v| v.value)
    }

    /// All proposals of a chain, oldest first.
    pub fn list_proposals(&self, chain_id: &ChainId) -> Result<Vec<Proposal>, GovernanceError> {
        let mut proposals: Vec<Proposal> = self
            .repo
            .scan::<Proposal>(Table::Proposals, &format!("proposal_{chain_id}_"))?
            .into_iter()
            .map(|v| v.value)
            .filter(|p| &p.chain_id == chain_id)
            .collect();
        proposals.sort_by(|a, b| {
            a.submit_time
                .cmp(&b.submit_time)
                .then_with(|| a.proposal_id.cmp(&b.proposal_id))
        });
        Ok(proposals)
    }

    pub(crate) fn load(&self, proposal_id: &str) -> Result<Versioned<Proposal>, GovernanceError> {
        self.repo
            .load(Table::Proposals, proposal_id)?
            .ok_or_else(|| GovernanceError::ProposalNotFound(proposal_id.to_string()))
    }
}

pub(crate) fn log_created(proposal: &Proposal) {
    info!(
        proposal_id = %proposal.proposal_id,
        chain_id = %proposal.chain_id,
        kind = proposal.proposal_type.kind(),
        deposit = %proposal.total_deposit,
        status = %proposal.status,
        "proposal created"
    );
}

/// Move a proposal to a terminal status and record its result.
///
/// The proposal and, for treasury spending, its spending record are written
/// in one batch against the versions they were read at.
pub(crate) fn finalize(
    repo: &Repo,
    current: Versioned<Proposal>,
    status: ProposalStatus,
    failure_reason: Option<FailureReason>,
    bonded_power: Amount,
    now: Timestamp,
) -> Result<TallyResult, GovernanceError> {
    let Versioned { version, value: mut proposal } = current;
    proposal.transition(status)?;

    let tally = proposal.tally_results;
    let total = tally.total().ok_or(AgoraError::Overflow("tally total"))?;
    let result = TallyResult {
        proposal_id: proposal.proposal_id.clone(),
        status,
        passed: status == ProposalStatus::Passed,
        failure_reason,
        tally,
        total,
        bonded_power,
        yes_percentage: tally.yes.percent_of(total),
        veto_percentage: tally.no_with_veto.percent_of(total),
        turnout_percentage: total.percent_of(bonded_power),
        tallied_at: now,
    };
    proposal.failure_reason = failure_reason;
    proposal.final_tally = Some(result.clone());

    let mut batch = WriteBatch::new();
    batch.swap(
        Table::Proposals,
        &proposal.proposal_id,
        version,
        encode(&proposal)?,
    );
    if proposal.is_treasury_spending() {
        settle_spending(repo, &mut batch, &proposal, now)?;
    }
    repo.commit(batch)?;

    info!(
        proposal_id = %proposal.proposal_id,
        chain_id = %proposal.chain_id,
        status = %status,
        reason = ?failure_reason,
        yes = %tally.yes,
        no = %tally.no,
        veto = %tally.no_with_veto,
        abstain = %tally.abstain,
        "proposal finalized"
    );
    Ok(result)
}
