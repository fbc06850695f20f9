//! Read-only aggregation and export of one chain's governance data.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use agora_types::{Amount, ChainId, Clock, Timestamp, SECS_PER_DAY};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::lifecycle::ProposalLifecycle;
use crate::params::GovernanceConfig;
use crate::programs::{
    Airdrop, AirdropStatus, OnboardingStatus, ProgramTracker, ValidatorOnboarding,
};
use crate::proposal::{Proposal, ProposalStatus};
use crate::registry::ConfigRegistry;
use crate::tally::TallyEngine;
use crate::treasury::{SpendingStatus, TreasuryAccount, TreasuryManager, TreasurySpending};
use crate::vote::Vote;
use crate::GovernanceError;

/// How far back "recent" and "active" reach.
pub const RECENT_WINDOW_SECS: u64 = 30 * SECS_PER_DAY;
/// Cap on the recent-proposals list.
pub const RECENT_LIMIT: usize = 10;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProposalSummary {
    pub proposal_id: String,
    pub title: String,
    pub kind: String,
    pub status: ProposalStatus,
    pub submit_time: Timestamp,
    pub total_deposit: Amount,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GovernanceDashboard {
    pub chain_id: ChainId,
    pub generated_at: Timestamp,
    pub total_proposals: u64,
    pub passed_proposals: u64,
    pub rejected_proposals: u64,
    pub failed_proposals: u64,
    pub pending_proposals: u64,
    /// Passed over all terminal proposals, in percent; 0 before anything finished.
    pub pass_rate: f64,
    pub proposal_types: BTreeMap<String, u64>,
    pub treasury_accounts: u64,
    pub total_treasury_balance: Amount,
    pub active_treasury_accounts: u64,
    pub executed_spending_total: Amount,
    pub total_airdrops: u64,
    pub active_airdrops: u64,
    pub validator_applications: u64,
    pub pending_validator_applications: u64,
    pub recent_proposals: Vec<ProposalSummary>,
}

/// Every record belonging to one chain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChainExport {
    pub chain_id: ChainId,
    pub exported_at: Timestamp,
    pub config: Option<GovernanceConfig>,
    pub proposals: Vec<Proposal>,
    pub votes: Vec<Vote>,
    pub treasury_accounts: Vec<TreasuryAccount>,
    pub treasury_spendings: Vec<TreasurySpending>,
    pub airdrops: Vec<Airdrop>,
    pub validator_onboardings: Vec<ValidatorOnboarding>,
}

#[derive(Clone)]
pub struct Reporter {
    clock: Arc<dyn Clock>,
    registry: ConfigRegistry,
    lifecycle: ProposalLifecycle,
    tally: TallyEngine,
    treasury: TreasuryManager,
    programs: ProgramTracker,
}

impl Reporter {
    pub fn new(
        clock: Arc<dyn Clock>,
        registry: ConfigRegistry,
        lifecycle: ProposalLifecycle,
        tally: TallyEngine,
        treasury: TreasuryManager,
        programs: ProgramTracker,
    ) -> Self {
        Self {
            clock,
            registry,
            lifecycle,
            tally,
            treasury,
            programs,
        }
    }

    pub fn dashboard(&self, chain_id: &ChainId) -> Result<GovernanceDashboard, GovernanceError> {
        let now = self.clock.now();
        let cutoff = Timestamp::new(now.as_secs().saturating_sub(RECENT_WINDOW_SECS));

        let proposals = self.lifecycle.list_proposals(chain_id)?;
        let count = |status: ProposalStatus| {
            proposals.iter().filter(|p| p.status == status).count() as u64
        };
        let passed = count(ProposalStatus::Passed);
        let rejected = count(ProposalStatus::Rejected);
        let failed = count(ProposalStatus::Failed);
        let finished = passed + rejected + failed;
        let pass_rate = if finished == 0 {
            0.0
        } else {
            passed as f64 / finished as f64 * 100.0
        };

        let mut proposal_types = BTreeMap::new();
        for proposal in &proposals {
            *proposal_types
                .entry(proposal.proposal_type.kind().to_string())
                .or_insert(0) += 1;
        }

        let mut recent: Vec<&Proposal> = proposals
            .iter()
            .filter(|p| p.submit_time >= cutoff)
            .collect();
        recent.sort_by(|a, b| b.submit_time.cmp(&a.submit_time));
        let recent_proposals = recent
            .into_iter()
            .take(RECENT_LIMIT)
            .map(|p| ProposalSummary {
                proposal_id: p.proposal_id.clone(),
                title: p.title.clone(),
                kind: p.proposal_type.kind().to_string(),
                status: p.status,
                submit_time: p.submit_time,
                total_deposit: p.total_deposit,
            })
            .collect();

        let accounts = self.treasury.list_accounts(chain_id)?;
        let spendings = self.treasury.list_spendings(chain_id)?;
        let airdrops = self.programs.list_airdrops(chain_id)?;
        let applications = self.programs.list_applications(chain_id)?;

        Ok(GovernanceDashboard {
            chain_id: chain_id.clone(),
            generated_at: now,
            total_proposals: proposals.len() as u64,
            passed_proposals: passed,
            rejected_proposals: rejected,
            failed_proposals: failed,
            pending_proposals: proposals.len() as u64 - finished,
            pass_rate,
            proposal_types,
            treasury_accounts: accounts.len() as u64,
            total_treasury_balance: accounts
                .iter()
                .fold(Amount::ZERO, |acc, a| acc.saturating_add(a.balance)),
            active_treasury_accounts: accounts
                .iter()
                .filter(|a| a.last_activity >= cutoff)
                .count() as u64,
            executed_spending_total: spendings
                .iter()
                .filter(|s| s.status == SpendingStatus::Executed)
                .fold(Amount::ZERO, |acc, s| acc.saturating_add(s.amount)),
            total_airdrops: airdrops.len() as u64,
            active_airdrops: airdrops
                .iter()
                .filter(|a| a.status == AirdropStatus::Active)
                .count() as u64,
            validator_applications: applications.len() as u64,
            pending_validator_applications: applications
                .iter()
                .filter(|o| o.status == OnboardingStatus::Pending)
                .count() as u64,
            recent_proposals,
        })
    }

    pub fn export(&self, chain_id: &ChainId) -> Result<ChainExport, GovernanceError> {
        let config = match self.registry.get(chain_id) {
            Ok(config) => Some(config),
            Err(GovernanceError::ConfigNotFound(_)) => None,
            Err(e) => return Err(e),
        };
        let proposals = self.lifecycle.list_proposals(chain_id)?;
        let mut votes = Vec::new();
        for proposal in &proposals {
            votes.extend(self.tally.votes(&proposal.proposal_id)?);
        }
        Ok(ChainExport {
            chain_id: chain_id.clone(),
            exported_at: self.clock.now(),
            config,
            proposals,
            votes,
            treasury_accounts: self.treasury.list_accounts(chain_id)?,
            treasury_spendings: self.treasury.list_spendings(chain_id)?,
            airdrops: self.programs.list_airdrops(chain_id)?,
            validator_onboardings: self.programs.list_applications(chain_id)?,
        })
    }

    /// Write [`Reporter::export`] to `path` as pretty-printed JSON.
    pub fn export_to_path(&self, chain_id: &ChainId, path: &Path) -> Result<ChainExport, GovernanceError> {
        let export = self.export(chain_id)?;
        let json = serde_json::to_string_pretty(&export)?;
        std::fs::write(path, json)?;
        info!(
            chain_id = %chain_id,
            path = %path.display(),
            proposals = export.proposals.len(),
            votes = export.votes.len(),
            "chain data exported"
        );
        Ok(export)
    }
}
