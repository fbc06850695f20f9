//! The governance engine: one entry point over every component.

use std::path::Path;
use std::sync::Arc;

use agora_store::GovernanceStore;
use agora_types::{Amount, BondedPower, ChainDenom, ChainId, Clock};

use crate::dashboard::{ChainExport, GovernanceDashboard, Reporter};
use crate::lifecycle::{ProposalDraft, ProposalLifecycle};
use crate::params::{GovernanceConfig, GovernanceParams};
use crate::programs::{Airdrop, AirdropDraft, ApplicationDraft, ProgramTracker, ValidatorOnboarding};
use crate::proposal::{Proposal, SpendingRequest, TallyResult};
use crate::registry::ConfigRegistry;
use crate::repo::Repo;
use crate::sweep::{SweepReport, Sweeper};
use crate::tally::TallyEngine;
use crate::treasury::{AccountType, TreasuryAccount, TreasuryManager, TreasurySpending};
use crate::vote::{Vote, VoteOption};
use crate::GovernanceError;

/// Wires the components around one store, clock, staking ledger and chain registry.
///
/// Cloning is cheap; clones share the same store.
#[derive(Clone)]
pub struct GovernanceEngine {
    registry: ConfigRegistry,
    lifecycle: ProposalLifecycle,
    tally: TallyEngine,
    treasury: TreasuryManager,
    programs: ProgramTracker,
    sweeper: Sweeper,
    reporter: Reporter,
}

impl GovernanceEngine {
    pub fn new(
        store: Arc<dyn GovernanceStore>,
        clock: Arc<dyn Clock>,
        bonded_power: Arc<dyn BondedPower>,
        denom: Arc<dyn ChainDenom>,
    ) -> Self {
        let repo = Repo::new(store);
        let registry = ConfigRegistry::new(repo.clone(), clock.clone());
        let lifecycle = ProposalLifecycle::new(repo.clone(), clock.clone(), registry.clone());
        let tally = TallyEngine::new(
            repo.clone(),
            clock.clone(),
            bonded_power,
            registry.clone(),
            lifecycle.clone(),
        );
        let treasury = TreasuryManager::new(
            repo.clone(),
            clock.clone(),
            registry.clone(),
            lifecycle.clone(),
            denom,
        );
        let programs = ProgramTracker::new(repo.clone(), clock.clone());
        let sweeper = Sweeper::new(
            repo,
            clock.clone(),
            lifecycle.clone(),
            tally.clone(),
            treasury.clone(),
        );
        let reporter = Reporter::new(
            clock,
            registry.clone(),
            lifecycle.clone(),
            tally.clone(),
            treasury.clone(),
            programs.clone(),
        );
        Self {
            registry,
            lifecycle,
            tally,
            treasury,
            programs,
            sweeper,
            reporter,
        }
    }

    // Configuration

    pub fn setup_governance(
        &self,
        chain_id: &ChainId,
        params: &GovernanceParams,
    ) -> Result<GovernanceConfig, GovernanceError> {
        self.registry.setup(chain_id, params)
    }

    pub fn config(&self, chain_id: &ChainId) -> Result<GovernanceConfig, GovernanceError> {
        self.registry.get(chain_id)
    }

    pub fn configs(&self) -> Result<Vec<GovernanceConfig>, GovernanceError> {
        self.registry.list()
    }

    // Proposals

    pub fn create_proposal(&self, draft: ProposalDraft) -> Result<Proposal, GovernanceError> {
        self.lifecycle.create_proposal(draft)
    }

    pub fn submit_deposit(
        &self,
        proposal_id: &str,
        depositor: &str,
        amount: Amount,
    ) -> Result<Proposal, GovernanceError> {
        self.lifecycle.submit_deposit(proposal_id, depositor, amount)
    }

    pub fn proposal(&self, proposal_id: &str) -> Result<Proposal, GovernanceError> {
        self.lifecycle.get_proposal(proposal_id)
    }

    pub fn proposals(&self, chain_id: &ChainId) -> Result<Vec<Proposal>, GovernanceError> {
        self.lifecycle.list_proposals(chain_id)
    }

    // Voting

    pub fn cast_vote(
        &self,
        proposal_id: &str,
        voter: &str,
        option: VoteOption,
        voting_power: Amount,
    ) -> Result<Vote, GovernanceError> {
        self.tally.cast_vote(proposal_id, voter, option, voting_power)
    }

    pub fn tally_votes(&self, proposal_id: &str) -> Result<TallyResult, GovernanceError> {
        self.tally.tally_votes(proposal_id)
    }

    pub fn votes(&self, proposal_id: &str) -> Result<Vec<Vote>, GovernanceError> {
        self.tally.votes(proposal_id)
    }

    // Treasury

    pub fn create_treasury_account(
        &self,
        chain_id: &ChainId,
        account_name: &str,
        account_type: AccountType,
        initial_balance: Amount,
        authorized_spenders: Vec<String>,
    ) -> Result<TreasuryAccount, GovernanceError> {
        self.treasury.create_account(
            chain_id,
            account_name,
            account_type,
            initial_balance,
            authorized_spenders,
        )
    }

    pub fn top_up(&self, account_id: &str, amount: Amount) -> Result<TreasuryAccount, GovernanceError> {
        self.treasury.top_up(account_id, amount)
    }

    pub fn submit_spending_proposal(
        &self,
        chain_id: &ChainId,
        proposer: &str,
        request: SpendingRequest,
    ) -> Result<Proposal, GovernanceError> {
        self.treasury.submit_spending_proposal(chain_id, proposer, request)
    }

    pub fn execute_approved_spending(&self, proposal_id: &str) -> Result<bool, GovernanceError> {
        self.treasury.execute_approved_spending(proposal_id)
    }

    pub fn treasury_account(&self, account_id: &str) -> Result<TreasuryAccount, GovernanceError> {
        self.treasury.get_account(account_id)
    }

    pub fn treasury_accounts(&self, chain_id: &ChainId) -> Result<Vec<TreasuryAccount>, GovernanceError> {
        self.treasury.list_accounts(chain_id)
    }

    pub fn spending(&self, proposal_id: &str) -> Result<Option<TreasurySpending>, GovernanceError> {
        self.treasury.get_spending(proposal_id)
    }

    pub fn spendings(&self, chain_id: &ChainId) -> Result<Vec<TreasurySpending>, GovernanceError> {
        self.treasury.list_spendings(chain_id)
    }

    // Community programs

    pub fn create_airdrop(&self, draft: AirdropDraft) -> Result<Airdrop, GovernanceError> {
        self.programs.create_airdrop(draft)
    }

    pub fn start_airdrop(&self, airdrop_id: &str) -> Result<Airdrop, GovernanceError> {
        self.programs.start_airdrop(airdrop_id)
    }

    pub fn complete_airdrop(&self, airdrop_id: &str) -> Result<Airdrop, GovernanceError> {
        self.programs.complete_airdrop(airdrop_id)
    }

    pub fn cancel_airdrop(&self, airdrop_id: &str) -> Result<Airdrop, GovernanceError> {
        self.programs.cancel_airdrop(airdrop_id)
    }

    pub fn airdrops(&self, chain_id: &ChainId) -> Result<Vec<Airdrop>, GovernanceError> {
        self.programs.list_airdrops(chain_id)
    }

    pub fn submit_validator_application(
        &self,
        draft: ApplicationDraft,
    ) -> Result<ValidatorOnboarding, GovernanceError> {
        self.programs.submit_application(draft)
    }

    pub fn approve_validator_application(
        &self,
        onboarding_id: &str,
    ) -> Result<ValidatorOnboarding, GovernanceError> {
        self.programs.approve_application(onboarding_id)
    }

    pub fn reject_validator_application(
        &self,
        onboarding_id: &str,
    ) -> Result<ValidatorOnboarding, GovernanceError> {
        self.programs.reject_application(onboarding_id)
    }

    pub fn validator_applications(
        &self,
        chain_id: &ChainId,
    ) -> Result<Vec<ValidatorOnboarding>, GovernanceError> {
        self.programs.list_applications(chain_id)
    }

    // Maintenance and reporting

    pub fn sweep(&self) -> Result<SweepReport, GovernanceError> {
        self.sweeper.run_once()
    }

    pub fn dashboard(&self, chain_id: &ChainId) -> Result<GovernanceDashboard, GovernanceError> {
        self.reporter.dashboard(chain_id)
    }

    pub fn export(&self, chain_id: &ChainId) -> Result<ChainExport, GovernanceError> {
        self.reporter.export(chain_id)
    }

    pub fn export_to_path(&self, chain_id: &ChainId, path: &Path) -> Result<ChainExport, GovernanceError> {
        self.reporter.export_to_path(chain_id, path)
    }

    pub fn registry(&self) -> &ConfigRegistry {
        &self.registry
    }

    pub fn lifecycle(&self) -> &ProposalLifecycle {
        &self.lifecycle
    }

    pub fn tally(&self) -> &TallyEngine {
        &self.tally
    }

    pub fn treasury(&self) -> &TreasuryManager {
        &self.treasury
    }

    pub fn programs(&self) -> &ProgramTracker {
        &self.programs
    }

    pub fn sweeper(&self) -> &Sweeper {
        &self.sweeper
    }
}
