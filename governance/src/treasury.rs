//! Treasury accounts and governance-gated spending.
//!
//! A spending proposal carries its request inline and gets a companion
//! [`TreasurySpending`] record keyed by the proposal id. The record follows
//! the proposal's outcome (`Pending -> Approved | Rejected`) and becomes
//! `Executed` in the same batch that debits the account, so the debit can
//! only ever happen once: a second execution sees `Executed` and stops.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use agora_store::{Table, WriteBatch};
use agora_types::{Amount, ChainDenom, ChainId, Clock, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::lifecycle::{log_created, ProposalDraft, ProposalLifecycle};
use crate::proposal::{Proposal, ProposalStatus, ProposalType, SpendingRequest};
use crate::registry::ConfigRegistry;
use crate::repo::{derive_id, encode, with_retry, Repo, Versioned};
use crate::GovernanceError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountType {
    Foundation,
    CommunityPool,
    EcosystemFund,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreasuryAccount {
    pub account_id: String,
    pub chain_id: ChainId,
    pub account_name: String,
    pub account_type: AccountType,
    pub balance: Amount,
    pub frozen_balance: Amount,
    pub authorized_spenders: Vec<String>,
    pub spending_limits: BTreeMap<String, Amount>,
    pub created_at: Timestamp,
    pub last_activity: Timestamp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpendingStatus {
    Pending,
    Approved,
    Rejected,
    Executed,
}

impl fmt::Display for SpendingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Executed => "executed",
        })
    }
}

/// Bookkeeping for one treasury spending proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreasurySpending {
    pub spending_id: String,
    pub chain_id: ChainId,
    pub account_id: String,
    pub recipient: String,
    pub amount: Amount,
    pub purpose: String,
    pub proposal_id: String,
    pub status: SpendingStatus,
    pub requested_at: Timestamp,
    pub approved_at: Option<Timestamp>,
    pub executed_at: Option<Timestamp>,
}

/// Move a pending spending record to match its finalized proposal.
///
/// Adds a swap to `batch`; records that already left `Pending` are untouched.
pub(crate) fn settle_spending(
    repo: &Repo,
    batch: &mut WriteBatch,
    proposal: &Proposal,
    now: Timestamp,
) -> Result<(), GovernanceError> {
    let Some(Versioned { version, value: mut spending }) =
        repo.load::<TreasurySpending>(Table::Spendings, &proposal.proposal_id)?
    else {
        warn!(proposal_id = %proposal.proposal_id, "spending proposal has no spending record");
        return Ok(());
    };
    if spending.status != SpendingStatus::Pending {
        return Ok(());
    }
    if proposal.status == ProposalStatus::Passed {
        spending.status = SpendingStatus::Approved;
        spending.approved_at = Some(now);
    } else {
        spending.status = SpendingStatus::Rejected;
    }
    batch.swap(
        Table::Spendings,
        &proposal.proposal_id,
        version,
        encode(&spending)?,
    );
    Ok(())
}

#[derive(Clone)]
pub struct TreasuryManager {
    repo: Repo,
    clock: Arc<dyn Clock>,
    registry: ConfigRegistry,
    lifecycle: ProposalLifecycle,
    denom: Arc<dyn ChainDenom>,
}

impl TreasuryManager {
    pub fn new(
        repo: Repo,
        clock: Arc<dyn Clock>,
        registry: ConfigRegistry,
        lifecycle: ProposalLifecycle,
        denom: Arc<dyn ChainDenom>,
    ) -> Self {
        Self {
            repo,
            clock,
            registry,
            lifecycle,
            denom,
        }
    }

    /// The chain's denomination, or `None` when the registry can't tell.
    fn denom_of(&self, chain_id: &ChainId) -> Option<String> {
        match self.denom.denom(chain_id) {
            Ok(denom) => Some(denom),
            Err(e) => {
                warn!(chain_id = %chain_id, error = %e, "no denomination, describing raw units");
                None
            }
        }
    }

    pub fn create_account(
        &self,
        chain_id: &ChainId,
        account_name: &str,
        account_type: AccountType,
        initial_balance: Amount,
        authorized_spenders: Vec<String>,
    ) -> Result<TreasuryAccount, GovernanceError> {
        if !chain_id.is_valid() {
            return Err(GovernanceError::Validation(format!(
                "invalid chain id '{chain_id}'"
            )));
        }
        if account_name.trim().is_empty() {
            return Err(GovernanceError::Validation(
                "account name must not be empty".into(),
            ));
        }
        let now = self.clock.now();
        let account = TreasuryAccount {
            account_id: derive_id(
                &self.repo,
                "treasury",
                chain_id.as_str(),
                account_name,
                now.as_secs(),
            )?,
            chain_id: chain_id.clone(),
            account_name: account_name.to_string(),
            account_type,
            balance: initial_balance,
            frozen_balance: Amount::ZERO,
            authorized_spenders,
            spending_limits: BTreeMap::new(),
            created_at: now,
            last_activity: now,
        };

        let mut batch = WriteBatch::new();
        batch.insert(Table::TreasuryAccounts, &account.account_id, encode(&account)?);
        self.repo.commit(batch)?;

        info!(
            account_id = %account.account_id,
            chain_id = %chain_id,
            account_type = ?account_type,
            balance = %initial_balance,
            "treasury account created"
        );
        Ok(account)
    }

    /// Credit an account.
    pub fn top_up(&self, account_id: &str, amount: Amount) -> Result<TreasuryAccount, GovernanceError> {
        if amount.is_zero() {
            return Err(GovernanceError::Validation(
                "top-up amount must be positive".into(),
            ));
        }
        with_retry("top_up", || {
            let Versioned { version, value: mut account } = self.load_account(account_id)?;
            account.balance = account
                .balance
                .checked_add(amount)
                .ok_or(agora_types::AgoraError::Overflow("treasury balance"))?;
            account.last_activity = self.clock.now();

            let mut batch = WriteBatch::new();
            batch.swap(Table::TreasuryAccounts, account_id, version, encode(&account)?);
            self.repo.commit(batch)?;

            info!(account_id, amount = %amount, balance = %account.balance, "treasury topped up");
            Ok(account)
        })
    }

    /// Open a treasury spending proposal together with its pending spending record.
    pub fn submit_spending_proposal(
        &self,
        chain_id: &ChainId,
        proposer: &str,
        request: SpendingRequest,
    ) -> Result<Proposal, GovernanceError> {
        if request.amount.is_zero() {
            return Err(GovernanceError::Validation(
                "spending amount must be positive".into(),
            ));
        }
        if request.recipient.trim().is_empty() {
            return Err(GovernanceError::Validation(
                "recipient must not be empty".into(),
            ));
        }
        let account = self.load_account(&request.account_id)?.value;
        if &account.chain_id != chain_id {
            return Err(GovernanceError::Validation(format!(
                "account {} belongs to chain {}, not {chain_id}",
                account.account_id, account.chain_id
            )));
        }
        if request.amount > account.balance {
            return Err(GovernanceError::InsufficientTreasuryBalance {
                have: account.balance.raw(),
                need: request.amount.raw(),
            });
        }
        let denom = self.denom_of(chain_id);

        let mut metadata = BTreeMap::new();
        metadata.insert("account_id".to_string(), request.account_id.clone());
        metadata.insert("recipient".to_string(), request.recipient.clone());
        metadata.insert("amount".to_string(), request.amount.to_string());
        metadata.insert("purpose".to_string(), request.purpose.clone());
        if let Some(denom) = &denom {
            metadata.insert("denom".to_string(), denom.clone());
        }
        let amount_text = match &denom {
            Some(denom) => format!("{} {denom}", request.amount),
            None => request.amount.to_string(),
        };
        let draft = ProposalDraft {
            chain_id: chain_id.clone(),
            title: format!("Treasury spending: {}", request.purpose),
            description: format!(
                "Spend {amount_text} from treasury account {} to {} for {}",
                account.account_name, request.recipient, request.purpose
            ),
            proposal_type: ProposalType::TreasurySpending(request.clone()),
            proposer: proposer.to_string(),
            initial_deposit: Amount::ZERO,
            metadata,
        };

        let (proposal, spending) = with_retry("submit_spending_proposal", || {
            let config = self.registry.load(chain_id)?;
            let mut draft = draft.clone();
            draft.initial_deposit = config.value.spending_deposit();
            let proposal = self.lifecycle.prepare(draft, &config.value)?;

            let spending = TreasurySpending {
                spending_id: proposal.proposal_id.replacen("proposal_", "spending_", 1),
                chain_id: chain_id.clone(),
                account_id: request.account_id.clone(),
                recipient: request.recipient.clone(),
                amount: request.amount,
                purpose: request.purpose.clone(),
                proposal_id: proposal.proposal_id.clone(),
                status: SpendingStatus::Pending,
                requested_at: proposal.submit_time,
                approved_at: None,
                executed_at: None,
            };

            let mut batch = WriteBatch::new();
            self.lifecycle.admit(&mut batch, &proposal, &config)?;
            batch.insert(Table::Spendings, &proposal.proposal_id, encode(&spending)?);
            self.repo.commit(batch)?;
            Ok((proposal, spending))
        })?;

        log_created(&proposal);
        info!(
            proposal_id = %proposal.proposal_id,
            account_id = %spending.account_id,
            recipient = %spending.recipient,
            amount = %spending.amount,
            "spending requested"
        );
        Ok(proposal)
    }

    /// Pay out a passed spending proposal.
    ///
    /// Returns `Ok(false)` without touching anything when the proposal is not
    /// eligible: not passed, not a spending proposal, already executed, or
    /// the account cannot cover the amount right now.
    pub fn execute_approved_spending(&self, proposal_id: &str) -> Result<bool, GovernanceError> {
        with_retry("execute_approved_spending", || {
            let proposal: Proposal = self
                .repo
                .load(Table::Proposals, proposal_id)?
                .map(|v: Versioned<Proposal>| v.value)
                .ok_or_else(|| GovernanceError::ProposalNotFound(proposal_id.to_string()))?;
            if proposal.status != ProposalStatus::Passed {
                debug!(proposal_id, status = %proposal.status, "spending not executable");
                return Ok(false);
            }
            let Some(request) = proposal.proposal_type.spending() else {
                debug!(proposal_id, "not a spending proposal");
                return Ok(false);
            };
            let Some(Versioned { version: spending_version, value: mut spending }) =
                self.repo.load::<TreasurySpending>(Table::Spendings, proposal_id)?
            else {
                warn!(proposal_id, "passed spending proposal has no spending record");
                return Ok(false);
            };
            if spending.status != SpendingStatus::Approved {
                debug!(proposal_id, status = %spending.status, "spending not executable");
                return Ok(false);
            }
            let Some(Versioned { version: account_version, value: mut account }) = self
                .repo
                .load::<TreasuryAccount>(Table::TreasuryAccounts, &request.account_id)?
            else {
                warn!(proposal_id, account_id = %request.account_id, "treasury account missing");
                return Ok(false);
            };
            let Some(balance) = account.balance.checked_sub(request.amount) else {
                warn!(
                    proposal_id,
                    balance = %account.balance,
                    amount = %request.amount,
                    "treasury balance too low, spending deferred"
                );
                return Ok(false);
            };

            let now = self.clock.now();
            account.balance = balance;
            account.last_activity = now;
            spending.status = SpendingStatus::Executed;
            spending.executed_at = Some(now);

            let mut batch = WriteBatch::new();
            batch
                .swap(
                    Table::TreasuryAccounts,
                    &account.account_id,
                    account_version,
                    encode(&account)?,
                )
                .swap(Table::Spendings, proposal_id, spending_version, encode(&spending)?);
            self.repo.commit(batch)?;

            info!(
                proposal_id,
                account_id = %account.account_id,
                recipient = %spending.recipient,
                amount = %spending.amount,
                balance = %account.balance,
                "treasury spending executed"
            );
            Ok(true)
        })
    }

    pub fn get_account(&self, account_id: &str) -> Result<TreasuryAccount, GovernanceError> {
        self.load_account(account_id).map(|v| v.value)
    }

    pub fn list_accounts(&self, chain_id: &ChainId) -> Result<Vec<TreasuryAccount>, GovernanceError> {
        Ok(self
            .repo
            .scan::<TreasuryAccount>(Table::TreasuryAccounts, &format!("treasury_{chain_id}_"))?
            .into_iter()
            .map(|v| v.value)
            .filter(|a| &a.chain_id == chain_id)
            .collect())
    }

    pub fn get_spending(&self, proposal_id: &str) -> Result<Option<TreasurySpending>, GovernanceError> {
        Ok(self
            .repo
            .load::<TreasurySpending>(Table::Spendings, proposal_id)?
            .map(|v| v.value))
    }

    pub fn list_spendings(&self, chain_id: &ChainId) -> Result<Vec<TreasurySpending>, GovernanceError> {
        Ok(self
            .repo
            .scan::<TreasurySpending>(Table::Spendings, &format!("proposal_{chain_id}_"))?
            .into_iter()
            .map(|v| v.value)
            .filter(|s| &s.chain_id == chain_id)
            .collect())
    }

    fn load_account(&self, account_id: &str) -> Result<Versioned<TreasuryAccount>, GovernanceError> {
        self.repo
            .load(Table::TreasuryAccounts, account_id)?
            .ok_or_else(|| GovernanceError::AccountNotFound(account_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::GovernanceParams;
    use agora_nullables::{NullChainDenom, NullClock, NullStore};

    struct Fixture {
        repo: Repo,
        lifecycle: ProposalLifecycle,
        treasury: TreasuryManager,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(NullClock::new(1_000_000));
        let repo = Repo::new(Arc::new(NullStore::new()));
        let registry = ConfigRegistry::new(repo.clone(), clock.clone());
        registry
            .setup(
                &ChainId::new("testnet-1"),
                &GovernanceParams {
                    min_initial_deposit: Amount::new(100),
                    min_deposit: Amount::new(100),
                    ..Default::default()
                },
            )
            .unwrap();
        let lifecycle = ProposalLifecycle::new(repo.clone(), clock.clone(), registry.clone());
        let treasury = TreasuryManager::new(
            repo.clone(),
            clock,
            registry,
            lifecycle.clone(),
            Arc::new(NullChainDenom::with_chain("testnet-1", "utest")),
        );
        Fixture {
            repo,
            lifecycle,
            treasury,
        }
    }

    fn chain() -> ChainId {
        ChainId::new("testnet-1")
    }

    fn request(account_id: &str, amount: u128) -> SpendingRequest {
        SpendingRequest {
            account_id: account_id.to_string(),
            recipient: "cosmos1grantee".into(),
            amount: Amount::new(amount),
            purpose: "audit".into(),
        }
    }

    /// Force a proposal to Passed the way a tally would, settling its spending record.
    fn pass(f: &Fixture, proposal_id: &str) {
        let current = f.lifecycle.load(proposal_id).unwrap();
        crate::lifecycle::finalize(
            &f.repo,
            current,
            ProposalStatus::Passed,
            None,
            Amount::ZERO,
            Timestamp::new(1_000_001),
        )
        .unwrap();
    }

    #[test]
    fn create_and_top_up() {
        let f = fixture();
        let account = f
            .treasury
            .create_account(&chain(), "Community Pool", AccountType::CommunityPool, Amount::new(10), vec![])
            .unwrap();
        assert!(account.account_id.starts_with("treasury_testnet-1_"));
        let topped = f.treasury.top_up(&account.account_id, Amount::new(5)).unwrap();
        assert_eq!(topped.balance, Amount::new(15));
        assert_eq!(f.treasury.list_accounts(&chain()).unwrap().len(), 1);
        assert!(matches!(
            f.treasury.top_up("treasury_missing", Amount::new(1)),
            Err(GovernanceError::AccountNotFound(_))
        ));
    }

    #[test]
    fn spending_request_checks_balance() {
        let f = fixture();
        let account = f
            .treasury
            .create_account(&chain(), "Foundation", AccountType::Foundation, Amount::new(1_000), vec![])
            .unwrap();
        let err = f
            .treasury
            .submit_spending_proposal(&chain(), "alice", request(&account.account_id, 1_001))
            .unwrap_err();
        assert!(matches!(err, GovernanceError::InsufficientTreasuryBalance { .. }));
        assert!(err.is_retryable());

        assert!(matches!(
            f.treasury
                .submit_spending_proposal(&chain(), "alice", request("treasury_nope", 1)),
            Err(GovernanceError::AccountNotFound(_))
        ));
        assert!(matches!(
            f.treasury
                .submit_spending_proposal(&chain(), "alice", request(&account.account_id, 0)),
            Err(GovernanceError::Validation(_))
        ));
    }

    #[test]
    fn spending_proposal_records_pending_request() {
        let f = fixture();
        let account = f
            .treasury
            .create_account(&chain(), "Foundation", AccountType::Foundation, Amount::new(1_000), vec![])
            .unwrap();
        let proposal = f
            .treasury
            .submit_spending_proposal(&chain(), "alice", request(&account.account_id, 300))
            .unwrap();
        assert_eq!(proposal.initial_deposit, Amount::new(100));
        assert_eq!(proposal.proposal_type.kind(), "treasury_spending");

        let spending = f.treasury.get_spending(&proposal.proposal_id).unwrap().unwrap();
        assert_eq!(spending.status, SpendingStatus::Pending);
        assert_eq!(spending.amount, Amount::new(300));
        assert_eq!(f.treasury.list_spendings(&chain()).unwrap(), vec![spending]);
    }

    #[test]
    fn spending_proposal_describes_request_in_chain_denom() {
        let f = fixture();
        let account = f
            .treasury
            .create_account(&chain(), "Foundation", AccountType::Foundation, Amount::new(5_000), vec![])
            .unwrap();
        let proposal = f
            .treasury
            .submit_spending_proposal(&chain(), "alice", request(&account.account_id, 3_000))
            .unwrap();

        assert_eq!(
            proposal.description,
            "Spend 3000 utest from treasury account Foundation to cosmos1grantee for audit"
        );
        let metadata = &proposal.metadata;
        assert_eq!(metadata["account_id"], account.account_id);
        assert_eq!(metadata["recipient"], "cosmos1grantee");
        assert_eq!(metadata["amount"], "3000");
        assert_eq!(metadata["purpose"], "audit");
        assert_eq!(metadata["denom"], "utest");
    }

    #[test]
    fn execution_happens_exactly_once() {
        let f = fixture();
        let account = f
            .treasury
            .create_account(&chain(), "Foundation", AccountType::Foundation, Amount::new(10_000), vec![])
            .unwrap();
        let proposal = f
            .treasury
            .submit_spending_proposal(&chain(), "alice", request(&account.account_id, 3_000))
            .unwrap();

        assert!(!f.treasury.execute_approved_spending(&proposal.proposal_id).unwrap());
        pass(&f, &proposal.proposal_id);

        assert!(f.treasury.execute_approved_spending(&proposal.proposal_id).unwrap());
        assert_eq!(
            f.treasury.get_account(&account.account_id).unwrap().balance,
            Amount::new(7_000)
        );
        assert!(!f.treasury.execute_approved_spending(&proposal.proposal_id).unwrap());
        assert_eq!(
            f.treasury.get_account(&account.account_id).unwrap().balance,
            Amount::new(7_000)
        );
        let spending = f.treasury.get_spending(&proposal.proposal_id).unwrap().unwrap();
        assert_eq!(spending.status, SpendingStatus::Executed);
        assert_eq!(spending.executed_at, Some(Timestamp::new(1_000_000)));
    }

    #[test]
    fn underfunded_execution_waits_for_top_up() {
        let f = fixture();
        let account = f
            .treasury
            .create_account(&chain(), "Foundation", AccountType::Foundation, Amount::new(500), vec![])
            .unwrap();
        let first = f
            .treasury
            .submit_spending_proposal(&chain(), "alice", request(&account.account_id, 400))
            .unwrap();
        let second = f
            .treasury
            .submit_spending_proposal(&chain(), "bob", request(&account.account_id, 400))
            .unwrap();
        pass(&f, &first.proposal_id);
        pass(&f, &second.proposal_id);

        assert!(f.treasury.execute_approved_spending(&first.proposal_id).unwrap());
        assert!(!f.treasury.execute_approved_spending(&second.proposal_id).unwrap());
        assert_eq!(
            f.treasury.get_account(&account.account_id).unwrap().balance,
            Amount::new(100)
        );

        f.treasury.top_up(&account.account_id, Amount::new(300)).unwrap();
        assert!(f.treasury.execute_approved_spending(&second.proposal_id).unwrap());
        assert_eq!(
            f.treasury.get_account(&account.account_id).unwrap().balance,
            Amount::ZERO
        );
    }

    #[test]
    fn missing_proposal_is_the_only_error() {
        let f = fixture();
        assert!(matches!(
            f.treasury.execute_approved_spending("proposal_testnet-1_missing"),
            Err(GovernanceError::ProposalNotFound(_))
        ));
    }
}
