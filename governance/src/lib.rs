//! Governance ledger for Cosmos-style chains.
//!
//! Proposals move `DepositPeriod -> VotingPeriod -> Passed | Rejected | Failed`.
//! Deposits open voting once they reach the chain's minimum; votes are
//! weighted by the voting power the caller supplies; the tally applies
//! quorum against bonded power, then the yes and veto thresholds.
//! Treasury spending proposals pay out exactly once after they pass.
//!
//! Every write is an optimistic, versioned batch against a
//! [`agora_store::GovernanceStore`], retried on conflict.

pub mod dashboard;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod params;
pub mod programs;
pub mod proposal;
pub mod registry;
pub mod repo;
pub mod sweep;
pub mod tally;
pub mod treasury;
pub mod vote;

pub use dashboard::{ChainExport, GovernanceDashboard, ProposalSummary, Reporter};
pub use engine::GovernanceEngine;
pub use error::GovernanceError;
pub use lifecycle::{ProposalDraft, ProposalLifecycle};
pub use params::{GovernanceConfig, GovernanceParams};
pub use programs::{
    Airdrop, AirdropDraft, AirdropStatus, ApplicationDraft, DistributionMethod, OnboardingStatus,
    ProgramTracker, ValidatorOnboarding,
};
pub use proposal::{
    FailureReason, Proposal, ProposalStatus, ProposalType, SpendingRequest, TallyResult,
    TallyResults,
};
pub use registry::ConfigRegistry;
pub use sweep::{SweepReport, Sweeper};
pub use tally::{decide, Outcome, TallyEngine};
pub use treasury::{AccountType, SpendingStatus, TreasuryAccount, TreasuryManager, TreasurySpending};
pub use vote::{Vote, VoteOption};
