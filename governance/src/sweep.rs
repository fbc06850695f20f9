//! Periodic finalizer.
//!
//! Deadlines are only compared at call time, so without a sweep a proposal
//! nobody tallies would sit in its voting period forever and its spending
//! would never run. A pass is idempotent and safe next to client calls: every
//! step is a versioned write, and a step that loses a race is reported and
//! picked up again on the next pass.

use std::sync::Arc;

use agora_store::Table;
use agora_types::Clock;
use tracing::{debug, info, warn};

use crate::lifecycle::ProposalLifecycle;
use crate::proposal::{Proposal, ProposalStatus};
use crate::repo::Repo;
use crate::tally::TallyEngine;
use crate::treasury::{SpendingStatus, TreasuryManager, TreasurySpending};
use crate::GovernanceError;

/// What one sweep pass did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: u64,
    pub expired: u64,
    pub passed: u64,
    pub rejected: u64,
    pub failed: u64,
    pub executed: u64,
    pub errors: Vec<String>,
}

impl SweepReport {
    /// Number of records this pass moved forward.
    pub fn changes(&self) -> u64 {
        self.expired + self.passed + self.rejected + self.failed + self.executed
    }
}

#[derive(Clone)]
pub struct Sweeper {
    repo: Repo,
    clock: Arc<dyn Clock>,
    lifecycle: ProposalLifecycle,
    tally: TallyEngine,
    treasury: TreasuryManager,
}

impl Sweeper {
    pub fn new(
        repo: Repo,
        clock: Arc<dyn Clock>,
        lifecycle: ProposalLifecycle,
        tally: TallyEngine,
        treasury: TreasuryManager,
    ) -> Self {
        Self {
            repo,
            clock,
            lifecycle,
            tally,
            treasury,
        }
    }

    /// Finalize everything whose deadline has passed, then pay out approved spending.
    ///
    /// Per-item failures are collected in the report; only a failure to read
    /// the store at all is returned as an error.
    pub fn run_once(&self) -> Result<SweepReport, GovernanceError> {
        let now = self.clock.now();
        let mut report = SweepReport::default();

        let proposals = self.repo.scan::<Proposal>(Table::Proposals, "")?;
        for proposal in proposals.into_iter().map(|v| v.value) {
            report.scanned += 1;
            let id = proposal.proposal_id.as_str();
            match proposal.status {
                ProposalStatus::DepositPeriod if now > proposal.deposit_end_time => {
                    match self.lifecycle.expire_deposit(id) {
                        Ok(Some(_)) => report.expired += 1,
                        Ok(None) => debug!(proposal_id = id, "deposit expiry already handled"),
                        Err(e) => record(&mut report, id, "expire deposit", e),
                    }
                }
                ProposalStatus::VotingPeriod if now > proposal.voting_end_time => {
                    match self.tally.tally_votes(id) {
                        Ok(result) => match result.status {
                            ProposalStatus::Passed => report.passed += 1,
                            ProposalStatus::Rejected => report.rejected += 1,
                            _ => report.failed += 1,
                        },
                        Err(e) => record(&mut report, id, "tally", e),
                    }
                }
                _ => {}
            }
        }

        let spendings = self.repo.scan::<TreasurySpending>(Table::Spendings, "")?;
        for spending in spendings
            .into_iter()
            .map(|v| v.value)
            .filter(|s| s.status == SpendingStatus::Approved)
        {
            match self.treasury.execute_approved_spending(&spending.proposal_id) {
                Ok(true) => report.executed += 1,
                Ok(false) => {
                    debug!(proposal_id = %spending.proposal_id, "approved spending not executable yet")
                }
                Err(e) => record(&mut report, &spending.proposal_id, "execute spending", e),
            }
        }

        if report.changes() > 0 || !report.errors.is_empty() {
            info!(
                scanned = report.scanned,
                expired = report.expired,
                passed = report.passed,
                rejected = report.rejected,
                failed = report.failed,
                executed = report.executed,
                errors = report.errors.len(),
                "sweep finished"
            );
        } else {
            debug!(scanned = report.scanned, "sweep found nothing to do");
        }
        Ok(report)
    }
}

fn record(report: &mut SweepReport, proposal_id: &str, step: &str, error: GovernanceError) {
    warn!(proposal_id, step, error = %error, "sweep step failed");
    report.errors.push(format!("{proposal_id}: {step}: {error}"));
}
