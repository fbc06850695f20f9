//! End-to-end scenarios driven through `GovernanceEngine`, on the in-memory
//! store and on LMDB.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;

use agora_governance::{
    AccountType, AirdropDraft, AirdropStatus, ApplicationDraft, DistributionMethod,
    FailureReason, GovernanceEngine, GovernanceError, GovernanceParams, ProposalDraft,
    ProposalStatus, ProposalType, SpendingRequest, SpendingStatus, VoteOption,
};
use agora_nullables::{NullBondedPower, NullChainDenom, NullClock, NullStore};
use agora_store::GovernanceStore;
use agora_store_lmdb::LmdbEnvironment;
use agora_types::{Amount, Bps, ChainId, Timestamp, SECS_PER_DAY};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const START: u64 = 1_700_000_000;
const CHAIN: &str = "testnet-1";

fn chain() -> ChainId {
    ChainId::new(CHAIN)
}

fn engine_on(store: Arc<dyn GovernanceStore>, bonded: u128) -> (Arc<NullClock>, GovernanceEngine) {
    let clock = Arc::new(NullClock::new(START));
    let engine = GovernanceEngine::new(
        store,
        clock.clone(),
        Arc::new(NullBondedPower::with_chain(CHAIN, bonded)),
        Arc::new(NullChainDenom::with_chain(CHAIN, "uatom")),
    );
    engine
        .setup_governance(&chain(), &GovernanceParams::default())
        .expect("default params are valid");
    (clock, engine)
}

fn engine(bonded: u128) -> (Arc<NullClock>, GovernanceEngine) {
    engine_on(Arc::new(NullStore::new()), bonded)
}

fn text_proposal(engine: &GovernanceEngine, deposit: u128) -> String {
    engine
        .create_proposal(ProposalDraft {
            chain_id: chain(),
            title: "Community charter".into(),
            description: "Adopt the charter".into(),
            proposal_type: ProposalType::Text,
            proposer: "cosmos1alice".into(),
            initial_deposit: Amount::new(deposit),
            metadata: BTreeMap::new(),
        })
        .expect("create proposal")
        .proposal_id
}

fn spend(account_id: &str, amount: u128) -> SpendingRequest {
    SpendingRequest {
        account_id: account_id.to_string(),
        recipient: "cosmos1grantee".into(),
        amount: Amount::new(amount),
        purpose: "security audit".into(),
    }
}

/// Past both the deposit and the voting window of a proposal created at START.
fn after_voting(clock: &NullClock) {
    clock.set(START + 21 * SECS_PER_DAY + 1);
}

// ---------------------------------------------------------------------------
// Lifecycle and tally
// ---------------------------------------------------------------------------

#[test]
fn funded_proposal_passes_with_clear_majority() {
    let (clock, engine) = engine(1_000);
    let id = text_proposal(&engine, 1_000);
    assert_eq!(engine.proposal(&id).unwrap().status, ProposalStatus::VotingPeriod);

    engine.cast_vote(&id, "bob", VoteOption::Yes, Amount::new(882)).unwrap();
    engine.cast_vote(&id, "carol", VoteOption::No, Amount::new(118)).unwrap();

    after_voting(&clock);
    let result = engine.tally_votes(&id).unwrap();
    assert!(result.passed);
    assert_eq!(result.total, Amount::new(1_000));
    assert!((result.yes_percentage - 88.2).abs() < 1e-9);
    assert_eq!(engine.proposal(&id).unwrap().final_tally, Some(result));
}

#[test]
fn proposal_funded_in_two_deposits_passes_on_weighted_votes() {
    let clock = Arc::new(NullClock::new(START));
    let engine = GovernanceEngine::new(
        Arc::new(NullStore::new()),
        clock.clone(),
        Arc::new(NullBondedPower::with_chain(CHAIN, 3_000_000)),
        Arc::new(NullChainDenom::with_chain(CHAIN, "uatom")),
    );
    engine
        .setup_governance(
            &chain(),
            &GovernanceParams {
                min_initial_deposit: Amount::new(500),
                min_deposit: Amount::new(1_000),
                ..Default::default()
            },
        )
        .unwrap();

    let id = text_proposal(&engine, 500);
    assert_eq!(engine.proposal(&id).unwrap().status, ProposalStatus::DepositPeriod);
    let proposal = engine.submit_deposit(&id, "cosmos1bob", Amount::new(500)).unwrap();
    assert_eq!(proposal.status, ProposalStatus::VotingPeriod);
    assert_eq!(proposal.total_deposit, Amount::new(1_000));

    engine.cast_vote(&id, "val1", VoteOption::Yes, Amount::new(1_000_000)).unwrap();
    engine.cast_vote(&id, "val2", VoteOption::Yes, Amount::new(500_000)).unwrap();
    engine.cast_vote(&id, "val3", VoteOption::No, Amount::new(200_000)).unwrap();

    after_voting(&clock);
    let result = engine.tally_votes(&id).unwrap();
    assert_eq!(result.status, ProposalStatus::Passed);
    assert!(result.passed);
    assert_eq!(result.total, Amount::new(1_700_000));
    assert_eq!((result.yes_percentage * 10.0).round() / 10.0, 88.2);
    assert_eq!(engine.proposal(&id).unwrap().status, ProposalStatus::Passed);
}

#[test]
fn veto_rejects_despite_majority() {
    let (clock, engine) = engine(100);
    let id = text_proposal(&engine, 1_000);
    engine.cast_vote(&id, "bob", VoteOption::Yes, Amount::new(60)).unwrap();
    engine.cast_vote(&id, "carol", VoteOption::NoWithVeto, Amount::new(40)).unwrap();

    after_voting(&clock);
    let result = engine.tally_votes(&id).unwrap();
    assert!(!result.passed);
    assert_eq!(result.status, ProposalStatus::Rejected);
    assert!((result.veto_percentage - 40.0).abs() < 1e-9);
}

#[test]
fn low_turnout_fails_on_quorum() {
    let (clock, engine) = engine(1_000_000);
    let id = text_proposal(&engine, 1_000);
    engine.cast_vote(&id, "bob", VoteOption::Yes, Amount::new(1_000)).unwrap();

    after_voting(&clock);
    let result = engine.tally_votes(&id).unwrap();
    assert_eq!(result.status, ProposalStatus::Failed);
    assert_eq!(result.failure_reason, Some(FailureReason::QuorumNotMet));
    assert_eq!(
        engine.proposal(&id).unwrap().failure_reason,
        Some(FailureReason::QuorumNotMet)
    );
}

#[test]
fn tally_partitions_the_votes() {
    let (_clock, engine) = engine(1_000);
    let id = text_proposal(&engine, 1_000);
    let votes = [
        ("v1", VoteOption::Yes, 10),
        ("v2", VoteOption::Abstain, 20),
        ("v3", VoteOption::No, 30),
        ("v4", VoteOption::NoWithVeto, 40),
        ("v1", VoteOption::Abstain, 15),
    ];
    for (voter, option, power) in votes {
        engine.cast_vote(&id, voter, option, Amount::new(power)).unwrap();
    }
    let tally = engine.proposal(&id).unwrap().tally_results;
    let live: Amount = engine
        .votes(&id)
        .unwrap()
        .iter()
        .fold(Amount::ZERO, |acc, v| acc.checked_add(v.voting_power).unwrap());
    assert_eq!(tally.total(), Some(live));
    assert_eq!(tally.abstain, Amount::new(35));
    assert_eq!(tally.yes, Amount::ZERO);
}

#[test]
fn vote_option_strings_are_checked_at_the_boundary() {
    assert_eq!("no_with_veto".parse::<VoteOption>().unwrap(), VoteOption::NoWithVeto);
    let err = "maybe".parse::<VoteOption>().unwrap_err();
    assert!(matches!(err, GovernanceError::InvalidVoteOption(ref s) if s == "maybe"));
}

// ---------------------------------------------------------------------------
// Treasury
// ---------------------------------------------------------------------------

#[test]
fn passed_spending_executes_exactly_once() {
    let (clock, engine) = engine(1_000);
    let account = engine
        .create_treasury_account(&chain(), "Community Pool", AccountType::CommunityPool, Amount::new(10_000), vec![])
        .unwrap();
    let proposal = engine
        .submit_spending_proposal(&chain(), "cosmos1alice", spend(&account.account_id, 3_000))
        .unwrap();
    assert_eq!(proposal.status, ProposalStatus::VotingPeriod);
    engine
        .cast_vote(&proposal.proposal_id, "bob", VoteOption::Yes, Amount::new(600))
        .unwrap();

    after_voting(&clock);
    assert!(engine.tally_votes(&proposal.proposal_id).unwrap().passed);
    assert_eq!(
        engine.spending(&proposal.proposal_id).unwrap().unwrap().status,
        SpendingStatus::Approved
    );

    assert!(engine.execute_approved_spending(&proposal.proposal_id).unwrap());
    assert_eq!(engine.treasury_account(&account.account_id).unwrap().balance, Amount::new(7_000));
    assert!(!engine.execute_approved_spending(&proposal.proposal_id).unwrap());
    assert_eq!(engine.treasury_account(&account.account_id).unwrap().balance, Amount::new(7_000));
}

#[test]
fn rejected_spending_never_executes() {
    let (clock, engine) = engine(1_000);
    let account = engine
        .create_treasury_account(&chain(), "Foundation", AccountType::Foundation, Amount::new(10_000), vec![])
        .unwrap();
    let proposal = engine
        .submit_spending_proposal(&chain(), "cosmos1alice", spend(&account.account_id, 3_000))
        .unwrap();
    engine
        .cast_vote(&proposal.proposal_id, "bob", VoteOption::No, Amount::new(600))
        .unwrap();

    after_voting(&clock);
    assert!(!engine.tally_votes(&proposal.proposal_id).unwrap().passed);
    assert_eq!(
        engine.spending(&proposal.proposal_id).unwrap().unwrap().status,
        SpendingStatus::Rejected
    );
    assert!(!engine.execute_approved_spending(&proposal.proposal_id).unwrap());
    assert_eq!(engine.treasury_account(&account.account_id).unwrap().balance, Amount::new(10_000));
}

#[test]
fn concurrent_executions_debit_once() {
    let (clock, engine) = engine(1_000);
    let account = engine
        .create_treasury_account(&chain(), "Foundation", AccountType::Foundation, Amount::new(10_000), vec![])
        .unwrap();
    let proposal = engine
        .submit_spending_proposal(&chain(), "cosmos1alice", spend(&account.account_id, 3_000))
        .unwrap();
    engine
        .cast_vote(&proposal.proposal_id, "bob", VoteOption::Yes, Amount::new(600))
        .unwrap();
    after_voting(&clock);
    engine.tally_votes(&proposal.proposal_id).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = engine.clone();
            let id = proposal.proposal_id.clone();
            thread::spawn(move || loop {
                match engine.execute_approved_spending(&id) {
                    Ok(executed) => return executed,
                    Err(e) if e.is_retryable() => continue,
                    Err(e) => panic!("unexpected error: {e}"),
                }
            })
        })
        .collect();
    let executed = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|executed| *executed)
        .count();

    assert_eq!(executed, 1);
    assert_eq!(engine.treasury_account(&account.account_id).unwrap().balance, Amount::new(7_000));
}

// ---------------------------------------------------------------------------
// Sweep
// ---------------------------------------------------------------------------

#[test]
fn sweep_finalizes_everything_due_and_is_idempotent() {
    let clock = Arc::new(NullClock::new(START));
    let engine = GovernanceEngine::new(
        Arc::new(NullStore::new()),
        clock.clone(),
        Arc::new(NullBondedPower::with_chain(CHAIN, 1_000)),
        Arc::new(NullChainDenom::with_chain(CHAIN, "uatom")),
    );
    engine
        .setup_governance(
            &chain(),
            &GovernanceParams {
                min_deposit: Amount::new(5_000),
                ..Default::default()
            },
        )
        .unwrap();

    let unfunded = text_proposal(&engine, 1_000);
    let voted = text_proposal(&engine, 1_000);
    engine.submit_deposit(&voted, "bob", Amount::new(4_000)).unwrap();
    engine.cast_vote(&voted, "bob", VoteOption::Yes, Amount::new(700)).unwrap();

    let account = engine
        .create_treasury_account(&chain(), "Ecosystem", AccountType::EcosystemFund, Amount::new(10_000), vec![])
        .unwrap();
    let spending = engine
        .submit_spending_proposal(&chain(), "cosmos1alice", spend(&account.account_id, 2_500))
        .unwrap();
    engine.submit_deposit(&spending.proposal_id, "bob", Amount::new(4_000)).unwrap();
    engine
        .cast_vote(&spending.proposal_id, "bob", VoteOption::Yes, Amount::new(700))
        .unwrap();

    // Before any deadline nothing moves.
    let idle = engine.sweep().unwrap();
    assert_eq!(idle.changes(), 0);
    assert_eq!(idle.scanned, 3);

    after_voting(&clock);
    let report = engine.sweep().unwrap();
    assert_eq!(report.expired, 1);
    assert_eq!(report.passed, 2);
    assert_eq!(report.executed, 1);
    assert!(report.errors.is_empty(), "{:?}", report.errors);

    let failed = engine.proposal(&unfunded).unwrap();
    assert_eq!(failed.status, ProposalStatus::Failed);
    assert_eq!(failed.failure_reason, Some(FailureReason::DepositTimeout));
    assert_eq!(engine.proposal(&voted).unwrap().status, ProposalStatus::Passed);
    assert_eq!(engine.treasury_account(&account.account_id).unwrap().balance, Amount::new(7_500));

    let again = engine.sweep().unwrap();
    assert_eq!(again.changes(), 0);
    assert_eq!(engine.treasury_account(&account.account_id).unwrap().balance, Amount::new(7_500));
}

#[test]
fn sweep_retries_underfunded_spending_after_top_up() {
    let (clock, engine) = engine(1_000);
    let account = engine
        .create_treasury_account(&chain(), "Foundation", AccountType::Foundation, Amount::new(3_000), vec![])
        .unwrap();
    let first = engine
        .submit_spending_proposal(&chain(), "cosmos1alice", spend(&account.account_id, 3_000))
        .unwrap();
    let second = engine
        .submit_spending_proposal(&chain(), "cosmos1bob", spend(&account.account_id, 3_000))
        .unwrap();
    for id in [&first.proposal_id, &second.proposal_id] {
        engine.cast_vote(id, "bob", VoteOption::Yes, Amount::new(600)).unwrap();
    }

    after_voting(&clock);
    let report = engine.sweep().unwrap();
    assert_eq!(report.passed, 2);
    assert_eq!(report.executed, 1);

    engine.top_up(&account.account_id, Amount::new(3_000)).unwrap();
    let report = engine.sweep().unwrap();
    assert_eq!(report.executed, 1);
    assert_eq!(engine.treasury_account(&account.account_id).unwrap().balance, Amount::ZERO);
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[test]
fn concurrent_deposits_are_all_counted() {
    let clock = Arc::new(NullClock::new(START));
    let engine = GovernanceEngine::new(
        Arc::new(NullStore::new()),
        clock,
        Arc::new(NullBondedPower::with_chain(CHAIN, 1_000)),
        Arc::new(NullChainDenom::with_chain(CHAIN, "uatom")),
    );
    engine
        .setup_governance(
            &chain(),
            &GovernanceParams {
                min_initial_deposit: Amount::new(100),
                min_deposit: Amount::new(1_000_000),
                max_deposit: Amount::new(10_000_000),
                ..Default::default()
            },
        )
        .unwrap();
    let id = text_proposal(&engine, 100);

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let engine = engine.clone();
            let id = id.clone();
            thread::spawn(move || {
                for _ in 0..25 {
                    loop {
                        match engine.submit_deposit(&id, &format!("depositor-{worker}"), Amount::new(10)) {
                            Ok(_) => break,
                            Err(e) if e.is_retryable() => continue,
                            Err(e) => panic!("unexpected error: {e}"),
                        }
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(engine.proposal(&id).unwrap().total_deposit, Amount::new(100 + 8 * 25 * 10));
}

#[test]
fn concurrent_creations_respect_the_pending_limit() {
    for _round in 0..4 {
        let clock = Arc::new(NullClock::new(START));
        let engine = GovernanceEngine::new(
            Arc::new(NullStore::new()),
            clock,
            Arc::new(NullBondedPower::with_chain(CHAIN, 1_000)),
            Arc::new(NullChainDenom::with_chain(CHAIN, "uatom")),
        );
        engine
            .setup_governance(
                &chain(),
                &GovernanceParams {
                    min_initial_deposit: Amount::new(100),
                    max_pending_proposals: 3,
                    ..Default::default()
                },
            )
            .unwrap();

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let engine = engine.clone();
                thread::spawn(move || loop {
                    let draft = ProposalDraft {
                        chain_id: chain(),
                        title: format!("Proposal from worker {worker}"),
                        description: "Concurrent submission".into(),
                        proposal_type: ProposalType::Text,
                        proposer: format!("cosmos1worker{worker}"),
                        initial_deposit: Amount::new(100),
                        metadata: BTreeMap::new(),
                    };
                    match engine.create_proposal(draft) {
                        Ok(_) => return true,
                        Err(GovernanceError::Validation(_)) => return false,
                        Err(e) if e.is_retryable() => continue,
                        Err(e) => panic!("unexpected error: {e}"),
                    }
                })
            })
            .collect();
        let created = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|created| *created)
            .count();

        let pending = engine
            .proposals(&chain())
            .unwrap()
            .into_iter()
            .filter(|p| !p.status.is_terminal())
            .count();
        assert_eq!(created, 3);
        assert_eq!(pending, 3);
    }
}

// ---------------------------------------------------------------------------
// Programs, reporting, persistence
// ---------------------------------------------------------------------------

#[test]
fn dashboard_summarizes_the_chain() {
    let (clock, engine) = engine(1_000);
    let passed = text_proposal(&engine, 1_000);
    engine.cast_vote(&passed, "bob", VoteOption::Yes, Amount::new(900)).unwrap();
    let failed = text_proposal(&engine, 1_000);

    engine
        .create_treasury_account(&chain(), "Foundation", AccountType::Foundation, Amount::new(10_000), vec![])
        .unwrap();
    let drop = engine
        .create_airdrop(AirdropDraft {
            chain_id: chain(),
            token_amount: Amount::new(1_000),
            eligible_addresses: vec!["cosmos1a".into()],
            distribution_method: DistributionMethod::Proportional,
            start_date: Timestamp::new(START),
            end_date: Timestamp::new(START + SECS_PER_DAY),
            metadata: BTreeMap::new(),
        })
        .unwrap();
    engine.start_airdrop(&drop.airdrop_id).unwrap();
    engine
        .submit_validator_application(ApplicationDraft {
            chain_id: chain(),
            validator_address: "cosmosvaloper1abc".into(),
            operator_address: "cosmos1abc".into(),
            validator_name: "Validator A".into(),
            website: None,
            description: String::new(),
            commission_rate: Bps::new(1_000).unwrap(),
            max_rate: Bps::new(2_000).unwrap(),
            max_change_rate: Bps::new(100).unwrap(),
            metadata: BTreeMap::new(),
        })
        .unwrap();

    after_voting(&clock);
    engine.sweep().unwrap();

    let dash = engine.dashboard(&chain()).unwrap();
    assert_eq!(dash.total_proposals, 2);
    assert_eq!(dash.passed_proposals, 1);
    assert_eq!(dash.failed_proposals, 1);
    assert_eq!(dash.pending_proposals, 0);
    assert!((dash.pass_rate - 50.0).abs() < 1e-9);
    assert_eq!(dash.proposal_types.get("text"), Some(&2));
    assert_eq!(dash.total_treasury_balance, Amount::new(10_000));
    assert_eq!(dash.treasury_accounts, 1);
    assert_eq!(dash.active_treasury_accounts, 1);
    assert_eq!(dash.active_airdrops, 1);
    assert_eq!(dash.pending_validator_applications, 1);
    assert_eq!(dash.recent_proposals.len(), 2);
    assert_eq!(engine.proposal(&failed).unwrap().status, ProposalStatus::Failed);
    assert_eq!(engine.airdrops(&chain()).unwrap()[0].status, AirdropStatus::Active);
}

#[test]
fn export_writes_pretty_json() {
    let (_clock, engine) = engine(1_000);
    let id = text_proposal(&engine, 1_000);
    engine.cast_vote(&id, "bob", VoteOption::Yes, Amount::new(10)).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("export.json");
    let export = engine.export_to_path(&chain(), &path).unwrap();
    assert_eq!(export.proposals.len(), 1);
    assert_eq!(export.votes.len(), 1);
    assert!(export.config.is_some());

    let json = std::fs::read_to_string(&path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["chain_id"], CHAIN);
    assert_eq!(value["proposals"][0]["proposal_id"], id.as_str());
    assert!(json.contains('\n'));
}

#[test]
fn lmdb_backed_engine_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let id = {
        let store = Arc::new(LmdbEnvironment::open(dir.path(), 64 * 1024 * 1024).unwrap());
        let (clock, engine) = engine_on(store, 1_000);
        let account = engine
            .create_treasury_account(&chain(), "Foundation", AccountType::Foundation, Amount::new(10_000), vec![])
            .unwrap();
        let proposal = engine
            .submit_spending_proposal(&chain(), "cosmos1alice", spend(&account.account_id, 3_000))
            .unwrap();
        engine
            .cast_vote(&proposal.proposal_id, "bob", VoteOption::Yes, Amount::new(600))
            .unwrap();
        after_voting(&clock);
        assert_eq!(engine.sweep().unwrap().executed, 1);
        proposal.proposal_id
    };

    let store = Arc::new(LmdbEnvironment::open(dir.path(), 64 * 1024 * 1024).unwrap());
    let (_clock, engine) = engine_on(store, 1_000);
    let proposal = engine.proposal(&id).unwrap();
    assert_eq!(proposal.status, ProposalStatus::Passed);
    let spending = engine.spending(&id).unwrap().unwrap();
    assert_eq!(spending.status, SpendingStatus::Executed);
    assert_eq!(
        engine.treasury_account(&spending.account_id).unwrap().balance,
        Amount::new(7_000)
    );
    assert!(!engine.execute_approved_spending(&id).unwrap());
}
