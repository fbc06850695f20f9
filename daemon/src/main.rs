//! Agora daemon: runs the governance sweep and answers operator commands.

mod config;
mod denom;
mod stake;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use agora_governance::{
    AccountType, GovernanceEngine, ProposalDraft, ProposalStatus, ProposalType, SpendingRequest,
    VoteOption,
};
use agora_store_lmdb::{check_data_dir, check_integrity, LmdbEnvironment};
use agora_types::{Amount, ChainId, Clock, SystemClock};
use agora_utils::{format_remaining, init_logging, LogFormat};
use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::DaemonConfig;
use crate::denom::ConfiguredDenoms;
use crate::stake::ConfiguredBondedPower;

#[derive(Parser)]
#[command(name = "agora-daemon", about = "Agora governance ledger daemon")]
struct Cli {
    /// Path to a TOML configuration file. File settings are the base;
    /// CLI flags and env vars override them.
    #[arg(long, env = "AGORA_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory for the LMDB environment.
    #[arg(long, env = "AGORA_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// LMDB map size in MiB.
    #[arg(long, env = "AGORA_MAP_SIZE_MB")]
    map_size_mb: Option<usize>,

    /// Log output: "human" or "json".
    #[arg(long, env = "AGORA_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Log level or filter directive, e.g. "info" or "agora_governance=debug".
    #[arg(long, env = "AGORA_LOG_LEVEL")]
    log_level: Option<String>,

    /// Seconds between sweeps in `run` mode.
    #[arg(long, env = "AGORA_SWEEP_INTERVAL")]
    sweep_interval_secs: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sweep on an interval until interrupted.
    Run,
    /// Run a single sweep and print its report.
    Sweep,
    /// Print the dashboard of a chain as JSON.
    Dashboard { chain: String },
    /// Write every record of a chain to a JSON file.
    Export { chain: String, path: PathBuf },
    /// List the proposals of a chain with the time left in their current phase.
    Proposals { chain: String },
    /// Create a proposal.
    Propose {
        #[arg(long)]
        chain: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, value_enum, default_value_t = KindArg::Text)]
        kind: KindArg,
        #[arg(long)]
        proposer: String,
        #[arg(long)]
        deposit: u64,
    },
    /// Add a deposit to a proposal.
    Deposit {
        proposal_id: String,
        #[arg(long)]
        depositor: String,
        #[arg(long)]
        amount: u64,
    },
    /// Cast or replace a vote.
    Vote {
        proposal_id: String,
        #[arg(long)]
        voter: String,
        /// yes, no, abstain or no_with_veto.
        #[arg(long)]
        option: String,
        #[arg(long)]
        power: u64,
    },
    /// Tally a proposal whose voting period has ended.
    Tally { proposal_id: String },
    /// Open a treasury account.
    Account {
        #[arg(long)]
        chain: String,
        #[arg(long)]
        name: String,
        #[arg(long, value_enum, default_value_t = AccountArg::CommunityPool)]
        account_type: AccountArg,
        #[arg(long, default_value_t = 0)]
        balance: u64,
        #[arg(long, value_delimiter = ',')]
        spenders: Vec<String>,
    },
    /// Propose a payment out of a treasury account.
    Spend {
        #[arg(long)]
        chain: String,
        #[arg(long)]
        account: String,
        #[arg(long)]
        recipient: String,
        #[arg(long)]
        amount: u64,
        #[arg(long, default_value = "")]
        purpose: String,
        #[arg(long)]
        proposer: String,
    },
    /// Pay out an approved spending proposal.
    Execute { proposal_id: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Text,
    ParameterChange,
    SoftwareUpgrade,
    CommunityPoolSpend,
    TaxRateChange,
    HaltNetwork,
    EnableIbc,
}

impl From<KindArg> for ProposalType {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Text => Self::Text,
            KindArg::ParameterChange => Self::ParameterChange,
            KindArg::SoftwareUpgrade => Self::SoftwareUpgrade,
            KindArg::CommunityPoolSpend => Self::CommunityPoolSpend,
            KindArg::TaxRateChange => Self::TaxRateChange,
            KindArg::HaltNetwork => Self::HaltNetwork,
            KindArg::EnableIbc => Self::EnableIbc,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum AccountArg {
    Foundation,
    CommunityPool,
    EcosystemFund,
}

impl From<AccountArg> for AccountType {
    fn from(kind: AccountArg) -> Self {
        match kind {
            AccountArg::Foundation => Self::Foundation,
            AccountArg::CommunityPool => Self::CommunityPool,
            AccountArg::EcosystemFund => Self::EcosystemFund,
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<DaemonConfig> {
    let mut config = match &cli.config {
        Some(path) => DaemonConfig::from_toml_file(path)?,
        None => DaemonConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(size) = cli.map_size_mb {
        config.map_size_mb = size;
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(secs) = cli.sweep_interval_secs {
        config.sweep_interval_secs = secs;
    }
    Ok(config)
}

/// Open the database, check it, and install the configured chains.
fn open_engine(config: &DaemonConfig) -> anyhow::Result<GovernanceEngine> {
    check_data_dir(&config.data_dir).map_err(anyhow::Error::msg)?;
    let env = LmdbEnvironment::open(&config.data_dir, config.map_size_bytes())
        .with_context(|| format!("opening {}", config.data_dir.display()))?;

    let report = check_integrity(&env)?;
    if !report.is_healthy() {
        for error in &report.errors {
            warn!(%error, "integrity check");
        }
        bail!(
            "integrity check failed with {} error(s) in {}",
            report.errors.len(),
            config.data_dir.display()
        );
    }
    debug!(
        tables = report.tables_checked,
        records = report.total_records,
        "integrity check passed"
    );

    let engine = GovernanceEngine::new(
        Arc::new(env),
        Arc::new(SystemClock),
        Arc::new(ConfiguredBondedPower::from_chains(&config.chains)),
        Arc::new(ConfiguredDenoms::from_chains(&config.chains)),
    );
    for chain in &config.chains {
        engine
            .setup_governance(&chain.chain_id(), &chain.to_params())
            .with_context(|| format!("configuring chain {}", chain.chain_id))?;
    }
    Ok(engine)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(engine: GovernanceEngine, interval_secs: u64) -> anyhow::Result<()> {
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(interval_secs, "sweeping");
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let engine = engine.clone();
                match tokio::task::spawn_blocking(move || engine.sweep()).await? {
                    Ok(report) if report.changes() > 0 || !report.errors.is_empty() => info!(
                        scanned = report.scanned,
                        changes = report.changes(),
                        errors = report.errors.len(),
                        "sweep finished"
                    ),
                    Ok(report) => debug!(scanned = report.scanned, "nothing due"),
                    Err(e) => warn!(error = %e, "sweep failed"),
                }
            }
            result = &mut shutdown => {
                result?;
                info!("shutdown signal received");
                break;
            }
        }
    }
    Ok(())
}

fn list_proposals(engine: &GovernanceEngine, chain: &ChainId) -> anyhow::Result<()> {
    let now = SystemClock.now().as_secs();
    for proposal in engine.proposals(chain)? {
        let deadline = match proposal.status {
            ProposalStatus::DepositPeriod => Some(proposal.deposit_end_time),
            ProposalStatus::VotingPeriod => Some(proposal.voting_end_time),
            _ => None,
        };
        let remaining = deadline.map_or_else(
            || "-".to_string(),
            |deadline| format_remaining(now, deadline.as_secs()),
        );
        println!(
            "{}  {:<15}  {:>8}  {}",
            proposal.proposal_id,
            proposal.status.as_str(),
            remaining,
            proposal.title
        );
    }
    Ok(())
}

fn export(engine: &GovernanceEngine, chain: &ChainId, path: &Path) -> anyhow::Result<()> {
    let export = engine.export_to_path(chain, path)?;
    info!(
        chain = %chain,
        proposals = export.proposals.len(),
        path = %path.display(),
        "exported"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(config.log_format, &config.log_level)?;
    if let Some(path) = &cli.config {
        info!(path = %path.display(), chains = config.chains.len(), "loaded config");
    }

    let engine = open_engine(&config)?;

    match cli.command {
        Command::Run => run(engine, config.sweep_interval_secs).await?,
        Command::Sweep => {
            let report = engine.sweep()?;
            println!(
                "scanned {}  expired {}  passed {}  rejected {}  failed {}  executed {}",
                report.scanned,
                report.expired,
                report.passed,
                report.rejected,
                report.failed,
                report.executed
            );
            for error in &report.errors {
                println!("error: {error}");
            }
        }
        Command::Dashboard { chain } => print_json(&engine.dashboard(&ChainId::new(chain))?)?,
        Command::Export { chain, path } => export(&engine, &ChainId::new(chain), &path)?,
        Command::Proposals { chain } => list_proposals(&engine, &ChainId::new(chain))?,
        Command::Propose {
            chain,
            title,
            description,
            kind,
            proposer,
            deposit,
        } => {
            let proposal = engine.create_proposal(ProposalDraft {
                chain_id: ChainId::new(chain),
                title,
                description,
                proposal_type: kind.into(),
                proposer,
                initial_deposit: Amount::from(deposit),
                metadata: BTreeMap::new(),
            })?;
            print_json(&proposal)?;
        }
        Command::Deposit {
            proposal_id,
            depositor,
            amount,
        } => print_json(&engine.submit_deposit(&proposal_id, &depositor, Amount::from(amount))?)?,
        Command::Vote {
            proposal_id,
            voter,
            option,
            power,
        } => {
            let option: VoteOption = option.parse()?;
            print_json(&engine.cast_vote(&proposal_id, &voter, option, Amount::from(power))?)?;
        }
        Command::Tally { proposal_id } => print_json(&engine.tally_votes(&proposal_id)?)?,
        Command::Account {
            chain,
            name,
            account_type,
            balance,
            spenders,
        } => print_json(&engine.create_treasury_account(
            &ChainId::new(chain),
            &name,
            account_type.into(),
            Amount::from(balance),
            spenders,
        )?)?,
        Command::Spend {
            chain,
            account,
            recipient,
            amount,
            purpose,
            proposer,
        } => print_json(&engine.submit_spending_proposal(
            &ChainId::new(chain),
            &proposer,
            SpendingRequest {
                account_id: account,
                recipient,
                amount: Amount::from(amount),
                purpose,
            },
        )?)?,
        Command::Execute { proposal_id } => {
            if engine.execute_approved_spending(&proposal_id)? {
                println!("executed {proposal_id}");
            } else {
                println!("{proposal_id} is not executable; see its status and treasury balance");
            }
        }
    }

    Ok(())
}
