//! Community program trackers: token airdrops and validator onboarding.
//!
//! Both are plain status workflows with no tally behind them. They share the
//! versioned read-modify-write of the rest of the ledger.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use agora_store::{Table, WriteBatch};
use agora_types::{Amount, Bps, ChainId, Clock, Timestamp};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::repo::{derive_id, encode, with_retry, Repo, Versioned};
use crate::GovernanceError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistributionMethod {
    Equal,
    Proportional,
    Merkle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AirdropStatus {
    Planned,
    Active,
    Completed,
    Cancelled,
}

impl fmt::Display for AirdropStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Planned => "planned",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Airdrop {
    pub airdrop_id: String,
    pub chain_id: ChainId,
    pub token_amount: Amount,
    pub eligible_addresses: Vec<String>,
    pub distribution_method: DistributionMethod,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    pub status: AirdropStatus,
    pub created_at: Timestamp,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Clone, Debug)]
pub struct AirdropDraft {
    pub chain_id: ChainId,
    pub token_amount: Amount,
    pub eligible_addresses: Vec<String>,
    pub distribution_method: DistributionMethod,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OnboardingStatus {
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for OnboardingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorOnboarding {
    pub onboarding_id: String,
    pub chain_id: ChainId,
    pub validator_address: String,
    pub operator_address: String,
    pub validator_name: String,
    pub website: Option<String>,
    pub description: String,
    pub commission_rate: Bps,
    pub max_rate: Bps,
    pub max_change_rate: Bps,
    pub status: OnboardingStatus,
    pub applied_at: Timestamp,
    pub approved_at: Option<Timestamp>,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Clone, Debug)]
pub struct ApplicationDraft {
    pub chain_id: ChainId,
    pub validator_address: String,
    pub operator_address: String,
    pub validator_name: String,
    pub website: Option<String>,
    pub description: String,
    pub commission_rate: Bps,
    pub max_rate: Bps,
    pub max_change_rate: Bps,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Clone)]
pub struct ProgramTracker {
    repo: Repo,
    clock: Arc<dyn Clock>,
}

impl ProgramTracker {
    pub fn new(repo: Repo, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    pub fn create_airdrop(&self, draft: AirdropDraft) -> Result<Airdrop, GovernanceError> {
        if !draft.chain_id.is_valid() {
            return Err(GovernanceError::Validation(format!(
                "invalid chain id '{}'",
                draft.chain_id
            )));
        }
        if draft.token_amount.is_zero() {
            return Err(GovernanceError::Validation(
                "airdrop token amount must be positive".into(),
            ));
        }
        if draft.end_date <= draft.start_date {
            return Err(GovernanceError::Validation(
                "airdrop must end after it starts".into(),
            ));
        }
        if draft.eligible_addresses.is_empty() {
            return Err(GovernanceError::Validation(
                "airdrop needs at least one eligible address".into(),
            ));
        }

        let now = self.clock.now();
        let airdrop = Airdrop {
            airdrop_id: derive_id(
                &self.repo,
                "airdrop",
                draft.chain_id.as_str(),
                &draft.token_amount.to_string(),
                now.as_secs(),
            )?,
            chain_id: draft.chain_id,
            token_amount: draft.token_amount,
            eligible_addresses: draft.eligible_addresses,
            distribution_method: draft.distribution_method,
            start_date: draft.start_date,
            end_date: draft.end_date,
            status: AirdropStatus::Planned,
            created_at: now,
            metadata: draft.metadata,
        };

        let mut batch = WriteBatch::new();
        batch.insert(Table::Airdrops, &airdrop.airdrop_id, encode(&airdrop)?);
        self.repo.commit(batch)?;

        info!(
            airdrop_id = %airdrop.airdrop_id,
            amount = %airdrop.token_amount,
            recipients = airdrop.eligible_addresses.len(),
            "airdrop planned"
        );
        Ok(airdrop)
    }

    pub fn start_airdrop(&self, airdrop_id: &str) -> Result<Airdrop, GovernanceError> {
        self.move_airdrop(airdrop_id, "start", &[AirdropStatus::Planned], AirdropStatus::Active)
    }

    pub fn complete_airdrop(&self, airdrop_id: &str) -> Result<Airdrop, GovernanceError> {
        self.move_airdrop(airdrop_id, "complete", &[AirdropStatus::Active], AirdropStatus::Completed)
    }

    pub fn cancel_airdrop(&self, airdrop_id: &str) -> Result<Airdrop, GovernanceError> {
        self.move_airdrop(
            airdrop_id,
            "cancel",
            &[AirdropStatus::Planned, AirdropStatus::Active],
            AirdropStatus::Cancelled,
        )
    }

    pub fn get_airdrop(&self, airdrop_id: &str) -> Result<Airdrop, GovernanceError> {
        self.repo
            .load::<Airdrop>(Table::Airdrops, airdrop_id)?
            .map(|v| v.value)
            .ok_or_else(|| GovernanceError::AirdropNotFound(airdrop_id.to_string()))
    }

    pub fn list_airdrops(&self, chain_id: &ChainId) -> Result<Vec<Airdrop>, GovernanceError> {
        self.list(Table::Airdrops, "airdrop", chain_id, |a: &Airdrop| &a.chain_id)
    }

    pub fn submit_application(
        &self,
        draft: ApplicationDraft,
    ) -> Result<ValidatorOnboarding, GovernanceError> {
        if !draft.chain_id.is_valid() {
            return Err(GovernanceError::Validation(format!(
                "invalid chain id '{}'",
                draft.chain_id
            )));
        }
        for (field, value) in [
            ("validator address", &draft.validator_address),
            ("operator address", &draft.operator_address),
            ("validator name", &draft.validator_name),
        ] {
            if value.trim().is_empty() {
                return Err(GovernanceError::Validation(format!("{field} must not be empty")));
            }
        }
        if draft.commission_rate > draft.max_rate {
            return Err(GovernanceError::Validation(format!(
                "commission rate {} exceeds max rate {}",
                draft.commission_rate, draft.max_rate
            )));
        }
        if draft.max_change_rate > draft.max_rate {
            return Err(GovernanceError::Validation(format!(
                "max change rate {} exceeds max rate {}",
                draft.max_change_rate, draft.max_rate
            )));
        }

        let now = self.clock.now();
        let onboarding = ValidatorOnboarding {
            onboarding_id: derive_id(
                &self.repo,
                "onboarding",
                draft.chain_id.as_str(),
                &draft.validator_address,
                now.as_secs(),
            )?,
            chain_id: draft.chain_id,
            validator_address: draft.validator_address,
            operator_address: draft.operator_address,
            validator_name: draft.validator_name,
            website: draft.website,
            description: draft.description,
            commission_rate: draft.commission_rate,
            max_rate: draft.max_rate,
            max_change_rate: draft.max_change_rate,
            status: OnboardingStatus::Pending,
            applied_at: now,
            approved_at: None,
            metadata: draft.metadata,
        };

        let mut batch = WriteBatch::new();
        batch.insert(Table::Onboardings, &onboarding.onboarding_id, encode(&onboarding)?);
        self.repo.commit(batch)?;

        info!(
            onboarding_id = %onboarding.onboarding_id,
            validator = %onboarding.validator_name,
            commission = %onboarding.commission_rate,
            "validator application submitted"
        );
        Ok(onboarding)
    }

    pub fn approve_application(
        &self,
        onboarding_id: &str,
    ) -> Result<ValidatorOnboarding, GovernanceError> {
        self.decide_application(onboarding_id, OnboardingStatus::Approved)
    }

    pub fn reject_application(
        &self,
        onboarding_id: &str,
    ) -> Result<ValidatorOnboarding, GovernanceError> {
        self.decide_application(onboarding_id, OnboardingStatus::Rejected)
    }

    pub fn get_application(
        &self,
        onboarding_id: &str,
    ) -> Result<ValidatorOnboarding, GovernanceError> {
        self.repo
            .load::<ValidatorOnboarding>(Table::Onboardings, onboarding_id)?
            .map(|v| v.value)
            .ok_or_else(|| GovernanceError::OnboardingNotFound(onboarding_id.to_string()))
    }

    pub fn list_applications(
        &self,
        chain_id: &ChainId,
    ) -> Result<Vec<ValidatorOnboarding>, GovernanceError> {
        self.list(Table::Onboardings, "onboarding", chain_id, |o: &ValidatorOnboarding| {
            &o.chain_id
        })
    }

    fn move_airdrop(
        &self,
        airdrop_id: &str,
        action: &'static str,
        from: &[AirdropStatus],
        to: AirdropStatus,
    ) -> Result<Airdrop, GovernanceError> {
        with_retry("airdrop_status", || {
            let Versioned { version, value: mut airdrop } = self
                .repo
                .load::<Airdrop>(Table::Airdrops, airdrop_id)?
                .ok_or_else(|| GovernanceError::AirdropNotFound(airdrop_id.to_string()))?;
            if !from.contains(&airdrop.status) {
                return Err(GovernanceError::invalid_state(
                    format!("airdrop {airdrop_id}"),
                    airdrop.status,
                    action,
                ));
            }
            airdrop.status = to;

            let mut batch = WriteBatch::new();
            batch.swap(Table::Airdrops, airdrop_id, version, encode(&airdrop)?);
            self.repo.commit(batch)?;

            info!(airdrop_id, status = %to, "airdrop status changed");
            Ok(airdrop)
        })
    }

    fn decide_application(
        &self,
        onboarding_id: &str,
        to: OnboardingStatus,
    ) -> Result<ValidatorOnboarding, GovernanceError> {
        with_retry("onboarding_status", || {
            let Versioned { version, value: mut onboarding } = self
                .repo
                .load::<ValidatorOnboarding>(Table::Onboardings, onboarding_id)?
                .ok_or_else(|| GovernanceError::OnboardingNotFound(onboarding_id.to_string()))?;
            if onboarding.status != OnboardingStatus::Pending {
                return Err(GovernanceError::invalid_state(
                    format!("validator application {onboarding_id}"),
                    onboarding.status,
                    "be decided again",
                ));
            }
            onboarding.status = to;
            if to == OnboardingStatus::Approved {
                onboarding.approved_at = Some(self.clock.now());
            }

            let mut batch = WriteBatch::new();
            batch.swap(Table::Onboardings, onboarding_id, version, encode(&onboarding)?);
            self.repo.commit(batch)?;

            info!(onboarding_id, status = %to, "validator application decided");
            Ok(onboarding)
        })
    }

    fn list<T: DeserializeOwned>(
        &self,
        table: Table,
        kind: &str,
        chain_id: &ChainId,
        chain_of: impl Fn(&T) -> &ChainId,
    ) -> Result<Vec<T>, GovernanceError> {
        Ok(self
            .repo
            .scan::<T>(table, &format!("{kind}_{chain_id}_"))?
            .into_iter()
            .map(|v| v.value)
            .filter(|item| chain_of(item) == chain_id)
            .collect())
    }
}
