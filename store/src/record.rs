//! Logical tables and versioned records.

use std::fmt;

/// The logical collections persisted by the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Table {
    /// `chain_id -> GovernanceConfig`
    Configs,
    /// `proposal_id -> Proposal`
    Proposals,
    /// `proposal_id/voter -> Vote`
    Votes,
    /// `account_id -> TreasuryAccount`
    TreasuryAccounts,
    /// `proposal_id -> TreasurySpending`
    Spendings,
    /// `airdrop_id -> Airdrop`
    Airdrops,
    /// `onboarding_id -> ValidatorOnboarding`
    Onboardings,
}

impl Table {
    pub const ALL: [Table; 7] = [
        Table::Configs,
        Table::Proposals,
        Table::Votes,
        Table::TreasuryAccounts,
        Table::Spendings,
        Table::Airdrops,
        Table::Onboardings,
    ];

    /// Stable name, used as the backend database name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Configs => "governance_configs",
            Self::Proposals => "proposals",
            Self::Votes => "votes",
            Self::TreasuryAccounts => "treasury_accounts",
            Self::Spendings => "treasury_spendings",
            Self::Airdrops => "airdrops",
            Self::Onboardings => "validator_onboardings",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A stored payload together with its version.
///
/// Versions start at 1 on insert and grow by one on every write, so a
/// writer holding version `n` can detect that someone else wrote in between.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    pub version: u64,
    pub data: Vec<u8>,
}

impl Record {
    pub fn new(version: u64, data: Vec<u8>) -> Self {
        Self { version, data }
    }

    /// Encode as `version_be(8) ++ data`, the on-disk layout of the LMDB backend.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + self.data.len());
        out.extend_from_slice(&self.version.to_be_bytes());
        out.extend_from_slice(&self.data);
        out
    }

    /// Decode the layout produced by [`Record::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 8 {
            return None;
        }
        let (head, data) = bytes.split_at(8);
        let mut version = [0u8; 8];
        version.copy_from_slice(head);
        Some(Self {
            version: u64::from_be_bytes(version),
            data: data.to_vec(),
        })
    }
}
