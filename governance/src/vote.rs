//! Vote options and stored votes.

use std::fmt;
use std::str::FromStr;

use agora_types::{Amount, Timestamp};
use serde::{Deserialize, Serialize};

use crate::GovernanceError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoteOption {
    Yes,
    Abstain,
    No,
    NoWithVeto,
}

impl VoteOption {
    pub const ALL: [VoteOption; 4] = [Self::Yes, Self::Abstain, Self::No, Self::NoWithVeto];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::Abstain => "abstain",
            Self::No => "no",
            Self::NoWithVeto => "no_with_veto",
        }
    }
}

impl fmt::Display for VoteOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteOption {
    type Err = GovernanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|option| option.as_str() == s)
            .ok_or_else(|| GovernanceError::InvalidVoteOption(s.to_string()))
    }
}

/// A voter's live vote on one proposal. Re-voting replaces it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub vote_id: String,
    pub proposal_id: String,
    pub voter: String,
    pub option: VoteOption,
    pub voting_power: Amount,
    pub voted_at: Timestamp,
}

/// Store key of a voter's vote: `"{proposal_id}/{voter}"`.
pub(crate) fn vote_key(proposal_id: &str, voter: &str) -> String {
    format!("{proposal_id}/{voter}")
}
