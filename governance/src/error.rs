use agora_store::StoreError;
use agora_types::AgoraError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GovernanceError {
    #[error("no governance config for chain {0}")]
    ConfigNotFound(String),

    #[error("proposal {0} not found")]
    ProposalNotFound(String),

    #[error("treasury account {0} not found")]
    AccountNotFound(String),

    #[error("airdrop {0} not found")]
    AirdropNotFound(String),

    #[error("validator application {0} not found")]
    OnboardingNotFound(String),

    #[error("{entity} is {status}, cannot {action}")]
    InvalidState {
        entity: String,
        status: String,
        action: &'static str,
    },

    #[error("{0} period has expired")]
    PeriodExpired(&'static str),

    #[error("insufficient deposit: {have} < {need}")]
    InsufficientDeposit { have: u128, need: u128 },

    #[error("invalid vote option: {0}")]
    InvalidVoteOption(String),

    #[error("insufficient treasury balance: have {have}, need {need}")]
    InsufficientTreasuryBalance { have: u128, need: u128 },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Collaborator(#[from] AgoraError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GovernanceError {
    pub(crate) fn invalid_state(
        entity: impl Into<String>,
        status: impl std::fmt::Display,
        action: &'static str,
    ) -> Self {
        Self::InvalidState {
            entity: entity.into(),
            status: status.to_string(),
            action,
        }
    }

    /// Whether repeating the same call later could succeed.
    ///
    /// Store conflicts clear once the competing writer is done, and a short
    /// treasury may be topped up. Everything else is decided by the input or
    /// by state that only moves forward.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store(e) => e.is_conflict(),
            Self::InsufficientTreasuryBalance { .. } => true,
            Self::Collaborator(AgoraError::Collaborator(_)) => true,
            _ => false,
        }
    }
}

impl From<bincode::Error> for GovernanceError {
    fn from(e: bincode::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for GovernanceError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryability_by_kind() {
        let conflict = GovernanceError::Store(StoreError::Conflict {
            key: "proposals/p1".into(),
            expected: 1,
            found: 2,
        });
        assert!(conflict.is_retryable());
        assert!(GovernanceError::InsufficientTreasuryBalance { have: 1, need: 2 }.is_retryable());

        assert!(!GovernanceError::PeriodExpired("voting").is_retryable());
        assert!(!GovernanceError::Validation("empty title".into()).is_retryable());
        assert!(!GovernanceError::ProposalNotFound("p1".into()).is_retryable());
        assert!(!GovernanceError::Store(StoreError::NotFound("x".into())).is_retryable());
    }

    #[test]
    fn invalid_state_message() {
        let err = GovernanceError::invalid_state("proposal p1", "Passed", "accept deposits");
        assert_eq!(err.to_string(), "proposal p1 is Passed, cannot accept deposits");
    }
}
