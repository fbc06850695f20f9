//! Errors from the shared value types and from outside collaborators.

use thiserror::Error;

/// Errors raised by the shared types and by external collaborators.
#[derive(Debug, Error)]
pub enum AgoraError {
    #[error("unknown chain: {0}")]
    UnknownChain(String),

    #[error("arithmetic overflow in {0}")]
    Overflow(&'static str),

    #[error("collaborator unavailable: {0}")]
    Collaborator(String),
}
