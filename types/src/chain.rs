//! Chain identifier.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::AgoraError;

/// Identifies the chain a governance record belongs to (e.g. `"testnet-1"`).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChainId(String);

impl ChainId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Non-empty and free of the `/` used as a composite-key separator.
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty() && !self.0.contains('/') && !self.0.chars().any(char::is_whitespace)
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ChainId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ChainId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Looks up the denomination a chain counts its amounts in, e.g. `"uatom"`.
///
/// Supplied by an external chain registry. The ledger only uses it to make
/// proposal descriptions readable; amounts are always stored in raw units.
pub trait ChainDenom: Send + Sync {
    fn denom(&self, chain: &ChainId) -> Result<String, AgoraError>;
}
