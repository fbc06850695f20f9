//! Basis-point ratios used for thresholds and quorum.
//!
//! Governance parameters are configured as percentages (0–100, e.g. `33.4`) and
//! stored as basis points so that every pass/fail comparison is exact integer
//! arithmetic instead of a floating-point guess.

use crate::Amount;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A ratio in basis points: `10_000` = 100%.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Bps(u32);

impl Bps {
    pub const ZERO: Self = Self(0);
    pub const MAX: Self = Self(10_000);

    /// Create from raw basis points; `None` above 10 000.
    pub fn new(bps: u32) -> Option<Self> {
        (bps <= Self::MAX.0).then_some(Self(bps))
    }

    /// Convert a percentage in `0.0..=100.0` (rounded to the nearest basis point).
    pub fn from_percent(percent: f64) -> Option<Self> {
        if !percent.is_finite() || !(0.0..=100.0).contains(&percent) {
            return None;
        }
        Self::new((percent * 100.0).round() as u32)
    }

    pub fn raw(&self) -> u32 {
        self.0
    }

    pub fn as_percent(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Whether `part / whole >= self`. A zero `whole` never reaches a non-zero ratio.
    pub fn is_reached_by(&self, part: Amount, whole: Amount) -> bool {
        if whole.is_zero() {
            return self.0 == 0;
        }
        let lhs = part.raw().checked_mul(Self::MAX.0 as u128);
        let rhs = whole.raw().checked_mul(self.0 as u128);
        match (lhs, rhs) {
            (Some(lhs), Some(rhs)) => lhs >= rhs,
            // Only reachable for amounts beyond 10^34 raw units.
            _ => part.raw() as f64 * Self::MAX.0 as f64 >= whole.raw() as f64 * self.0 as f64,
        }
    }

    /// `whole * self / 10_000`, rounded down.
    pub fn of(&self, whole: Amount) -> Amount {
        match whole.raw().checked_mul(self.0 as u128) {
            Some(v) => Amount::new(v / Self::MAX.0 as u128),
            None => Amount::new(whole.raw() / Self::MAX.0 as u128 * self.0 as u128),
        }
    }
}

impl fmt::Display for Bps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}%", self.as_percent())
    }
}
