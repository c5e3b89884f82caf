//! Payout estimation
//!
//! A flat cost per detected damage category, summed and capped by the
//! claimant's policy tier. Pure and deterministic: no I/O, no failure paths.
//!
//! Repeated labels each contribute their full cost. Labels outside the cost
//! table contribute nothing, so the detector's vocabulary can grow without
//! breaking estimation.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::claim::PolicyTier;

/// Flat repair cost per damage category, in whole currency units
pub const DAMAGE_COSTS: [(&str, u64); 6] = [
    ("dent", 500),
    ("scratch", 200),
    ("crack", 800),
    ("glass shatter", 1000),
    ("light broken", 300),
    ("tire flat", 150),
];

/// A non-negative payout amount in whole currency units
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payout(u64);

impl Payout {
    pub const ZERO: Payout = Payout(0);

    pub fn new(amount: u64) -> Self {
        Self(amount)
    }

    pub fn amount(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Payout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

/// Cost contributed by a single label; unknown labels cost nothing
pub fn damage_cost(label: &str) -> u64 {
    DAMAGE_COSTS
        .iter()
        .find(|(category, _)| *category == label)
        .map(|(_, cost)| *cost)
        .unwrap_or(0)
}

/// Maximum payout for a tier
pub fn payout_cap(tier: PolicyTier) -> Payout {
    match tier {
        PolicyTier::Basic => Payout(1_000),
        PolicyTier::Standard => Payout(3_000),
        PolicyTier::Premium => Payout(10_000),
    }
}

/// Estimates the payout for a set of detected damage labels
///
/// `min(sum of label costs, cap(tier))`
pub fn estimate<S: AsRef<str>>(labels: &[S], tier: PolicyTier) -> Payout {
    let raw = labels
        .iter()
        .map(|label| damage_cost(label.as_ref()))
        .fold(0u64, u64::saturating_add);

    Payout(raw.min(payout_cap(tier).0))
}
