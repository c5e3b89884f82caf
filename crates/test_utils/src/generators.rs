//! Property-Based Test Generators
//!
//! Proptest strategies for claims data.

use proptest::prelude::*;

use domain_claims::payout::DAMAGE_COSTS;
use domain_claims::PolicyTier;

/// Strategy for policy tiers
pub fn policy_tier_strategy() -> impl Strategy<Value = PolicyTier> {
    prop_oneof![
        Just(PolicyTier::Basic),
        Just(PolicyTier::Standard),
        Just(PolicyTier::Premium),
    ]
}

/// Strategy for labels from the cost table
pub fn known_label_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(
        DAMAGE_COSTS
            .iter()
            .map(|(label, _)| label.to_string())
            .collect::<Vec<_>>(),
    )
}

/// Strategy for labels, mostly known, sometimes arbitrary
pub fn damage_label_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => known_label_strategy(),
        1 => "[a-z]{1,8}( [a-z]{1,8})?",
    ]
}

/// Strategy for a detector's label list, duplicates allowed
pub fn damage_labels_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(damage_label_strategy(), 0..12)
}

/// Strategy for non-blank incident descriptions
pub fn description_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z ,.]{0,120}"
}
