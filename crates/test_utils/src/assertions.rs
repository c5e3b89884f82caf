//! Custom Test Assertions
//!
//! Assertion helpers for claims that give more useful failure messages than
//! field-by-field `assert!`s.

use domain_claims::{payout_cap, Claim, SignedClaimView};

/// Asserts that no derived field has been written
pub fn assert_unadjudicated(claim: &Claim) {
    assert!(
        claim.damage_labels.is_none()
            && claim.payout.is_none()
            && claim.consistency_verdict.is_none()
            && claim.summary.is_none(),
        "Expected claim {} without derived fields, got labels={:?} payout={:?} verdict={:?} summary={:?}",
        claim.id,
        claim.damage_labels,
        claim.payout,
        claim.consistency_verdict,
        claim.summary
    );
}

/// Asserts that every derived field is present and the payout is within cap
pub fn assert_fully_adjudicated(claim: &Claim) {
    let payout = claim
        .payout
        .unwrap_or_else(|| panic!("Expected claim {} to carry a payout", claim.id));
    assert!(claim.damage_labels.is_some(), "Claim {} has no labels", claim.id);
    assert!(claim.consistency_verdict.is_some(), "Claim {} has no verdict", claim.id);
    assert!(claim.summary.is_some(), "Claim {} has no summary", claim.id);
    assert!(
        payout <= payout_cap(claim.policy_tier),
        "Claim {} payout {} exceeds the {} cap",
        claim.id,
        payout,
        claim.policy_tier
    );
}

/// Asserts that claims are ordered newest first
pub fn assert_newest_first(claims: &[Claim]) {
    for pair in claims.windows(2) {
        assert!(
            (pair[0].created_at, pair[0].id) >= (pair[1].created_at, pair[1].id),
            "Claim {} ({}) listed before newer claim {} ({})",
            pair[0].id,
            pair[0].created_at,
            pair[1].id,
            pair[1].created_at
        );
    }
}

/// Asserts that every view carries a read URL
pub fn assert_all_signed(views: &[SignedClaimView]) {
    for view in views {
        assert!(
            view.read_url.is_some(),
            "Claim {} listed without a read URL",
            view.claim.id
        );
    }
}
