//! Claims DTOs

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use core_kernel::{ClaimId, OwnerId};
use domain_claims::{Adjudication, PolicyTier, SignedClaimView};

/// Result of a successful submission
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitClaimResponse {
    pub claim_id: ClaimId,
    pub damage_labels: Vec<String>,
    /// Annotated image, base64
    pub annotated_image: String,
    pub payout: u64,
    pub consistency_verdict: String,
    pub summary: String,
}

impl From<Adjudication> for SubmitClaimResponse {
    fn from(adjudication: Adjudication) -> Self {
        Self {
            claim_id: adjudication.claim_id,
            damage_labels: adjudication.damage_labels,
            annotated_image: STANDARD.encode(&adjudication.annotated_image),
            payout: adjudication.payout.amount(),
            consistency_verdict: adjudication.consistency_verdict,
            summary: adjudication.summary,
        }
    }
}

/// A claim as shown in listings
///
/// `payout` is `null` while the claim is pending.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimView {
    pub claim_id: ClaimId,
    pub owner_id: OwnerId,
    pub description: String,
    pub policy_tier: PolicyTier,
    pub image_ref: String,
    /// Short-lived image URL; `null` when signing failed
    pub read_url: Option<String>,
    pub damage_labels: Option<Vec<String>>,
    pub payout: Option<u64>,
    pub consistency_verdict: Option<String>,
    pub summary: Option<String>,
    pub adjudicated: bool,
    pub created_at: DateTime<Utc>,
}

impl From<SignedClaimView> for ClaimView {
    fn from(view: SignedClaimView) -> Self {
        let adjudicated = view.claim.is_adjudicated();
        let claim = view.claim;
        Self {
            claim_id: claim.id,
            owner_id: claim.owner_id,
            description: claim.description,
            policy_tier: claim.policy_tier,
            image_ref: claim.image_ref.as_str().to_string(),
            read_url: view.read_url,
            damage_labels: claim.damage_labels,
            payout: claim.payout.map(|p| p.amount()),
            consistency_verdict: claim.consistency_verdict,
            summary: claim.summary,
            adjudicated,
            created_at: claim.created_at,
        }
    }
}

/// Standalone consistency check
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ValidateClaimRequest {
    #[validate(length(min = 1, message = "description must not be empty"))]
    pub description: String,
    #[serde(default)]
    pub damage_types: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ValidateClaimResponse {
    pub validation: String,
}
