//! Claim aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{ClaimId, OwnerId};
use crate::payout::Payout;

/// Policy tier purchased by the claimant
///
/// The tier is fixed at submission time and determines the payout cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolicyTier {
    Basic,
    Standard,
    Premium,
}

impl PolicyTier {
    /// All tiers, in ascending order of cover
    pub const ALL: [PolicyTier; 3] = [PolicyTier::Basic, PolicyTier::Standard, PolicyTier::Premium];

    /// Returns the tier name as shown to users and stored in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyTier::Basic => "Basic",
            PolicyTier::Standard => "Standard",
            PolicyTier::Premium => "Premium",
        }
    }
}

impl fmt::Display for PolicyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Basic" => Ok(PolicyTier::Basic),
            "Standard" => Ok(PolicyTier::Standard),
            "Premium" => Ok(PolicyTier::Premium),
            other => Err(format!(
                "unknown policy tier '{}', expected Basic, Standard or Premium",
                other
            )),
        }
    }
}

/// Object-store key of an uploaded crash image
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw image as received from the submitter
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl ImageUpload {
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            bytes,
            content_type: content_type.into(),
        }
    }

    /// File extension derived from the content type
    pub fn extension(&self) -> &'static str {
        let essence = self
            .content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "image/png" => "png",
            "image/jpeg" | "image/jpg" => "jpg",
            "image/gif" => "gif",
            "image/webp" => "webp",
            _ => "bin",
        }
    }
}

/// Identity of whoever is calling into the pipeline
///
/// Resolved by the identity collaborator and handed in explicitly; pipeline
/// components never look up session state themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub owner_id: OwnerId,
}

impl Caller {
    pub fn new(owner_id: OwnerId) -> Self {
        Self { owner_id }
    }
}

/// A claim submission as received from the caller
#[derive(Debug, Clone)]
pub struct Submission {
    pub image: ImageUpload,
    pub description: String,
    pub policy_tier: PolicyTier,
}

/// Data for creating a new claim row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewClaim {
    pub owner_id: OwnerId,
    pub image_ref: ImageRef,
    pub description: String,
    pub policy_tier: PolicyTier,
}

/// Partial update carrying adjudication results
///
/// Fields left as `None` are not touched. Fields that are already set on the
/// stored claim are never overwritten.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimPatch {
    pub payout: Option<Payout>,
    pub damage_labels: Option<Vec<String>>,
    pub consistency_verdict: Option<String>,
    pub summary: Option<String>,
}

impl ClaimPatch {
    /// Returns true when the patch carries no fields
    pub fn is_empty(&self) -> bool {
        self.payout.is_none()
            && self.damage_labels.is_none()
            && self.consistency_verdict.is_none()
            && self.summary.is_none()
    }
}

/// A submitted damage claim and its adjudication state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// Unique identifier
    pub id: ClaimId,
    /// Submitting user
    pub owner_id: OwnerId,
    /// Object-store key of the original upload
    pub image_ref: ImageRef,
    /// Incident description supplied by the user
    pub description: String,
    /// Tier of the claimant's policy
    pub policy_tier: PolicyTier,
    /// Damage categories detected in the image
    pub damage_labels: Option<Vec<String>>,
    /// Capped payout estimate
    pub payout: Option<Payout>,
    /// Whether the description matches the detected damage, in prose
    pub consistency_verdict: Option<String>,
    /// Claim summary in prose
    pub summary: Option<String>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

impl Claim {
    /// Creates a claim with no derived fields
    pub fn submitted(id: ClaimId, new_claim: NewClaim, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            owner_id: new_claim.owner_id,
            image_ref: new_claim.image_ref,
            description: new_claim.description,
            policy_tier: new_claim.policy_tier,
            damage_labels: None,
            payout: None,
            consistency_verdict: None,
            summary: None,
            created_at,
        }
    }

    /// Applies a patch without overwriting fields that are already set
    pub fn apply_patch(&mut self, patch: ClaimPatch) {
        fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
            if slot.is_none() {
                *slot = value;
            }
        }

        fill(&mut self.payout, patch.payout);
        fill(&mut self.damage_labels, patch.damage_labels);
        fill(&mut self.consistency_verdict, patch.consistency_verdict);
        fill(&mut self.summary, patch.summary);
    }

    /// Returns true once the payout has been persisted
    pub fn is_adjudicated(&self) -> bool {
        self.payout.is_some()
    }
}

/// A claim plus a freshly signed, time-limited read URL for its image
///
/// Never persisted or cached. `read_url` is `None` when signing failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedClaimView {
    pub claim: Claim,
    pub read_url: Option<String>,
}
