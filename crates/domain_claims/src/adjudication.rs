//! Claim adjudication pipeline
//!
//! A submission moves through a fixed sequence of stages:
//!
//! ```text
//! Uploading -> Created -> Detecting -> Estimated -> CheckingConsistency -> Summarizing -> Finalized
//! ```
//!
//! | Stage               | On failure                                         |
//! |---------------------|----------------------------------------------------|
//! | Uploading           | abort, nothing persisted                           |
//! | Created             | abort, uploaded image is orphaned                  |
//! | Detecting           | abort, claim row persists without derived fields   |
//! | Estimated           | cannot fail                                        |
//! | CheckingConsistency | verdict degrades to an empty string                |
//! | Summarizing         | summary degrades to an empty string                |
//! | Finalized           | abort, derived results are lost                    |
//!
//! The derived fields are written in a single patch at the end, so a claim
//! is either fully adjudicated or carries no derived fields at all.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{error, info, warn};

use core_kernel::ClaimId;

use crate::claim::{Caller, ClaimPatch, NewClaim, Submission};
use crate::error::ClaimError;
use crate::payout::{self, Payout};
use crate::service::{bounded, ClaimsService};

/// Stage of the adjudication pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjudicationStage {
    Uploading,
    Created,
    Detecting,
    Estimated,
    CheckingConsistency,
    Summarizing,
    Finalized,
}

impl AdjudicationStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjudicationStage::Uploading => "uploading",
            AdjudicationStage::Created => "created",
            AdjudicationStage::Detecting => "detecting",
            AdjudicationStage::Estimated => "estimated",
            AdjudicationStage::CheckingConsistency => "checking_consistency",
            AdjudicationStage::Summarizing => "summarizing",
            AdjudicationStage::Finalized => "finalized",
        }
    }
}

impl fmt::Display for AdjudicationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a completed submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Adjudication {
    pub claim_id: ClaimId,
    pub damage_labels: Vec<String>,
    /// Detector output image, raw bytes
    pub annotated_image: Vec<u8>,
    pub payout: Payout,
    /// Empty when the consistency check failed
    pub consistency_verdict: String,
    /// Empty when summary generation failed
    pub summary: String,
}

impl ClaimsService {
    /// Runs a submission through the full pipeline
    ///
    /// Every call creates a new claim; identical submissions are not
    /// deduplicated.
    pub async fn submit(
        &self,
        caller: Caller,
        submission: Submission,
    ) -> Result<Adjudication, ClaimError> {
        validate(&submission)?;
        let Submission {
            image,
            description,
            policy_tier,
        } = submission;
        let owner_id = caller.owner_id;

        info!(%owner_id, stage = %AdjudicationStage::Uploading, bytes = image.bytes.len(), "Storing crash image");
        let image_ref = bounded("object_store.put", self.timeouts.storage, self.object_store.put(&image))
            .await
            .map_err(|source| {
                error!(%owner_id, error = %source, transient = source.is_transient(), "Image upload failed");
                ClaimError::StorageWrite { source }
            })?;

        let new_claim = NewClaim {
            owner_id,
            image_ref: image_ref.clone(),
            description: description.clone(),
            policy_tier,
        };
        let claim_id = bounded("claims.create", self.timeouts.repository, self.repository.create(new_claim))
            .await
            .map_err(|source| {
                error!(
                    %owner_id,
                    %image_ref,
                    error = %source,
                    transient = source.is_transient(),
                    "Claim creation failed; image left orphaned"
                );
                ClaimError::Persistence {
                    stage: Some(AdjudicationStage::Created),
                    claim_id: None,
                    source,
                }
            })?;
        info!(%claim_id, %owner_id, stage = %AdjudicationStage::Created, %image_ref, "Claim created");

        info!(%claim_id, stage = %AdjudicationStage::Detecting, "Detecting damage");
        let detection = bounded("detector.detect", self.timeouts.detection, self.detector.detect(&image))
            .await
            .map_err(|source| {
                error!(%claim_id, error = %source, transient = source.is_transient(), "Damage analysis failed");
                ClaimError::Detection { claim_id, source }
            })?;
        let labels = detection.labels;

        let payout = payout::estimate(&labels, policy_tier);
        info!(
            %claim_id,
            stage = %AdjudicationStage::Estimated,
            labels = ?labels,
            tier = %policy_tier,
            %payout,
            "Payout estimated"
        );

        info!(%claim_id, stage = %AdjudicationStage::CheckingConsistency, "Checking description consistency");
        let consistency_verdict = self
            .assess_consistency(&description, &labels)
            .await
            .unwrap_or_else(|e| {
                warn!(%claim_id, error = %e, transient = e.is_transient(), "Consistency check failed; continuing without verdict");
                String::new()
            });

        info!(%claim_id, stage = %AdjudicationStage::Summarizing, "Generating summary");
        let summary = bounded(
            "summary.summarize",
            self.timeouts.assessment,
            self.summary.summarize(&description, &labels, policy_tier, payout),
        )
        .await
        .unwrap_or_else(|e| {
            warn!(%claim_id, error = %e, transient = e.is_transient(), "Summary generation failed; continuing without summary");
            String::new()
        });

        let patch = ClaimPatch {
            payout: Some(payout),
            damage_labels: Some(labels.clone()),
            consistency_verdict: Some(consistency_verdict.clone()),
            summary: Some(summary.clone()),
        };
        bounded("claims.patch", self.timeouts.repository, self.repository.patch(claim_id, patch))
            .await
            .map_err(|source| {
                error!(%claim_id, error = %source, transient = source.is_transient(), "Failed to persist adjudication results");
                ClaimError::Persistence {
                    stage: Some(AdjudicationStage::Finalized),
                    claim_id: Some(claim_id),
                    source,
                }
            })?;
        info!(%claim_id, stage = %AdjudicationStage::Finalized, %payout, "Claim adjudicated");

        Ok(Adjudication {
            claim_id,
            damage_labels: labels,
            annotated_image: detection.annotated_image,
            payout,
            consistency_verdict,
            summary,
        })
    }

    /// Checks a description against damage labels outside of a submission
    ///
    /// Unlike the pipeline stage, a failure here is surfaced to the caller.
    pub async fn check_consistency(
        &self,
        description: &str,
        labels: &[String],
    ) -> Result<String, ClaimError> {
        if description.trim().is_empty() {
            return Err(ClaimError::Validation("description must not be empty".to_string()));
        }
        self.assess_consistency(description, labels).await
    }

    async fn assess_consistency(
        &self,
        description: &str,
        labels: &[String],
    ) -> Result<String, ClaimError> {
        bounded(
            "consistency.check",
            self.timeouts.assessment,
            self.consistency.check(description, labels),
        )
        .await
        .map_err(|source| ClaimError::Assessment {
            stage: AdjudicationStage::CheckingConsistency,
            source,
        })
    }
}

fn validate(submission: &Submission) -> Result<(), ClaimError> {
    if submission.description.trim().is_empty() {
        return Err(ClaimError::Validation("description must not be empty".to_string()));
    }
    if submission.image.bytes.is_empty() {
        return Err(ClaimError::Validation("image must not be empty".to_string()));
    }
    Ok(())
}
