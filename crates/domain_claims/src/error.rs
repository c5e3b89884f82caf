//! Claims domain errors
//!
//! Adapters report [`PortError`]s; the orchestrator classifies them by the
//! stage that produced them. A timeout while signing is a `StorageRead`
//! failure, the same timeout while detecting is a `Detection` failure.

use thiserror::Error;

use core_kernel::{ClaimId, PortError};
use crate::adjudication::AdjudicationStage;

/// Errors surfaced by the claims service
#[derive(Debug, Error)]
pub enum ClaimError {
    /// The submission was rejected before anything was written
    #[error("Invalid submission: {0}")]
    Validation(String),

    /// The image could not be written to the object store
    #[error("Failed to store image: {source}")]
    StorageWrite {
        #[source]
        source: PortError,
    },

    /// A read URL could not be issued for a stored image
    #[error("Failed to sign image '{image_ref}': {source}")]
    StorageRead {
        image_ref: String,
        #[source]
        source: PortError,
    },

    /// The claim row could not be created, patched or read
    #[error("Claim persistence failed: {source}")]
    Persistence {
        stage: Option<AdjudicationStage>,
        claim_id: Option<ClaimId>,
        #[source]
        source: PortError,
    },

    /// The damage detector failed; the claim row exists without results
    #[error("Analysis failed for claim {claim_id}: {source}")]
    Detection {
        claim_id: ClaimId,
        #[source]
        source: PortError,
    },

    /// A language-model assessment failed
    #[error("Assessment failed during {stage}: {source}")]
    Assessment {
        stage: AdjudicationStage,
        #[source]
        source: PortError,
    },
}

impl ClaimError {
    /// Stage of the pipeline the error belongs to, if any
    pub fn stage(&self) -> Option<AdjudicationStage> {
        match self {
            ClaimError::Validation(_) => None,
            ClaimError::StorageWrite { .. } => Some(AdjudicationStage::Uploading),
            ClaimError::StorageRead { .. } => None,
            ClaimError::Persistence { stage, .. } => *stage,
            ClaimError::Detection { .. } => Some(AdjudicationStage::Detecting),
            ClaimError::Assessment { stage, .. } => Some(*stage),
        }
    }

    /// Claim row left behind by a failed submission, if one was created
    pub fn claim_id(&self) -> Option<ClaimId> {
        match self {
            ClaimError::Detection { claim_id, .. } => Some(*claim_id),
            ClaimError::Persistence { claim_id, .. } => *claim_id,
            _ => None,
        }
    }

    /// The adapter failure behind this error; `None` for rejected input
    pub fn port_error(&self) -> Option<&PortError> {
        match self {
            ClaimError::Validation(_) => None,
            ClaimError::StorageWrite { source }
            | ClaimError::StorageRead { source, .. }
            | ClaimError::Persistence { source, .. }
            | ClaimError::Detection { source, .. }
            | ClaimError::Assessment { source, .. } => Some(source),
        }
    }

    /// Returns true if the failure came from an external call timing out
    pub fn is_timeout(&self) -> bool {
        self.port_error().is_some_and(PortError::is_timeout)
    }

    pub fn is_transient(&self) -> bool {
        self.port_error().is_some_and(PortError::is_transient)
    }
}
