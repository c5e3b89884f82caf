//! Claim listing with freshly signed image URLs
//!
//! Each listing signs one read URL per claim, concurrently. URLs are never
//! cached; every request issues new ones. A claim whose image cannot be
//! signed is still listed, with no URL.

use futures::future::join_all;
use std::time::Duration;
use tracing::{error, warn};

use crate::claim::{Caller, Claim, SignedClaimView};
use crate::error::ClaimError;
use crate::service::{bounded, ClaimsService};

/// Lifetime of a signed image URL
pub const SIGNED_URL_TTL: Duration = Duration::from_secs(3600);

impl ClaimsService {
    /// Claims submitted by the caller, newest first
    pub async fn list_own(&self, caller: Caller) -> Result<Vec<SignedClaimView>, ClaimError> {
        let owner_id = caller.owner_id;
        let claims = bounded(
            "claims.list_by_owner",
            self.timeouts.repository,
            self.repository.list_by_owner(owner_id),
        )
        .await
        .map_err(|source| {
            error!(%owner_id, error = %source, "Failed to list claims");
            ClaimError::Persistence {
                stage: None,
                claim_id: None,
                source,
            }
        })?;

        Ok(self.sign_all(claims).await)
    }

    /// Every claim, newest first
    ///
    /// Callers must have established that the requester is an administrator.
    pub async fn list_all(&self) -> Result<Vec<SignedClaimView>, ClaimError> {
        let claims = bounded("claims.list_all", self.timeouts.repository, self.repository.list_all())
            .await
            .map_err(|source| {
                error!(error = %source, "Failed to list all claims");
                ClaimError::Persistence {
                    stage: None,
                    claim_id: None,
                    source,
                }
            })?;

        Ok(self.sign_all(claims).await)
    }

    /// `join_all` yields results in input order, so the repository's
    /// ordering survives whatever order the signatures complete in.
    async fn sign_all(&self, claims: Vec<Claim>) -> Vec<SignedClaimView> {
        join_all(claims.into_iter().map(|claim| self.sign_one(claim))).await
    }

    async fn sign_one(&self, claim: Claim) -> SignedClaimView {
        let signed = bounded(
            "object_store.sign_read",
            self.timeouts.signing,
            self.object_store.sign_read(&claim.image_ref, SIGNED_URL_TTL),
        )
        .await
        .map_err(|source| ClaimError::StorageRead {
            image_ref: claim.image_ref.to_string(),
            source,
        });

        let read_url = match signed {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(claim_id = %claim.id, error = %e, transient = e.is_transient(), "Listing claim without image URL");
                None
            }
        };

        SignedClaimView { claim, read_url }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use core_kernel::OwnerId;

    use crate::claim::{ImageRef, NewClaim, PolicyTier};
    use crate::ports::mock::*;
    use crate::ports::ClaimRepositoryPort;

    #[tokio::test]
    async fn test_missing_image_lists_without_url() {
        let store = Arc::new(InMemoryObjectStore::new());
        let repo = Arc::new(InMemoryClaimRepository::new());
        let owner = OwnerId::new();
        repo.create(NewClaim {
            owner_id: owner,
            image_ref: ImageRef::new("gone.png"),
            description: "Cracked windscreen".to_string(),
            policy_tier: PolicyTier::Premium,
        })
        .await
        .unwrap();

        let service = ClaimsService::new(
            store,
            repo,
            Arc::new(ScriptedDetector::detecting(&[])),
            Arc::new(ScriptedConsistencyChecker::answering("")),
            Arc::new(ScriptedSummaryGenerator::answering("")),
        );

        let views = service.list_own(Caller::new(owner)).await.unwrap();
        assert_eq!(views.len(), 1);
        assert!(views[0].read_url.is_none());
    }

    #[test]
    fn test_ttl_is_one_hour() {
        assert_eq!(SIGNED_URL_TTL.as_secs(), 3600);
    }
}
