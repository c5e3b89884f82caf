//! PostgreSQL Claim Adapter
//!
//! Implements `ClaimRepositoryPort` on top of [`ClaimsRepository`],
//! translating between domain claims and database rows.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresClaimAdapter;
//! use domain_claims::ClaimRepositoryPort;
//! use std::sync::Arc;
//!
//! let port: Arc<dyn ClaimRepositoryPort> = Arc::new(PostgresClaimAdapter::new(pool));
//! let claims = port.list_by_owner(owner_id).await?;
//! ```

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::{debug, instrument};

use core_kernel::{
    AdapterHealth, ClaimId, DomainPort, HealthCheckResult, HealthCheckable, OwnerId, PortError,
};
use domain_claims::{
    Claim, ClaimPatch, ClaimRepositoryPort, ImageRef, NewClaim, Payout, PolicyTier,
};

use crate::error::DatabaseError;
use crate::repositories::claims::{
    ClaimRow, ClaimsRepository, DerivedFields, NewClaimRow, PolicyTier as DbPolicyTier,
};

const ADAPTER_ID: &str = "postgres-claim-adapter";

/// PostgreSQL-backed implementation of the ClaimRepositoryPort trait
///
/// Database errors are translated to `PortError` variants:
/// - `DatabaseError::NotFound` -> `PortError::NotFound`
/// - connection and pool failures -> `PortError::Connection` / `ServiceUnavailable`
/// - other errors -> `PortError::Internal`
#[derive(Debug, Clone)]
pub struct PostgresClaimAdapter {
    repository: ClaimsRepository,
    pool: PgPool,
}

impl PostgresClaimAdapter {
    /// Creates a new PostgreSQL claim adapter
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: ClaimsRepository::new(pool.clone()),
            pool,
        }
    }

    /// Returns a reference to the underlying repository
    pub fn repository(&self) -> &ClaimsRepository {
        &self.repository
    }
}

impl DomainPort for PostgresClaimAdapter {}

#[async_trait]
impl HealthCheckable for PostgresClaimAdapter {
    /// Runs `SELECT 1` against the pool
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();

        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await;

        let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        let (status, message) = match result {
            Ok(_) => (AdapterHealth::Healthy, None),
            Err(e) => (AdapterHealth::Unhealthy, Some(format!("Database error: {}", e))),
        };

        HealthCheckResult {
            adapter_id: ADAPTER_ID.to_string(),
            status,
            latency_ms,
            message,
            checked_at: Utc::now(),
        }
    }
}

#[async_trait]
impl ClaimRepositoryPort for PostgresClaimAdapter {
    #[instrument(skip(self, claim), fields(owner_id = %claim.owner_id))]
    async fn create(&self, claim: NewClaim) -> Result<ClaimId, PortError> {
        let claim_id = ClaimId::new_v7();
        let row = NewClaimRow {
            claim_id: claim_id.into(),
            owner_id: claim.owner_id.into(),
            image_ref: claim.image_ref.as_str().to_string(),
            description: claim.description,
            policy_tier: domain_to_db_tier(claim.policy_tier),
            created_at: Utc::now(),
        };

        self.repository.insert(row).await?;
        debug!(%claim_id, "Claim row inserted");
        Ok(claim_id)
    }

    #[instrument(skip(self, patch), fields(claim_id = %id))]
    async fn patch(&self, id: ClaimId, patch: ClaimPatch) -> Result<(), PortError> {
        let payout = patch
            .payout
            .map(|p| {
                i64::try_from(p.amount())
                    .map_err(|_| DatabaseError::SerializationError(format!("payout {} out of range", p)))
            })
            .transpose()?;

        let fields = DerivedFields {
            payout,
            damage_labels: patch.damage_labels,
            consistency_verdict: patch.consistency_verdict,
            summary: patch.summary,
        };

        self.repository
            .fill_derived(id.into(), fields)
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound { .. } => PortError::not_found("Claim", id),
                other => other.into(),
            })
    }

    #[instrument(skip(self), fields(claim_id = %id))]
    async fn get(&self, id: ClaimId) -> Result<Claim, PortError> {
        let row = self
            .repository
            .get_by_id(id.into())
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound { .. } => PortError::not_found("Claim", id),
                other => other.into(),
            })?;
        row_to_claim(row)
    }

    #[instrument(skip(self), fields(owner_id = %owner_id))]
    async fn list_by_owner(&self, owner_id: OwnerId) -> Result<Vec<Claim>, PortError> {
        let rows = self.repository.find_by_owner(owner_id.into()).await?;
        debug!(count = rows.len(), "Fetched claims for owner");
        rows.into_iter().map(row_to_claim).collect()
    }

    #[instrument(skip(self))]
    async fn list_all(&self) -> Result<Vec<Claim>, PortError> {
        let rows = self.repository.find_all().await?;
        debug!(count = rows.len(), "Fetched all claims");
        rows.into_iter().map(row_to_claim).collect()
    }
}

fn domain_to_db_tier(tier: PolicyTier) -> DbPolicyTier {
    match tier {
        PolicyTier::Basic => DbPolicyTier::Basic,
        PolicyTier::Standard => DbPolicyTier::Standard,
        PolicyTier::Premium => DbPolicyTier::Premium,
    }
}

fn db_to_domain_tier(tier: DbPolicyTier) -> PolicyTier {
    match tier {
        DbPolicyTier::Basic => PolicyTier::Basic,
        DbPolicyTier::Standard => PolicyTier::Standard,
        DbPolicyTier::Premium => PolicyTier::Premium,
    }
}

/// Converts a database claim row to a domain Claim
fn row_to_claim(row: ClaimRow) -> Result<Claim, PortError> {
    let payout = row
        .payout
        .map(|amount| {
            u64::try_from(amount).map(Payout::new).map_err(|_| {
                PortError::transformation(format!(
                    "claim {} has negative payout {}",
                    row.claim_id, amount
                ))
            })
        })
        .transpose()?;

    Ok(Claim {
        id: ClaimId::from(row.claim_id),
        owner_id: OwnerId::from(row.owner_id),
        image_ref: ImageRef::new(row.image_ref),
        description: row.description,
        policy_tier: db_to_domain_tier(row.policy_tier),
        damage_labels: row.damage_labels,
        payout,
        consistency_verdict: row.consistency_verdict,
        summary: row.summary,
        created_at: row.created_at,
    })
}
