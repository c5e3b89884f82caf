//! Claims repository implementation
//!
//! Row-level access to the `claims` table. Derived adjudication fields are
//! written with `COALESCE(existing, new)`, so a value that is already stored
//! can never be replaced.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DatabaseError;

const CLAIM_COLUMNS: &str = r#"
    claim_id,
    owner_id,
    image_ref,
    description,
    policy_tier,
    damage_labels,
    payout,
    consistency_verdict,
    summary,
    created_at
"#;

/// Repository for the claims table
#[derive(Debug, Clone)]
pub struct ClaimsRepository {
    pool: PgPool,
}

impl ClaimsRepository {
    /// Creates a new ClaimsRepository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a claim with no derived fields
    pub async fn insert(&self, claim: NewClaimRow) -> Result<ClaimRow, DatabaseError> {
        let sql = format!(
            r#"
            INSERT INTO claims (claim_id, owner_id, image_ref, description, policy_tier, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {CLAIM_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, ClaimRow>(&sql)
            .bind(claim.claim_id)
            .bind(claim.owner_id)
            .bind(&claim.image_ref)
            .bind(&claim.description)
            .bind(claim.policy_tier)
            .bind(claim.created_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(row)
    }

    /// Fills derived fields that are still NULL
    ///
    /// `None` arguments leave the column untouched.
    pub async fn fill_derived(&self, claim_id: Uuid, fields: DerivedFields) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE claims SET
                payout              = COALESCE(payout, $2),
                damage_labels       = COALESCE(damage_labels, $3),
                consistency_verdict = COALESCE(consistency_verdict, $4),
                summary             = COALESCE(summary, $5)
            WHERE claim_id = $1
            "#,
        )
        .bind(claim_id)
        .bind(fields.payout)
        .bind(fields.damage_labels)
        .bind(fields.consistency_verdict)
        .bind(fields.summary)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Claim", claim_id));
        }
        Ok(())
    }

    /// Retrieves a claim by its identifier
    pub async fn get_by_id(&self, claim_id: Uuid) -> Result<ClaimRow, DatabaseError> {
        let sql = format!("SELECT {CLAIM_COLUMNS} FROM claims WHERE claim_id = $1");

        sqlx::query_as::<_, ClaimRow>(&sql)
            .bind(claim_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Claim", claim_id))
    }

    /// Claims of one owner, newest first
    pub async fn find_by_owner(&self, owner_id: Uuid) -> Result<Vec<ClaimRow>, DatabaseError> {
        let sql = format!(
            "SELECT {CLAIM_COLUMNS} FROM claims WHERE owner_id = $1 ORDER BY created_at DESC, claim_id DESC"
        );

        let rows = sqlx::query_as::<_, ClaimRow>(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    /// Every claim, newest first
    pub async fn find_all(&self) -> Result<Vec<ClaimRow>, DatabaseError> {
        let sql = format!("SELECT {CLAIM_COLUMNS} FROM claims ORDER BY created_at DESC, claim_id DESC");

        let rows = sqlx::query_as::<_, ClaimRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }
}

/// Database enum for policy tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "policy_tier", rename_all = "snake_case")]
pub enum PolicyTier {
    Basic,
    Standard,
    Premium,
}

/// Database row for a claim
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ClaimRow {
    pub claim_id: Uuid,
    pub owner_id: Uuid,
    pub image_ref: String,
    pub description: String,
    pub policy_tier: PolicyTier,
    pub damage_labels: Option<Vec<String>>,
    pub payout: Option<i64>,
    pub consistency_verdict: Option<String>,
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Data for inserting a new claim
#[derive(Debug, Clone)]
pub struct NewClaimRow {
    pub claim_id: Uuid,
    pub owner_id: Uuid,
    pub image_ref: String,
    pub description: String,
    pub policy_tier: PolicyTier,
    pub created_at: DateTime<Utc>,
}

/// Adjudication results to store
#[derive(Debug, Clone, Default)]
pub struct DerivedFields {
    pub payout: Option<i64>,
    pub damage_labels: Option<Vec<String>>,
    pub consistency_verdict: Option<String>,
    pub summary: Option<String>,
}
