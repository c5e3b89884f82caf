//! Shared port plumbing
//!
//! Foundational types for the hexagonal architecture used by the claims
//! pipeline. The domain defines port traits for each external collaborator
//! (object store, claim repository, damage detector, language-model
//! assessors); adapters in `infra_db` and `infra_external` implement them.
//!
//! | Port                    | Adapter                          |
//! |-------------------------|----------------------------------|
//! | `ObjectStorePort`       | `infra_external::RestObjectStore` |
//! | `ClaimRepositoryPort`   | `infra_db::PostgresClaimAdapter` |
//! | `DamageDetectorPort`    | `infra_external::HttpDamageDetector` |
//! | `ConsistencyCheckPort`  | `infra_external::VertexConsistencyChecker` |
//! | `SummaryGeneratorPort`  | `infra_external::GeminiSummaryGenerator` |
//!
//! Adapters report failures as [`PortError`]. The orchestrator decides what
//! a failure means for the claim based on the stage that produced it.

use std::fmt;
use std::time::Duration;
use thiserror::Error;
use serde::{Deserialize, Serialize};

/// Failure reported by any adapter
///
/// The variants describe what went wrong at the boundary, not what it means
/// for a claim; `domain_claims::ClaimError` attaches the stage.
#[derive(Debug, Error)]
pub enum PortError {
    /// Missing claim row or stored object
    #[error("Not found: {entity_type} with id {id}")]
    NotFound {
        entity_type: String,
        id: String,
    },

    /// Input the collaborator refused
    #[error("Validation error: {message}")]
    Validation {
        message: String,
    },

    /// Transport failure before a response arrived
    #[error("Connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Call exceeded its stage limit
    #[error("Timeout after {duration_ms}ms: {operation}")]
    Timeout {
        operation: String,
        duration_ms: u64,
    },

    /// Bad service key, API key or access token
    #[error("Unauthorized: {message}")]
    Unauthorized {
        message: String,
    },

    /// HTTP 429
    #[error("Rate limited by {service}")]
    RateLimited {
        service: String,
    },

    /// 5xx or otherwise unusable upstream
    #[error("Service unavailable: {service} ({message})")]
    ServiceUnavailable {
        service: String,
        message: String,
    },

    /// Response body did not have the expected shape
    #[error("Transformation error: {message}")]
    Transformation {
        message: String,
    },

    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl PortError {
    pub fn not_found(entity_type: impl Into<String>, id: impl fmt::Display) -> Self {
        PortError::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        PortError::Validation {
            message: message.into(),
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        PortError::Connection {
            message: message.into(),
            source: None,
        }
    }

    /// `operation` took longer than `limit`
    pub fn timeout(operation: impl Into<String>, limit: Duration) -> Self {
        PortError::Timeout {
            operation: operation.into(),
            duration_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        PortError::Unauthorized {
            message: message.into(),
        }
    }

    pub fn unavailable(service: impl Into<String>, message: impl Into<String>) -> Self {
        PortError::ServiceUnavailable {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn transformation(message: impl Into<String>) -> Self {
        PortError::Transformation {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        PortError::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Whether a later attempt could succeed. Reported as the `transient`
    /// field on failure logs; the pipeline never retries.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PortError::Connection { .. }
                | PortError::Timeout { .. }
                | PortError::RateLimited { .. }
                | PortError::ServiceUnavailable { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PortError::NotFound { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, PortError::Timeout { .. })
    }
}

/// Supertrait of every port; adapters live behind `Arc<dyn _>`
pub trait DomainPort: Send + Sync + 'static {}

/// Coarse adapter state reported by `/health/ready`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterHealth {
    Healthy,
    /// Answering, but slowly
    Degraded,
    Unhealthy,
    Unknown,
}

/// One health check of one adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    /// e.g. `postgres-claim-adapter`
    pub adapter_id: String,
    pub status: AdapterHealth,
    /// Round trip of the check itself
    pub latency_ms: u64,
    pub message: Option<String>,
    pub checked_at: chrono::DateTime<chrono::Utc>,
}

impl HealthCheckResult {
    /// Healthy or degraded
    pub fn is_operational(&self) -> bool {
        matches!(self.status, AdapterHealth::Healthy | AdapterHealth::Degraded)
    }
}

/// Adapters that can check their backing system
#[async_trait::async_trait]
pub trait HealthCheckable: Send + Sync {
    async fn health_check(&self) -> HealthCheckResult;
}
