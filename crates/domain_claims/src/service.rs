//! Claims service
//!
//! [`ClaimsService`] owns the adapters for every collaborator of the
//! pipeline. Submission lives in [`crate::adjudication`], listing in
//! [`crate::listing`]; both are implemented as methods on this type.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use core_kernel::{HealthCheckResult, PortError};

use crate::ports::{
    ClaimRepositoryPort, ConsistencyCheckPort, DamageDetectorPort, ObjectStorePort,
    SummaryGeneratorPort,
};

/// Upper bounds for each kind of external call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineTimeouts {
    /// Image upload
    pub storage: Duration,
    /// Claim row create, patch and listing
    pub repository: Duration,
    /// Damage detection
    pub detection: Duration,
    /// Consistency check and summary generation, each
    pub assessment: Duration,
    /// Issuing one read URL
    pub signing: Duration,
}

impl Default for PipelineTimeouts {
    fn default() -> Self {
        Self {
            storage: Duration::from_secs(30),
            repository: Duration::from_secs(30),
            detection: Duration::from_secs(60),
            assessment: Duration::from_secs(60),
            signing: Duration::from_secs(10),
        }
    }
}

/// Orchestrator for claim submission and listing
#[derive(Clone)]
pub struct ClaimsService {
    pub(crate) object_store: Arc<dyn ObjectStorePort>,
    pub(crate) repository: Arc<dyn ClaimRepositoryPort>,
    pub(crate) detector: Arc<dyn DamageDetectorPort>,
    pub(crate) consistency: Arc<dyn ConsistencyCheckPort>,
    pub(crate) summary: Arc<dyn SummaryGeneratorPort>,
    pub(crate) timeouts: PipelineTimeouts,
}

impl ClaimsService {
    /// Creates a service with default timeouts
    pub fn new(
        object_store: Arc<dyn ObjectStorePort>,
        repository: Arc<dyn ClaimRepositoryPort>,
        detector: Arc<dyn DamageDetectorPort>,
        consistency: Arc<dyn ConsistencyCheckPort>,
        summary: Arc<dyn SummaryGeneratorPort>,
    ) -> Self {
        Self {
            object_store,
            repository,
            detector,
            consistency,
            summary,
            timeouts: PipelineTimeouts::default(),
        }
    }

    /// Replaces the timeouts applied to external calls
    pub fn with_timeouts(mut self, timeouts: PipelineTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn timeouts(&self) -> PipelineTimeouts {
        self.timeouts
    }

    /// Health of the claim repository, for the readiness check
    pub async fn repository_health(&self) -> HealthCheckResult {
        self.repository.health_check().await
    }
}

impl std::fmt::Debug for ClaimsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaimsService")
            .field("timeouts", &self.timeouts)
            .finish_non_exhaustive()
    }
}

/// Runs an external call, failing with `PortError::Timeout` once `limit`
/// elapses. The abandoned call is dropped.
pub(crate) async fn bounded<T, F>(operation: &str, limit: Duration, call: F) -> Result<T, PortError>
where
    F: Future<Output = Result<T, PortError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(PortError::timeout(operation, limit)),
    }
}
