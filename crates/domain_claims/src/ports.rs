//! Claims Domain Ports
//!
//! Port interfaces for every external collaborator of the adjudication
//! pipeline. Production adapters live in `infra_db` (claim repository) and
//! `infra_external` (object store, detector, assessors); the in-memory
//! adapters in [`mock`] back unit and integration tests.
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_claims::{ClaimsService, ports::*};
//! use std::sync::Arc;
//!
//! let service = ClaimsService::new(
//!     Arc::new(RestObjectStore::new(storage_config)?),
//!     Arc::new(PgClaimRepository::new(pool)),
//!     Arc::new(HttpDamageDetector::new(detector_config)?),
//!     Arc::new(VertexConsistencyChecker::new(vertex_config, token_source)?),
//!     Arc::new(GeminiSummaryGenerator::new(gemini_config)?),
//! );
//! ```

use async_trait::async_trait;
use std::time::Duration;

use core_kernel::{ClaimId, DomainPort, HealthCheckable, OwnerId, PortError};

use crate::claim::{Claim, ClaimPatch, ImageRef, ImageUpload, NewClaim, PolicyTier};
use crate::payout::Payout;

/// Blob storage for crash images
#[async_trait]
pub trait ObjectStorePort: DomainPort {
    /// Durably writes the image and returns its key
    async fn put(&self, image: &ImageUpload) -> Result<ImageRef, PortError>;

    /// Issues a read URL for a stored image, valid for `ttl`
    ///
    /// Fails with `PortError::NotFound` when the key does not exist.
    async fn sign_read(&self, image_ref: &ImageRef, ttl: Duration) -> Result<String, PortError>;
}

/// Row store for claims
///
/// Listing operations return claims newest first. Authorization for
/// `list_all` is decided by the caller, never here.
#[async_trait]
pub trait ClaimRepositoryPort: DomainPort + HealthCheckable {
    /// Creates a claim with no derived fields
    async fn create(&self, claim: NewClaim) -> Result<ClaimId, PortError>;

    /// Applies a partial update
    ///
    /// Fields absent from the patch are left alone, and fields already set
    /// on the stored claim are never overwritten.
    async fn patch(&self, id: ClaimId, patch: ClaimPatch) -> Result<(), PortError>;

    /// Retrieves a single claim
    async fn get(&self, id: ClaimId) -> Result<Claim, PortError>;

    /// Claims submitted by one owner, newest first
    async fn list_by_owner(&self, owner_id: OwnerId) -> Result<Vec<Claim>, PortError>;

    /// Every claim, newest first
    async fn list_all(&self) -> Result<Vec<Claim>, PortError>;
}

/// Output of the damage detection model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    /// Damage categories, in the order the model reported them
    pub labels: Vec<String>,
    /// The input image with detections drawn on it
    pub annotated_image: Vec<u8>,
}

/// Vision model that detects damage categories in a crash image
#[async_trait]
pub trait DamageDetectorPort: DomainPort {
    async fn detect(&self, image: &ImageUpload) -> Result<Detection, PortError>;
}

/// Language-model check of the description against the detected damage
#[async_trait]
pub trait ConsistencyCheckPort: DomainPort {
    /// Returns the model's verdict as prose
    async fn check(&self, description: &str, labels: &[String]) -> Result<String, PortError>;
}

/// Language-model summary of an adjudicated claim
#[async_trait]
pub trait SummaryGeneratorPort: DomainPort {
    /// Returns the summary as prose; empty when the model produced none
    async fn summarize(
        &self,
        description: &str,
        labels: &[String],
        tier: PolicyTier,
        payout: Payout,
    ) -> Result<String, PortError>;
}

/// In-memory implementations of the claims ports for testing
///
/// Each adapter can be scripted to succeed, fail, or hang so tests can walk
/// the pipeline's failure policy stage by stage.
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::sync::{RwLock, Semaphore};

    use core_kernel::{AdapterHealth, HealthCheckResult};

    /// Scripted outcome of a mock call
    #[derive(Debug, Clone)]
    pub enum Scripted<T> {
        /// Return this value
        Succeed(T),
        /// Fail with a service-unavailable error carrying this message
        Fail(String),
        /// Never return
        Hang,
    }

    impl<T: Clone> Scripted<T> {
        async fn play(&self, service: &str) -> Result<T, PortError> {
            match self {
                Scripted::Succeed(value) => Ok(value.clone()),
                Scripted::Fail(message) => Err(PortError::unavailable(service, message.clone())),
                Scripted::Hang => {
                    std::future::pending::<()>().await;
                    Err(PortError::internal("unreachable"))
                }
            }
        }
    }

    fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
        mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// In-memory object store
    #[derive(Debug, Default)]
    pub struct InMemoryObjectStore {
        objects: RwLock<HashMap<String, Vec<u8>>>,
        sign_delays: Mutex<HashMap<String, Duration>>,
        fail_puts: AtomicBool,
        sequence: AtomicUsize,
    }

    impl InMemoryObjectStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Makes every subsequent `put` fail
        pub fn fail_puts(&self) {
            self.fail_puts.store(true, Ordering::SeqCst);
        }

        /// Delays signing of one key, to reorder concurrent completions
        pub fn delay_signing(&self, image_ref: &ImageRef, delay: Duration) {
            lock(&self.sign_delays).insert(image_ref.as_str().to_string(), delay);
        }

        /// Removes an object, so signing it fails with not-found
        pub async fn remove(&self, image_ref: &ImageRef) {
            self.objects.write().await.remove(image_ref.as_str());
        }

        pub async fn object_count(&self) -> usize {
            self.objects.read().await.len()
        }

        pub async fn contains(&self, image_ref: &ImageRef) -> bool {
            self.objects.read().await.contains_key(image_ref.as_str())
        }
    }

    impl DomainPort for InMemoryObjectStore {}

    #[async_trait]
    impl ObjectStorePort for InMemoryObjectStore {
        async fn put(&self, image: &ImageUpload) -> Result<ImageRef, PortError> {
            if self.fail_puts.load(Ordering::SeqCst) {
                return Err(PortError::unavailable("object-store", "quota exceeded"));
            }
            let n = self.sequence.fetch_add(1, Ordering::SeqCst);
            let key = format!("{:08}.{}", n, image.extension());
            self.objects.write().await.insert(key.clone(), image.bytes.clone());
            Ok(ImageRef::new(key))
        }

        async fn sign_read(&self, image_ref: &ImageRef, ttl: Duration) -> Result<String, PortError> {
            let delay = lock(&self.sign_delays).get(image_ref.as_str()).copied();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if !self.objects.read().await.contains_key(image_ref.as_str()) {
                return Err(PortError::not_found("Object", image_ref));
            }
            Ok(format!(
                "memory://crash-images/{}?expires_in={}",
                image_ref,
                ttl.as_secs()
            ))
        }
    }

    /// In-memory claim repository
    #[derive(Debug, Default)]
    pub struct InMemoryClaimRepository {
        claims: RwLock<HashMap<ClaimId, Claim>>,
        fail_creates: AtomicBool,
        fail_patches: AtomicBool,
        patch_count: AtomicUsize,
    }

    impl InMemoryClaimRepository {
        pub fn new() -> Self {
            Self::default()
        }

        /// Makes every subsequent `create` fail
        pub fn fail_creates(&self) {
            self.fail_creates.store(true, Ordering::SeqCst);
        }

        /// Makes every subsequent `patch` fail
        pub fn fail_patches(&self) {
            self.fail_patches.store(true, Ordering::SeqCst);
        }

        /// Number of patches applied successfully
        pub fn patch_count(&self) -> usize {
            self.patch_count.load(Ordering::SeqCst)
        }

        pub async fn len(&self) -> usize {
            self.claims.read().await.len()
        }

        pub async fn is_empty(&self) -> bool {
            self.claims.read().await.is_empty()
        }

        fn newest_first(mut claims: Vec<Claim>) -> Vec<Claim> {
            claims.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
            claims
        }
    }

    impl DomainPort for InMemoryClaimRepository {}

    #[async_trait]
    impl HealthCheckable for InMemoryClaimRepository {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult {
                adapter_id: "in-memory-claims".to_string(),
                status: AdapterHealth::Healthy,
                latency_ms: 0,
                message: Some("Mock adapter always healthy".to_string()),
                checked_at: Utc::now(),
            }
        }
    }

    #[async_trait]
    impl ClaimRepositoryPort for InMemoryClaimRepository {
        async fn create(&self, claim: NewClaim) -> Result<ClaimId, PortError> {
            if self.fail_creates.load(Ordering::SeqCst) {
                return Err(PortError::connection("claims table unavailable"));
            }
            let id = ClaimId::new_v7();
            self.claims
                .write()
                .await
                .insert(id, Claim::submitted(id, claim, Utc::now()));
            Ok(id)
        }

        async fn patch(&self, id: ClaimId, patch: ClaimPatch) -> Result<(), PortError> {
            if self.fail_patches.load(Ordering::SeqCst) {
                return Err(PortError::connection("claims table unavailable"));
            }
            let mut claims = self.claims.write().await;
            let claim = claims
                .get_mut(&id)
                .ok_or_else(|| PortError::not_found("Claim", id))?;
            claim.apply_patch(patch);
            self.patch_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn get(&self, id: ClaimId) -> Result<Claim, PortError> {
            self.claims
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Claim", id))
        }

        async fn list_by_owner(&self, owner_id: OwnerId) -> Result<Vec<Claim>, PortError> {
            let claims = self.claims.read().await;
            Ok(Self::newest_first(
                claims
                    .values()
                    .filter(|c| c.owner_id == owner_id)
                    .cloned()
                    .collect(),
            ))
        }

        async fn list_all(&self) -> Result<Vec<Claim>, PortError> {
            let claims = self.claims.read().await;
            Ok(Self::newest_first(claims.values().cloned().collect()))
        }
    }

    /// Scripted damage detector
    ///
    /// A gated detector waits for [`ScriptedDetector::release`] before
    /// answering, so tests can observe the claim mid-pipeline.
    #[derive(Debug)]
    pub struct ScriptedDetector {
        outcome: Scripted<Detection>,
        gate: Option<Arc<Semaphore>>,
        calls: AtomicUsize,
    }

    impl ScriptedDetector {
        pub fn new(outcome: Scripted<Detection>) -> Self {
            Self {
                outcome,
                gate: None,
                calls: AtomicUsize::new(0),
            }
        }

        /// Detects the given labels and returns a fixed annotated image
        pub fn detecting(labels: &[&str]) -> Self {
            Self::new(Scripted::Succeed(Detection {
                labels: labels.iter().map(|l| l.to_string()).collect(),
                annotated_image: b"annotated".to_vec(),
            }))
        }

        pub fn failing(message: &str) -> Self {
            Self::new(Scripted::Fail(message.to_string()))
        }

        pub fn hanging() -> Self {
            Self::new(Scripted::Hang)
        }

        /// Holds every detection until released
        pub fn gated(mut self) -> Self {
            self.gate = Some(Arc::new(Semaphore::new(0)));
            self
        }

        /// Lets one held detection proceed
        pub fn release(&self) {
            if let Some(gate) = &self.gate {
                gate.add_permits(1);
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl DomainPort for ScriptedDetector {}

    #[async_trait]
    impl DamageDetectorPort for ScriptedDetector {
        async fn detect(&self, _image: &ImageUpload) -> Result<Detection, PortError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                let permit = gate
                    .acquire()
                    .await
                    .map_err(|_| PortError::internal("detector gate closed"))?;
                permit.forget();
            }
            self.outcome.play("damage-detector").await
        }
    }

    /// Scripted consistency checker recording its inputs
    #[derive(Debug)]
    pub struct ScriptedConsistencyChecker {
        outcome: Scripted<String>,
        calls: Mutex<Vec<(String, Vec<String>)>>,
    }

    impl ScriptedConsistencyChecker {
        pub fn new(outcome: Scripted<String>) -> Self {
            Self {
                outcome,
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn answering(verdict: &str) -> Self {
            Self::new(Scripted::Succeed(verdict.to_string()))
        }

        pub fn failing(message: &str) -> Self {
            Self::new(Scripted::Fail(message.to_string()))
        }

        pub fn calls(&self) -> Vec<(String, Vec<String>)> {
            lock(&self.calls).clone()
        }
    }

    impl DomainPort for ScriptedConsistencyChecker {}

    #[async_trait]
    impl ConsistencyCheckPort for ScriptedConsistencyChecker {
        async fn check(&self, description: &str, labels: &[String]) -> Result<String, PortError> {
            lock(&self.calls).push((description.to_string(), labels.to_vec()));
            self.outcome.play("consistency-checker").await
        }
    }

    /// Inputs received by the scripted summary generator
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SummaryCall {
        pub description: String,
        pub labels: Vec<String>,
        pub tier: PolicyTier,
        pub payout: Payout,
    }

    /// Scripted summary generator recording its inputs
    #[derive(Debug)]
    pub struct ScriptedSummaryGenerator {
        outcome: Scripted<String>,
        calls: Mutex<Vec<SummaryCall>>,
    }

    impl ScriptedSummaryGenerator {
        pub fn new(outcome: Scripted<String>) -> Self {
            Self {
                outcome,
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn answering(summary: &str) -> Self {
            Self::new(Scripted::Succeed(summary.to_string()))
        }

        pub fn failing(message: &str) -> Self {
            Self::new(Scripted::Fail(message.to_string()))
        }

        pub fn hanging() -> Self {
            Self::new(Scripted::Hang)
        }

        pub fn calls(&self) -> Vec<SummaryCall> {
            lock(&self.calls).clone()
        }
    }

    impl DomainPort for ScriptedSummaryGenerator {}

    #[async_trait]
    impl SummaryGeneratorPort for ScriptedSummaryGenerator {
        async fn summarize(
            &self,
            description: &str,
            labels: &[String],
            tier: PolicyTier,
            payout: Payout,
        ) -> Result<String, PortError> {
            lock(&self.calls).push(SummaryCall {
                description: description.to_string(),
                labels: labels.to_vec(),
                tier,
                payout,
            });
            self.outcome.play("summary-generator").await
        }
    }
}
