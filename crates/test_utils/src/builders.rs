//! Test Data Builders
//!
//! Builders that let tests specify only the relevant fields. The harness
//! builder wires a `ClaimsService` to in-memory adapters and keeps handles to
//! each of them for inspection.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use core_kernel::{ClaimId, OwnerId};
use domain_claims::ports::mock::{
    InMemoryClaimRepository, InMemoryObjectStore, ScriptedConsistencyChecker, ScriptedDetector,
    ScriptedSummaryGenerator,
};
use domain_claims::{Claim, ClaimsService, ImageRef, Payout, PolicyTier, PipelineTimeouts};

/// Builder for constructing claim values
pub struct ClaimBuilder {
    claim: Claim,
}

impl Default for ClaimBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClaimBuilder {
    /// Creates a builder for a freshly submitted Basic-tier claim
    pub fn new() -> Self {
        Self {
            claim: Claim {
                id: ClaimId::new_v7(),
                owner_id: OwnerId::new(),
                image_ref: ImageRef::new("00000000.png"),
                description: "Scraped the wing mirror on a gate post".to_string(),
                policy_tier: PolicyTier::Basic,
                damage_labels: None,
                payout: None,
                consistency_verdict: None,
                summary: None,
                created_at: Utc::now(),
            },
        }
    }

    pub fn with_owner(mut self, owner_id: OwnerId) -> Self {
        self.claim.owner_id = owner_id;
        self
    }

    pub fn with_tier(mut self, tier: PolicyTier) -> Self {
        self.claim.policy_tier = tier;
        self
    }

    pub fn with_image_ref(mut self, image_ref: impl Into<String>) -> Self {
        self.claim.image_ref = ImageRef::new(image_ref);
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.claim.created_at = created_at;
        self
    }

    /// Fills every derived field
    pub fn adjudicated(mut self, labels: &[&str], payout: u64) -> Self {
        self.claim.damage_labels = Some(labels.iter().map(|l| l.to_string()).collect());
        self.claim.payout = Some(Payout::new(payout));
        self.claim.consistency_verdict = Some("Consistent with the detected damage.".to_string());
        self.claim.summary = Some("Minor cosmetic damage.".to_string());
        self
    }

    pub fn build(self) -> Claim {
        self.claim
    }
}

/// A `ClaimsService` wired to in-memory adapters
pub struct TestHarness {
    pub object_store: Arc<InMemoryObjectStore>,
    pub repository: Arc<InMemoryClaimRepository>,
    pub detector: Arc<ScriptedDetector>,
    pub consistency: Arc<ScriptedConsistencyChecker>,
    pub summary: Arc<ScriptedSummaryGenerator>,
    pub service: ClaimsService,
}

impl TestHarness {
    /// A harness whose collaborators all succeed
    pub fn succeeding() -> Self {
        TestHarnessBuilder::new().build()
    }

    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// The service behind an `Arc`, as the API holds it
    pub fn shared_service(&self) -> Arc<ClaimsService> {
        Arc::new(self.service.clone())
    }
}

/// Builder for [`TestHarness`]
pub struct TestHarnessBuilder {
    detector: ScriptedDetector,
    consistency: ScriptedConsistencyChecker,
    summary: ScriptedSummaryGenerator,
    timeouts: PipelineTimeouts,
}

impl Default for TestHarnessBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarnessBuilder {
    /// Detects scratch, crack and tire flat; both assessments answer
    pub fn new() -> Self {
        Self {
            detector: ScriptedDetector::detecting(&["scratch", "crack", "tire flat"]),
            consistency: ScriptedConsistencyChecker::answering(
                "The description is consistent with the detected damage.",
            ),
            summary: ScriptedSummaryGenerator::answering(
                "Rear bumper damage from a low-speed collision.",
            ),
            timeouts: PipelineTimeouts::default(),
        }
    }

    pub fn with_detector(mut self, detector: ScriptedDetector) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_consistency(mut self, consistency: ScriptedConsistencyChecker) -> Self {
        self.consistency = consistency;
        self
    }

    pub fn with_summary(mut self, summary: ScriptedSummaryGenerator) -> Self {
        self.summary = summary;
        self
    }

    pub fn with_timeouts(mut self, timeouts: PipelineTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn build(self) -> TestHarness {
        let object_store = Arc::new(InMemoryObjectStore::new());
        let repository = Arc::new(InMemoryClaimRepository::new());
        let detector = Arc::new(self.detector);
        let consistency = Arc::new(self.consistency);
        let summary = Arc::new(self.summary);

        let service = ClaimsService::new(
            object_store.clone(),
            repository.clone(),
            detector.clone(),
            consistency.clone(),
            summary.clone(),
        )
        .with_timeouts(self.timeouts);

        TestHarness {
            object_store,
            repository,
            detector,
            consistency,
            summary,
            service,
        }
    }
}
