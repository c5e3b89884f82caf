//! Integration tests for the claims pipeline and listing

use std::time::Duration;

use proptest::prelude::*;

use domain_claims::ports::mock::{ScriptedConsistencyChecker, ScriptedDetector, ScriptedSummaryGenerator};
use domain_claims::{
    estimate, AdjudicationStage, ClaimError, ClaimRepositoryPort, Payout, PipelineTimeouts,
    PolicyTier, SIGNED_URL_TTL,
};
use test_utils::*;

// ============================================================================
// Submission
// ============================================================================

mod submission_tests {
    use super::*;

    #[tokio::test]
    async fn test_submission_persists_adjudication() {
        let harness = TestHarness::succeeding();
        let caller = CallerFixtures::new_caller();

        let result = harness
            .service
            .submit(caller, SubmissionFixtures::standard())
            .await
            .unwrap();

        assert_eq!(result.damage_labels, LabelFixtures::minor_mixed());
        assert_eq!(result.payout, Payout::new(1150));
        assert_eq!(result.annotated_image, b"annotated".to_vec());

        let claim = harness.repository.get(result.claim_id).await.unwrap();
        assert_fully_adjudicated(&claim);
        assert_eq!(claim.owner_id, caller.owner_id);
        assert_eq!(claim.description, SubmissionFixtures::DESCRIPTION);
        assert_eq!(claim.summary.as_deref(), Some(result.summary.as_str()));
        assert!(harness.object_store.contains(&claim.image_ref).await);
    }

    #[tokio::test]
    async fn test_assessments_receive_pipeline_values() {
        let harness = TestHarness::builder()
            .with_detector(ScriptedDetector::detecting(&["glass shatter"]))
            .build();

        harness
            .service
            .submit(CallerFixtures::new_caller(), SubmissionFixtures::with_tier(PolicyTier::Basic))
            .await
            .unwrap();

        let checks = harness.consistency.calls();
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].0, SubmissionFixtures::DESCRIPTION);
        assert_eq!(checks[0].1, vec!["glass shatter".to_string()]);

        let summaries = harness.summary.calls();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].payout, Payout::new(1000));
        assert_eq!(summaries[0].tier, PolicyTier::Basic);
    }

    #[tokio::test]
    async fn test_claim_visible_before_detection_completes() {
        let harness = TestHarness::builder()
            .with_detector(ScriptedDetector::detecting(&["dent"]).gated())
            .build();
        let caller = CallerFixtures::new_caller();

        let service = harness.service.clone();
        let submission = tokio::spawn(async move {
            service.submit(caller, SubmissionFixtures::standard()).await
        });

        while harness.detector.calls() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let views = harness.service.list_own(caller).await.unwrap();
        assert_eq!(views.len(), 1);
        assert_unadjudicated(&views[0].claim);
        assert!(views[0].read_url.is_some());

        harness.detector.release();
        let result = submission.await.unwrap().unwrap();

        let views = harness.service.list_own(caller).await.unwrap();
        assert_eq!(views[0].claim.id, result.claim_id);
        assert_fully_adjudicated(&views[0].claim);
    }

    #[tokio::test]
    async fn test_identical_resubmission_creates_second_claim() {
        let harness = TestHarness::succeeding();
        let caller = CallerFixtures::new_caller();

        let first = harness.service.submit(caller, SubmissionFixtures::standard()).await.unwrap();
        let second = harness.service.submit(caller, SubmissionFixtures::standard()).await.unwrap();

        assert_ne!(first.claim_id, second.claim_id);
        assert_eq!(harness.repository.len().await, 2);
        assert_eq!(harness.object_store.object_count().await, 2);
        assert_eq!(first.payout, second.payout);
    }

    #[tokio::test]
    async fn test_empty_image_is_rejected() {
        let harness = TestHarness::succeeding();
        let mut submission = SubmissionFixtures::standard();
        submission.image = ImageFixtures::empty();

        let error = harness
            .service
            .submit(CallerFixtures::new_caller(), submission)
            .await
            .unwrap_err();

        assert!(matches!(error, ClaimError::Validation(_)));
        assert_eq!(harness.object_store.object_count().await, 0);
        assert_eq!(harness.detector.calls(), 0);
    }
}

// ============================================================================
// Failure policy
// ============================================================================

mod failure_policy_tests {
    use super::*;

    #[tokio::test]
    async fn test_detector_failure_leaves_partial_claim() {
        let harness = TestHarness::builder()
            .with_detector(ScriptedDetector::failing("HTTP 500"))
            .build();
        let caller = CallerFixtures::new_caller();

        let error = harness
            .service
            .submit(caller, SubmissionFixtures::standard())
            .await
            .unwrap_err();

        assert!(matches!(error, ClaimError::Detection { .. }));
        assert_eq!(error.stage(), Some(AdjudicationStage::Detecting));
        let claim_id = error.claim_id().unwrap();

        let claim = harness.repository.get(claim_id).await.unwrap();
        assert_unadjudicated(&claim);
        assert_eq!(harness.repository.patch_count(), 0);
        assert!(harness.consistency.calls().is_empty());
        assert!(harness.summary.calls().is_empty());

        let views = harness.service.list_own(caller).await.unwrap();
        assert_eq!(views.len(), 1);
    }

    #[tokio::test]
    async fn test_consistency_failure_still_finalizes() {
        let harness = TestHarness::builder()
            .with_detector(ScriptedDetector::detecting(&["dent", "dent"]))
            .with_consistency(ScriptedConsistencyChecker::failing("token exchange rejected"))
            .build();

        let result = harness
            .service
            .submit(CallerFixtures::new_caller(), SubmissionFixtures::with_tier(PolicyTier::Basic))
            .await
            .unwrap();

        assert_eq!(result.consistency_verdict, "");
        let claim = harness.repository.get(result.claim_id).await.unwrap();
        assert_eq!(claim.payout, Some(Payout::new(1000)));
        assert_eq!(claim.damage_labels, Some(vec!["dent".to_string(), "dent".to_string()]));
        assert_eq!(claim.consistency_verdict.as_deref(), Some(""));
        assert!(!claim.summary.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn test_summary_timeout_degrades() {
        let harness = TestHarness::builder()
            .with_summary(ScriptedSummaryGenerator::hanging())
            .with_timeouts(PipelineTimeouts {
                assessment: Duration::from_millis(50),
                ..PipelineTimeouts::default()
            })
            .build();

        let result = harness
            .service
            .submit(CallerFixtures::new_caller(), SubmissionFixtures::standard())
            .await
            .unwrap();

        assert_eq!(result.summary, "");
        assert!(!result.consistency_verdict.is_empty());
    }

    #[tokio::test]
    async fn test_create_failure_orphans_image() {
        let harness = TestHarness::succeeding();
        harness.repository.fail_creates();

        let error = harness
            .service
            .submit(CallerFixtures::new_caller(), SubmissionFixtures::standard())
            .await
            .unwrap_err();

        assert!(matches!(error, ClaimError::Persistence { claim_id: None, .. }));
        assert_eq!(error.stage(), Some(AdjudicationStage::Created));
        assert_eq!(harness.object_store.object_count().await, 1);
        assert!(harness.repository.is_empty().await);
        assert_eq!(harness.detector.calls(), 0);
    }

    #[tokio::test]
    async fn test_final_patch_failure_loses_results() {
        let harness = TestHarness::succeeding();
        harness.repository.fail_patches();

        let error = harness
            .service
            .submit(CallerFixtures::new_caller(), SubmissionFixtures::standard())
            .await
            .unwrap_err();

        assert_eq!(error.stage(), Some(AdjudicationStage::Finalized));
        let claim = harness.repository.get(error.claim_id().unwrap()).await.unwrap();
        assert_unadjudicated(&claim);
    }
}

// ============================================================================
// Listing
// ============================================================================

mod listing_tests {
    use super::*;

    #[tokio::test]
    async fn test_listing_order_survives_signing_order() {
        let harness = TestHarness::succeeding();
        let caller = CallerFixtures::new_caller();

        for _ in 0..4 {
            harness.service.submit(caller, SubmissionFixtures::standard()).await.unwrap();
            tokio::time::sleep(Duration::from_millis(3)).await;
        }

        let expected: Vec<_> = harness
            .repository
            .list_by_owner(caller.owner_id)
            .await
            .unwrap();
        assert_newest_first(&expected);

        // The newest claim signs last, the oldest first
        for (position, claim) in expected.iter().enumerate() {
            let delay = Duration::from_millis(10 * (expected.len() - position) as u64);
            harness.object_store.delay_signing(&claim.image_ref, delay);
        }

        let views = harness.service.list_own(caller).await.unwrap();
        let listed: Vec<_> = views.iter().map(|v| v.claim.id).collect();
        let stored: Vec<_> = expected.iter().map(|c| c.id).collect();
        assert_eq!(listed, stored);
        assert_all_signed(&views);
        let ttl = format!("expires_in={}", SIGNED_URL_TTL.as_secs());
        assert!(views.iter().all(|v| v.read_url.as_deref().unwrap_or_default().contains(&ttl)));
    }

    #[tokio::test]
    async fn test_listing_scoped_to_owner() {
        let harness = TestHarness::succeeding();
        let alice = CallerFixtures::new_caller();
        let bob = CallerFixtures::new_caller();

        harness.service.submit(alice, SubmissionFixtures::standard()).await.unwrap();
        harness.service.submit(bob, SubmissionFixtures::random(PolicyTier::Premium)).await.unwrap();
        harness.service.submit(bob, SubmissionFixtures::random(PolicyTier::Basic)).await.unwrap();

        assert_eq!(harness.service.list_own(alice).await.unwrap().len(), 1);
        assert_eq!(harness.service.list_own(bob).await.unwrap().len(), 2);
        assert_eq!(harness.service.list_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_signing_timeout_yields_null_url() {
        let harness = TestHarness::builder()
            .with_timeouts(PipelineTimeouts {
                signing: Duration::from_millis(20),
                ..PipelineTimeouts::default()
            })
            .build();
        let caller = CallerFixtures::new_caller();
        let slow = harness.service.submit(caller, SubmissionFixtures::standard()).await.unwrap();
        harness.service.submit(caller, SubmissionFixtures::standard()).await.unwrap();

        let slow_claim = harness.repository.get(slow.claim_id).await.unwrap();
        harness
            .object_store
            .delay_signing(&slow_claim.image_ref, Duration::from_millis(500));

        let views = harness.service.list_own(caller).await.unwrap();
        assert_eq!(views.len(), 2);
        for view in views {
            assert_eq!(view.read_url.is_none(), view.claim.id == slow.claim_id);
        }
    }
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn persisted_payout_matches_estimate(
        labels in damage_labels_strategy(),
        tier in policy_tier_strategy(),
    ) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let label_refs: Vec<&str> = labels.iter().map(String::as_str).collect();
        let harness = TestHarness::builder()
            .with_detector(ScriptedDetector::detecting(&label_refs))
            .build();

        let result = runtime.block_on(
            harness.service.submit(CallerFixtures::new_caller(), SubmissionFixtures::with_tier(tier)),
        ).unwrap();

        prop_assert_eq!(result.payout, estimate(&labels, tier));
        let claim = runtime.block_on(harness.repository.get(result.claim_id)).unwrap();
        prop_assert_eq!(claim.payout, Some(estimate(&labels, tier)));
        prop_assert_eq!(claim.damage_labels, Some(labels));
    }
}
