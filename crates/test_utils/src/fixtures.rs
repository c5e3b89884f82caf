//! Pre-built Test Fixtures
//!
//! Ready-to-use submissions, callers and images. Deterministic values are
//! used wherever a test asserts on them; `fake` fills in free text.

use fake::faker::lorem::en::Sentence;
use fake::Fake;

use core_kernel::OwnerId;
use domain_claims::{Caller, ImageUpload, PolicyTier, Submission};

/// PNG signature followed by a truncated IHDR chunk
pub const PNG_BYTES: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
];

/// JPEG start-of-image marker followed by an APP0 header
pub const JPEG_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46];

/// Fixture for images
pub struct ImageFixtures;

impl ImageFixtures {
    pub fn png() -> ImageUpload {
        ImageUpload::new(PNG_BYTES.to_vec(), "image/png")
    }

    pub fn jpeg() -> ImageUpload {
        ImageUpload::new(JPEG_BYTES.to_vec(), "image/jpeg")
    }

    /// Zero-length upload, rejected before anything is stored
    pub fn empty() -> ImageUpload {
        ImageUpload::new(Vec::new(), "image/png")
    }
}

/// Fixture for callers
pub struct CallerFixtures;

impl CallerFixtures {
    /// A caller with a fresh identity
    pub fn new_caller() -> Caller {
        Caller::new(OwnerId::new())
    }
}

/// Fixture for submissions
pub struct SubmissionFixtures;

impl SubmissionFixtures {
    /// Incident description used where tests compare prompt inputs
    pub const DESCRIPTION: &'static str = "Another car reversed into my rear bumper in a car park";

    /// A Standard-tier submission with the fixed description
    pub fn standard() -> Submission {
        Self::with_tier(PolicyTier::Standard)
    }

    pub fn with_tier(policy_tier: PolicyTier) -> Submission {
        Submission {
            image: ImageFixtures::png(),
            description: Self::DESCRIPTION.to_string(),
            policy_tier,
        }
    }

    /// A submission with a randomly generated description
    pub fn random(policy_tier: PolicyTier) -> Submission {
        Submission {
            image: ImageFixtures::jpeg(),
            description: Sentence(4..12).fake(),
            policy_tier,
        }
    }
}

/// Fixture for damage labels
pub struct LabelFixtures;

impl LabelFixtures {
    /// Labels whose costs sum to 1150
    pub fn minor_mixed() -> Vec<String> {
        ["scratch", "crack", "tire flat"].iter().map(|l| l.to_string()).collect()
    }

    /// Labels the cost table does not know
    pub fn unknown() -> Vec<String> {
        vec!["unknown-thing".to_string()]
    }
}
