//! Vehicle Damage Claims Domain
//!
//! This crate turns a crash photo, an incident description and a policy tier
//! into an adjudicated claim: detected damage, a capped payout estimate, a
//! consistency verdict on the description, and a prose summary.
//!
//! # Adjudication Pipeline
//!
//! ```text
//! Uploading -> Created -> Detecting -> Estimated -> CheckingConsistency -> Summarizing -> Finalized
//! ```
//!
//! The claim row exists from `Created` onwards and is visible to its owner
//! immediately. Derived fields arrive in one patch at `Finalized`.

pub mod claim;
pub mod payout;
pub mod prompts;
pub mod stream;
pub mod ports;
pub mod service;
pub mod adjudication;
pub mod listing;
pub mod error;

pub use claim::{
    Caller, Claim, ClaimPatch, ImageRef, ImageUpload, NewClaim, PolicyTier, SignedClaimView,
    Submission,
};
pub use payout::{estimate, payout_cap, Payout};
pub use ports::{
    ClaimRepositoryPort, ConsistencyCheckPort, DamageDetectorPort, Detection, ObjectStorePort,
    SummaryGeneratorPort,
};
pub use service::{ClaimsService, PipelineTimeouts};
pub use adjudication::{Adjudication, AdjudicationStage};
pub use listing::SIGNED_URL_TTL;
pub use error::ClaimError;
