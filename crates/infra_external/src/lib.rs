//! External Service Adapters
//!
//! HTTP implementations of the claims domain's outbound ports:
//!
//! | Port                    | Adapter                      | Endpoint                         |
//! |-------------------------|------------------------------|----------------------------------|
//! | `ObjectStorePort`       | [`RestObjectStore`]          | storage REST API                 |
//! | `DamageDetectorPort`    | [`HttpDamageDetector`]       | detection model, multipart       |
//! | `ConsistencyCheckPort`  | [`VertexConsistencyChecker`] | Vertex, streamed, bearer token   |
//! | `SummaryGeneratorPort`  | [`GeminiSummaryGenerator`]   | Gemini, single-shot, API key     |
//!
//! Every adapter reports failures as `PortError` using the mapping in
//! [`http`]. Nothing here retries; the orchestrator decides what a failure
//! means for the claim.

pub mod http;
pub mod object_store;
pub mod detector;
pub mod credentials;
pub mod consistency;
pub mod summary;

pub use object_store::{RestObjectStore, StorageConfig};
pub use detector::{DetectorConfig, HttpDamageDetector};
pub use credentials::{ServiceAccountKey, ServiceAccountTokenSource, StaticToken, TokenSource};
pub use consistency::{VertexConfig, VertexConsistencyChecker};
pub use summary::{GeminiConfig, GeminiSummaryGenerator};
