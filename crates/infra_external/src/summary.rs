//! Single-shot summary generator
//!
//! Calls the Gemini `generateContent` endpoint with an API key and returns
//! the first candidate's first text part. A response without that path is an
//! empty summary, not an error.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

use core_kernel::{DomainPort, PortError};
use domain_claims::prompts::summary_prompt;
use domain_claims::{Payout, PolicyTier, SummaryGeneratorPort};

use crate::consistency::GenerateRequest;
use crate::http::{build_client, ensure_success, map_transport_error};

const SERVICE: &str = "gemini-summary";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Configuration for the generation endpoint
#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: "gemini-1.5-pro".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    fn first_text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .unwrap_or_default()
    }
}

/// Summary generator backed by the Gemini API
#[derive(Debug, Clone)]
pub struct GeminiSummaryGenerator {
    config: GeminiConfig,
    client: reqwest::Client,
}

impl GeminiSummaryGenerator {
    pub fn new(config: GeminiConfig) -> Result<Self, PortError> {
        let client = build_client(config.timeout)?;
        Ok(Self { config, client })
    }
}

impl DomainPort for GeminiSummaryGenerator {}

#[async_trait]
impl SummaryGeneratorPort for GeminiSummaryGenerator {
    #[instrument(skip_all, fields(tier = %tier, payout = %payout))]
    async fn summarize(
        &self,
        description: &str,
        labels: &[String],
        tier: PolicyTier,
        payout: Payout,
    ) -> Result<String, PortError> {
        let prompt = summary_prompt(description, labels, tier, payout);

        let response = self
            .client
            .post(self.config.endpoint())
            .query(&[("key", self.config.api_key.as_str())])
            .json(&GenerateRequest::user_prompt(&prompt))
            .send()
            .await
            .map_err(|e| map_transport_error(SERVICE, self.config.timeout, e))?;
        let response = ensure_success(SERVICE, response).await?;

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| PortError::transformation(format!("malformed generation response: {}", e)))?;

        let summary = body.first_text();
        debug!(chars = summary.len(), "Summary generated");
        Ok(summary)
    }
}
