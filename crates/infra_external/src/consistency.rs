//! Streamed consistency checker
//!
//! Calls the Vertex `streamGenerateContent` endpoint with a bearer token and
//! accumulates every `"text"` field of the streamed JSON array as it
//! arrives, without waiting for the full body.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::AUTHORIZATION;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use core_kernel::{DomainPort, PortError};
use domain_claims::prompts::consistency_prompt;
use domain_claims::stream::StreamedText;
use domain_claims::ConsistencyCheckPort;

use crate::credentials::TokenSource;
use crate::http::{build_client, ensure_success, map_transport_error};

const SERVICE: &str = "vertex-consistency";

/// Configuration for the Vertex endpoint
#[derive(Debug, Clone)]
pub struct VertexConfig {
    pub project_id: String,
    pub location: String,
    pub model: String,
    /// Overrides `https://{location}-aiplatform.googleapis.com`
    pub base_url: Option<String>,
    pub timeout: Duration,
}

impl VertexConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            location: "us-central1".to_string(),
            model: "gemini-2.5-flash".to_string(),
            base_url: None,
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Full URL of the streaming endpoint
    pub fn endpoint(&self) -> String {
        let base = self
            .base_url
            .clone()
            .unwrap_or_else(|| format!("https://{}-aiplatform.googleapis.com", self.location));
        format!(
            "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:streamGenerateContent",
            base, self.project_id, self.location, self.model
        )
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct GenerateRequest<'a> {
    pub contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct Content<'a> {
    pub role: &'static str,
    pub parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct Part<'a> {
    pub text: &'a str,
}

impl<'a> GenerateRequest<'a> {
    pub fn user_prompt(prompt: &'a str) -> Self {
        Self {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
        }
    }
}

/// Consistency checker backed by the streamed Vertex endpoint
pub struct VertexConsistencyChecker {
    config: VertexConfig,
    client: reqwest::Client,
    tokens: Arc<dyn TokenSource>,
}

impl std::fmt::Debug for VertexConsistencyChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VertexConsistencyChecker")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl VertexConsistencyChecker {
    pub fn new(config: VertexConfig, tokens: Arc<dyn TokenSource>) -> Result<Self, PortError> {
        let client = build_client(config.timeout)?;
        Ok(Self {
            config,
            client,
            tokens,
        })
    }
}

impl DomainPort for VertexConsistencyChecker {}

#[async_trait]
impl ConsistencyCheckPort for VertexConsistencyChecker {
    #[instrument(skip_all, fields(labels = labels.len()))]
    async fn check(&self, description: &str, labels: &[String]) -> Result<String, PortError> {
        let token = self.tokens.access_token().await?;
        let prompt = consistency_prompt(description, labels);

        let response = self
            .client
            .post(self.config.endpoint())
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .json(&GenerateRequest::user_prompt(&prompt))
            .send()
            .await
            .map_err(|e| map_transport_error(SERVICE, self.config.timeout, e))?;
        let response = ensure_success(SERVICE, response).await?;

        let mut text = StreamedText::new();
        let mut chunks = response.bytes_stream();
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk.map_err(|e| map_transport_error(SERVICE, self.config.timeout, e))?;
            text.feed(&chunk);
        }

        let verdict = text.finish();
        debug!(chars = verdict.len(), "Consistency verdict received");
        Ok(verdict)
    }
}
