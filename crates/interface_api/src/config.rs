//! API configuration
//!
//! Loaded from `API_*` environment variables, e.g. `API_PORT=9000` or
//! `API_GEMINI_API_KEY=...`. Every non-secret field has a default.

use config::ConfigError;
use serde::Deserialize;
use std::time::Duration;

use domain_claims::PipelineTimeouts;

/// API configuration
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// JWT secret for authentication
    pub jwt_secret: String,
    /// JWT expiration in seconds
    pub jwt_expiration_secs: u64,
    /// Database URL
    pub database_url: String,
    /// Log level
    pub log_level: String,
    /// Largest accepted request body, in bytes
    pub max_upload_bytes: usize,

    /// Object store base URL
    pub storage_url: String,
    pub storage_bucket: String,
    pub storage_service_key: String,

    /// Damage detector prediction endpoint
    pub detector_url: String,

    pub gcp_project_id: String,
    pub vertex_location: String,
    pub vertex_model: String,
    /// Service-account credential blob, as JSON
    pub google_service_account_json: String,

    pub gemini_api_key: String,
    pub gemini_model: String,

    pub storage_timeout_secs: u64,
    pub repository_timeout_secs: u64,
    pub detection_timeout_secs: u64,
    pub assessment_timeout_secs: u64,
    pub signing_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: String::new(),
            jwt_expiration_secs: 3600,
            database_url: "postgres://localhost/claims".to_string(),
            log_level: "info".to_string(),
            max_upload_bytes: 10 * 1024 * 1024,
            storage_url: "http://localhost:54321".to_string(),
            storage_bucket: "crash-images".to_string(),
            storage_service_key: String::new(),
            detector_url: "http://localhost:8000/predict".to_string(),
            gcp_project_id: String::new(),
            vertex_location: "us-central1".to_string(),
            vertex_model: "gemini-2.5-flash".to_string(),
            google_service_account_json: String::new(),
            gemini_api_key: String::new(),
            gemini_model: "gemini-1.5-pro".to_string(),
            storage_timeout_secs: 30,
            repository_timeout_secs: 30,
            detection_timeout_secs: 60,
            assessment_timeout_secs: 60,
            signing_timeout_secs: 10,
        }
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("log_level", &self.log_level)
            .field("storage_url", &self.storage_url)
            .field("storage_bucket", &self.storage_bucket)
            .field("detector_url", &self.detector_url)
            .field("gcp_project_id", &self.gcp_project_id)
            .field("vertex_model", &self.vertex_model)
            .field("gemini_model", &self.gemini_model)
            .finish_non_exhaustive()
    }
}

impl ApiConfig {
    /// Loads configuration from environment
    pub fn from_env() -> Result<Self, ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("API").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Fails when a secret the server cannot run without is unset
    pub fn ensure_secrets(&self) -> Result<(), ConfigError> {
        let missing: Vec<&str> = [
            ("API_JWT_SECRET", &self.jwt_secret),
            ("API_STORAGE_SERVICE_KEY", &self.storage_service_key),
            ("API_GCP_PROJECT_ID", &self.gcp_project_id),
            ("API_GOOGLE_SERVICE_ACCOUNT_JSON", &self.google_service_account_json),
            ("API_GEMINI_API_KEY", &self.gemini_api_key),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Message(format!(
                "missing required settings: {}",
                missing.join(", ")
            )))
        }
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Timeouts the claims service applies to each external call
    pub fn pipeline_timeouts(&self) -> PipelineTimeouts {
        PipelineTimeouts {
            storage: Duration::from_secs(self.storage_timeout_secs),
            repository: Duration::from_secs(self.repository_timeout_secs),
            detection: Duration::from_secs(self.detection_timeout_secs),
            assessment: Duration::from_secs(self.assessment_timeout_secs),
            signing: Duration::from_secs(self.signing_timeout_secs),
        }
    }
}
