//! REST object store adapter
//!
//! Talks to a Supabase-style storage API:
//!
//! ```text
//! POST {base}/storage/v1/object/{bucket}/{key}         upload, body = raw bytes
//! POST {base}/storage/v1/object/sign/{bucket}/{key}    {"expiresIn": s} -> {"signedURL": "/object/sign/..."}
//! ```
//!
//! Keys are generated here: a v7 UUID stem plus an extension derived from
//! the content type.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};
use uuid::Uuid;

use core_kernel::{DomainPort, PortError};
use domain_claims::{ImageRef, ImageUpload, ObjectStorePort};

use crate::http::{build_client, ensure_success, map_status, map_transport_error};

const SERVICE: &str = "object-store";

/// Configuration for the REST object store
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Project base URL, e.g. `https://xyz.supabase.co`
    pub base_url: String,
    /// Bucket holding crash images
    pub bucket: String,
    /// Service-role key sent as bearer token and `apikey`
    pub service_key: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl StorageConfig {
    pub fn new(base_url: impl Into<String>, service_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bucket: "crash-images".to_string(),
            service_key: service_key.into(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignRequest {
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct SignResponse {
    #[serde(rename = "signedURL")]
    signed_url: String,
}

/// Object store adapter over the storage REST API
#[derive(Debug, Clone)]
pub struct RestObjectStore {
    config: StorageConfig,
    client: reqwest::Client,
}

impl RestObjectStore {
    pub fn new(config: StorageConfig) -> Result<Self, PortError> {
        let client = build_client(config.timeout)?;
        Ok(Self { config, client })
    }

    /// Public URL of an object; valid only for public buckets
    pub fn public_url(&self, image_ref: &ImageRef) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.config.base_url, self.config.bucket, image_ref
        )
    }

    fn object_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.config.base_url, self.config.bucket, key
        )
    }

    fn sign_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/object/sign/{}/{}",
            self.config.base_url, self.config.bucket, key
        )
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.config.service_key)
    }
}

/// Generates a fresh object key for an upload
pub fn object_key(image: &ImageUpload) -> String {
    format!("{}.{}", Uuid::now_v7(), image.extension())
}

impl DomainPort for RestObjectStore {}

#[async_trait]
impl ObjectStorePort for RestObjectStore {
    #[instrument(skip_all, fields(bytes = image.bytes.len()))]
    async fn put(&self, image: &ImageUpload) -> Result<ImageRef, PortError> {
        let key = object_key(image);

        let response = self
            .client
            .post(self.object_url(&key))
            .header(AUTHORIZATION, self.bearer())
            .header("apikey", &self.config.service_key)
            .header(CONTENT_TYPE, &image.content_type)
            .body(image.bytes.clone())
            .send()
            .await
            .map_err(|e| map_transport_error(SERVICE, self.config.timeout, e))?;
        ensure_success(SERVICE, response).await?;

        debug!(%key, "Image stored");
        Ok(ImageRef::new(key))
    }

    #[instrument(skip_all, fields(image_ref = %image_ref))]
    async fn sign_read(&self, image_ref: &ImageRef, ttl: Duration) -> Result<String, PortError> {
        let response = self
            .client
            .post(self.sign_url(image_ref.as_str()))
            .header(AUTHORIZATION, self.bearer())
            .header("apikey", &self.config.service_key)
            .json(&SignRequest {
                expires_in: ttl.as_secs(),
            })
            .send()
            .await
            .map_err(|e| map_transport_error(SERVICE, self.config.timeout, e))?;

        // The storage API reports missing objects as 400 as well as 404
        let status = response.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::NOT_FOUND {
            return Err(PortError::not_found("Object", image_ref));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status(SERVICE, status, &body));
        }

        let signed: SignResponse = response
            .json()
            .await
            .map_err(|e| PortError::transformation(format!("invalid sign response: {}", e)))?;

        Ok(format!("{}/storage/v1{}", self.config.base_url, signed.signed_url))
    }
}
