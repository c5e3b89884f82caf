//! Damage detector adapter
//!
//! Posts the image as multipart field `file` and expects
//! `{"damage_type": [...], "image": "<base64>"}` back.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

use core_kernel::{DomainPort, PortError};
use domain_claims::{DamageDetectorPort, Detection, ImageUpload};

use crate::http::{build_client, ensure_success, map_transport_error};

const SERVICE: &str = "damage-detector";

/// Configuration for the damage detector
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Full URL of the prediction endpoint
    pub url: String,
    pub timeout: Duration,
}

impl DetectorConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Deserialize)]
struct DetectorResponse {
    #[serde(default)]
    damage_type: Option<Vec<String>>,
    image: Option<String>,
}

/// HTTP client for the damage detection model
#[derive(Debug, Clone)]
pub struct HttpDamageDetector {
    config: DetectorConfig,
    client: reqwest::Client,
}

impl HttpDamageDetector {
    pub fn new(config: DetectorConfig) -> Result<Self, PortError> {
        let client = build_client(config.timeout)?;
        Ok(Self { config, client })
    }
}

impl DomainPort for HttpDamageDetector {}

#[async_trait]
impl DamageDetectorPort for HttpDamageDetector {
    #[instrument(skip_all, fields(bytes = image.bytes.len()))]
    async fn detect(&self, image: &ImageUpload) -> Result<Detection, PortError> {
        let part = Part::bytes(image.bytes.clone())
            .file_name(format!("upload.{}", image.extension()))
            .mime_str(&image.content_type)
            .map_err(|e| PortError::validation(format!("invalid content type: {}", e)))?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(&self.config.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| map_transport_error(SERVICE, self.config.timeout, e))?;
        let response = ensure_success(SERVICE, response).await?;

        let body: DetectorResponse = response
            .json()
            .await
            .map_err(|e| PortError::transformation(format!("malformed detector payload: {}", e)))?;

        let detection = parse_detection(body)?;
        debug!(labels = ?detection.labels, "Damage detected");
        Ok(detection)
    }
}

fn parse_detection(body: DetectorResponse) -> Result<Detection, PortError> {
    let encoded = body
        .image
        .ok_or_else(|| PortError::transformation("detector payload has no annotated image"))?;
    let annotated_image = STANDARD
        .decode(encoded.trim())
        .map_err(|e| PortError::transformation(format!("annotated image is not base64: {}", e)))?;

    Ok(Detection {
        labels: body.damage_type.unwrap_or_default(),
        annotated_image,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_detection() {
        let body: DetectorResponse =
            serde_json::from_str(r#"{"damage_type": ["dent", "scratch"], "image": "aGVsbG8="}"#).unwrap();
        let detection = parse_detection(body).unwrap();
        assert_eq!(detection.labels, vec!["dent", "scratch"]);
        assert_eq!(detection.annotated_image, b"hello");
    }

    #[test]
    fn test_missing_labels_means_none_detected() {
        let body: DetectorResponse = serde_json::from_str(r#"{"image": ""}"#).unwrap();
        let detection = parse_detection(body).unwrap();
        assert!(detection.labels.is_empty());
    }

    #[test]
    fn test_null_labels_means_none_detected() {
        let body: DetectorResponse =
            serde_json::from_str(r#"{"damage_type": null, "image": "aGVsbG8="}"#).unwrap();
        let detection = parse_detection(body).unwrap();
        assert!(detection.labels.is_empty());
        assert_eq!(detection.annotated_image, b"hello");
    }

    #[test]
    fn test_missing_or_bad_image_is_malformed() {
        let body: DetectorResponse = serde_json::from_str(r#"{"damage_type": []}"#).unwrap();
        assert!(matches!(parse_detection(body), Err(PortError::Transformation { .. })));

        let body: DetectorResponse =
            serde_json::from_str(r#"{"damage_type": [], "image": "***"}"#).unwrap();
        assert!(matches!(parse_detection(body), Err(PortError::Transformation { .. })));
    }
}
