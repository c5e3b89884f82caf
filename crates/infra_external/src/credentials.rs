//! Bearer tokens for the streamed assessment endpoint
//!
//! A service-account key signs an RS256 JWT assertion which is exchanged at
//! the key's `token_uri` for an access token. Tokens are cached and renewed
//! shortly before they expire.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use core_kernel::PortError;

use crate::http::{build_client, ensure_success, map_transport_error};

const SERVICE: &str = "token-exchange";
const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Tokens are renewed this long before their stated expiry
const REFRESH_MARGIN_SECS: i64 = 60;

/// Source of bearer tokens
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, PortError>;
}

/// A fixed token, for tests and local tooling
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> Result<String, PortError> {
        Ok(self.0.clone())
    }
}

/// The fields of a service-account credential blob this crate uses
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    pub token_uri: String,
}

impl ServiceAccountKey {
    /// Parses a credential blob
    pub fn from_json(json: &str) -> Result<Self, PortError> {
        serde_json::from_str(json)
            .map_err(|e| PortError::unauthorized(format!("invalid service account credentials: {}", e)))
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    refresh_at: DateTime<Utc>,
}

/// Exchanges a signed service-account assertion for access tokens
pub struct ServiceAccountTokenSource {
    key: ServiceAccountKey,
    signing_key: EncodingKey,
    client: reqwest::Client,
    timeout: Duration,
    cached: Mutex<Option<CachedToken>>,
}

impl std::fmt::Debug for ServiceAccountTokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountTokenSource")
            .field("client_email", &self.key.client_email)
            .field("token_uri", &self.key.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountTokenSource {
    pub fn new(key: ServiceAccountKey, timeout: Duration) -> Result<Self, PortError> {
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| PortError::unauthorized(format!("invalid service account private key: {}", e)))?;
        Ok(Self {
            key,
            signing_key,
            client: build_client(timeout)?,
            timeout,
            cached: Mutex::new(None),
        })
    }

    /// Parses the credential blob and builds the token source
    pub fn from_json(json: &str, timeout: Duration) -> Result<Self, PortError> {
        Self::new(ServiceAccountKey::from_json(json)?, timeout)
    }

    fn assertion(&self, now: DateTime<Utc>) -> Result<String, PortError> {
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: CLOUD_PLATFORM_SCOPE,
            aud: &self.key.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };
        encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)
            .map_err(|e| PortError::unauthorized(format!("failed to sign assertion: {}", e)))
    }

    async fn exchange(&self, now: DateTime<Utc>) -> Result<CachedToken, PortError> {
        let assertion = self.assertion(now)?;

        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| map_transport_error(SERVICE, self.timeout, e))?;
        let response = ensure_success(SERVICE, response).await.map_err(|e| match e {
            PortError::Unauthorized { .. } => e,
            other => PortError::unauthorized(format!("token exchange failed: {}", other)),
        })?;

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| PortError::unauthorized(format!("invalid token response: {}", e)))?;

        let lifetime = (token.expires_in - REFRESH_MARGIN_SECS).max(0);
        Ok(CachedToken {
            token: token.access_token,
            refresh_at: now + ChronoDuration::seconds(lifetime),
        })
    }
}

#[async_trait]
impl TokenSource for ServiceAccountTokenSource {
    #[instrument(skip(self), fields(client_email = %self.key.client_email))]
    async fn access_token(&self) -> Result<String, PortError> {
        // Held across the exchange so concurrent callers share one refresh
        let mut cached = self.cached.lock().await;
        let now = Utc::now();

        if let Some(token) = cached.as_ref().filter(|t| now < t.refresh_at) {
            return Ok(token.token.clone());
        }

        let fresh = self.exchange(now).await?;
        debug!(refresh_at = %fresh.refresh_at, "Obtained access token");
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }
}
