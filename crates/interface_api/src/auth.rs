//! Authentication and authorization
//!
//! Bearer tokens are HS256 JWTs. `sub` carries the caller's owner id and
//! `roles` the granted roles.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use core_kernel::OwnerId;
use domain_claims::Caller;

/// Decoded bearer token payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Bare owner UUID
    pub sub: String,
    #[serde(default)]
    pub roles: Vec<String>,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    /// The caller identity handed to the claims service
    pub fn caller(&self) -> Result<Caller, AuthError> {
        let owner_id: OwnerId = self.sub.parse().map_err(|_| AuthError::InvalidSubject)?;
        Ok(Caller::new(owner_id))
    }
}

/// Why a request was not authenticated or authorized
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Token subject is not a valid owner id")]
    InvalidSubject,
    #[error("Missing role: {0}")]
    MissingRole(String),
}

/// Issues a token for `owner_id` valid for `expiration_secs`. Used by tests
/// and local tooling; production tokens come from the identity provider.
pub fn create_token(
    owner_id: &OwnerId,
    roles: Vec<String>,
    secret: &str,
    expiration_secs: u64,
) -> Result<String, AuthError> {
    let now = Utc::now();
    let exp = now + Duration::seconds(expiration_secs as i64);

    let claims = Claims {
        sub: owner_id.as_uuid().to_string(),
        roles,
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AuthError::InvalidToken)
}

/// Verifies signature and expiry
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::InvalidToken,
    })?;

    Ok(token_data.claims)
}

/// `admin` satisfies any role requirement
pub fn has_role(claims: &Claims, required_role: &str) -> bool {
    claims
        .roles
        .iter()
        .any(|r| r == required_role || r == roles::ADMIN)
}

pub mod roles {
    /// May list every claim in the system
    pub const ADMIN: &str = "admin";
}
