//! Shared HTTP plumbing
//!
//! Client construction and the mapping of transport failures and HTTP
//! statuses onto [`PortError`]:
//! - 401/403 -> `PortError::Unauthorized`
//! - 404 -> `PortError::NotFound`
//! - 429 -> `PortError::RateLimited`
//! - 5xx -> `PortError::ServiceUnavailable`
//! - Timeouts -> `PortError::Timeout`
//! - Connect failures -> `PortError::Connection`
//! - Other -> `PortError::Internal`

use reqwest::{Response, StatusCode};
use std::time::Duration;

use core_kernel::PortError;

/// Longest upstream error body kept in an error message
const MAX_ERROR_BODY: usize = 512;

/// Builds a client whose requests give up after `timeout`
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, PortError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .build()
        .map_err(|e| PortError::Internal {
            message: format!("failed to build HTTP client: {}", e),
            source: Some(Box::new(e)),
        })
}

/// Maps a transport-level failure
pub fn map_transport_error(service: &str, timeout: Duration, error: reqwest::Error) -> PortError {
    if error.is_timeout() {
        PortError::timeout(service, timeout)
    } else if error.is_connect() {
        PortError::Connection {
            message: format!("{}: {}", service, error),
            source: Some(Box::new(error)),
        }
    } else if error.is_decode() {
        PortError::transformation(format!("{}: {}", service, error))
    } else {
        PortError::Internal {
            message: format!("{}: {}", service, error),
            source: Some(Box::new(error)),
        }
    }
}

/// Maps a non-success status
pub fn map_status(service: &str, status: StatusCode, body: &str) -> PortError {
    let detail = summarize_body(status, body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            PortError::unauthorized(format!("{}: {}", service, detail))
        }
        StatusCode::NOT_FOUND => PortError::not_found(service, detail),
        StatusCode::TOO_MANY_REQUESTS => PortError::RateLimited {
            service: service.to_string(),
        },
        s if s.is_server_error() => PortError::unavailable(service, detail),
        _ => PortError::internal(format!("{}: {}", service, detail)),
    }
}

/// Passes successful responses through and turns the rest into errors
pub async fn ensure_success(service: &str, response: Response) -> Result<Response, PortError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(map_status(service, status, &body))
}

fn summarize_body(status: StatusCode, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return format!("HTTP {}", status.as_u16());
    }
    let mut end = body.len().min(MAX_ERROR_BODY);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("HTTP {}: {}", status.as_u16(), &body[..end])
}
