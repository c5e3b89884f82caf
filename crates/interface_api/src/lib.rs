//! HTTP API Layer
//!
//! This crate provides the REST API for claim submission and review using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: Submission, listings and the standalone consistency check
//! - **Middleware**: Authentication, admin authorization, audit logging
//! - **DTOs**: camelCase request/response bodies
//! - **Error Handling**: `{error, message}` JSON error responses
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::create_router;
//!
//! let app = create_router(Arc::new(service), config);
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod handlers;
pub mod dto;
pub mod auth;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use domain_claims::ClaimsService;

use crate::config::ApiConfig;
use crate::handlers::{claims, health};
use crate::middleware::{audit_middleware, auth_middleware, require_admin};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ClaimsService>,
    pub config: ApiConfig,
}

/// Creates the main API router
///
/// # Arguments
///
/// * `service` - Claims service wired to its adapters
/// * `config` - API configuration
pub fn create_router(service: Arc<ClaimsService>, config: ApiConfig) -> Router {
    let body_limit = config.max_upload_bytes;
    let state = AppState { service, config };

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let claims_routes = Router::new()
        .route("/", post(claims::submit_claim).get(claims::list_own_claims))
        .route("/validate", post(claims::validate_claim));

    let admin_routes = Router::new()
        .route("/claims", get(claims::list_all_claims))
        .route_layer(axum_middleware::from_fn(require_admin));

    // Protected API routes; auth runs first so audit sees the caller
    let api_routes = Router::new()
        .nest("/claims", claims_routes)
        .nest("/admin", admin_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(axum_middleware::from_fn(audit_middleware))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
