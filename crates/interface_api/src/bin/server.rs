//! Claims API Server Binary
//!
//! Starts the HTTP API for claim submission and review.
//!
//! # Usage
//!
//! ```bash
//! API_JWT_SECRET=... API_DATABASE_URL=postgres://... cargo run --bin claims-api
//! ```
//!
//! # Environment Variables
//!
//! * `API_HOST` / `API_PORT` - Bind address (default: 0.0.0.0:8080)
//! * `API_JWT_SECRET` - JWT signing secret (required)
//! * `API_DATABASE_URL` - PostgreSQL connection string
//! * `API_LOG_LEVEL` - Log level when `RUST_LOG` is unset (default: info)
//! * `API_STORAGE_URL`, `API_STORAGE_BUCKET`, `API_STORAGE_SERVICE_KEY` - Object store
//! * `API_DETECTOR_URL` - Damage detector prediction endpoint
//! * `API_GCP_PROJECT_ID`, `API_VERTEX_LOCATION`, `API_VERTEX_MODEL`,
//!   `API_GOOGLE_SERVICE_ACCOUNT_JSON` - Consistency checker
//! * `API_GEMINI_API_KEY`, `API_GEMINI_MODEL` - Summary generator
//! * `API_*_TIMEOUT_SECS` - Per-stage timeouts (storage, repository,
//!   detection, assessment, signing)

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use domain_claims::ClaimsService;
use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresClaimAdapter};
use infra_external::{
    DetectorConfig, GeminiConfig, GeminiSummaryGenerator, HttpDamageDetector, RestObjectStore,
    ServiceAccountTokenSource, StorageConfig, VertexConfig, VertexConsistencyChecker,
};
use interface_api::{config::ApiConfig, create_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = ApiConfig::from_env().context("failed to load configuration")?;
    init_tracing(&config.log_level);
    config.ensure_secrets()?;

    tracing::info!(
        host = %config.host,
        port = %config.port,
        "Starting claims API server"
    );

    let service = build_service(&config).await?;
    let app = create_router(Arc::new(service), config.clone());

    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .with_context(|| format!("invalid bind address {}", config.server_addr()))?;
    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber; `RUST_LOG` wins over the configured level
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Connects every adapter and wires them into the claims service
async fn build_service(config: &ApiConfig) -> anyhow::Result<ClaimsService> {
    let timeouts = config.pipeline_timeouts();

    tracing::info!("Connecting to database");
    let pool = create_pool(
        DatabaseConfig::new(&config.database_url).with_acquire_timeout(timeouts.repository),
    )
    .await
    .context("failed to connect to database")?;
    run_migrations(&pool).await.context("failed to apply migrations")?;

    let object_store = RestObjectStore::new(
        StorageConfig::new(&config.storage_url, &config.storage_service_key)
            .with_bucket(&config.storage_bucket)
            .with_timeout(timeouts.storage.max(timeouts.signing)),
    )?;

    let detector = HttpDamageDetector::new(
        DetectorConfig::new(&config.detector_url).with_timeout(timeouts.detection),
    )?;

    let tokens = ServiceAccountTokenSource::from_json(
        &config.google_service_account_json,
        timeouts.assessment,
    )
    .context("invalid service account credentials")?;
    let consistency = VertexConsistencyChecker::new(
        VertexConfig::new(&config.gcp_project_id)
            .with_location(&config.vertex_location)
            .with_model(&config.vertex_model)
            .with_timeout(timeouts.assessment),
        Arc::new(tokens),
    )?;

    let summary = GeminiSummaryGenerator::new(
        GeminiConfig::new(&config.gemini_api_key)
            .with_model(&config.gemini_model)
            .with_timeout(timeouts.assessment),
    )?;

    Ok(ClaimsService::new(
        Arc::new(object_store),
        Arc::new(PostgresClaimAdapter::new(pool)),
        Arc::new(detector),
        Arc::new(consistency),
        Arc::new(summary),
    )
    .with_timeouts(timeouts))
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
