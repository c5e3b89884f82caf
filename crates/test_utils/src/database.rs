//! Database Test Utilities
//!
//! Throwaway PostgreSQL containers with the claims schema applied. Tests
//! using them need a Docker daemon and are `#[ignore]`d by default.

use sqlx::PgPool;
use std::time::Duration;
use testcontainers::{
    core::{IntoContainerPort, WaitFor},
    runners::AsyncRunner,
    ContainerAsync, GenericImage, ImageExt,
};

use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresClaimAdapter};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const PG_PORT: u16 = 5432;
const READY_LINE: &str = "database system is ready to accept connections";

/// Credentials and image for the throwaway server
#[derive(Debug, Clone)]
pub struct TestDatabaseConfig {
    pub image: &'static str,
    pub tag: &'static str,
    pub user: &'static str,
    pub password: &'static str,
    pub database: &'static str,
}

impl Default for TestDatabaseConfig {
    fn default() -> Self {
        Self {
            image: "postgres",
            tag: "16-alpine",
            user: "claims_test",
            password: "claims_test",
            database: "claims_test",
        }
    }
}

impl TestDatabaseConfig {
    /// Connection URL for a server reachable at `host:port`
    pub fn url_for(&self, host: &str, port: u16) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, host, port, self.database
        )
    }
}

/// A migrated PostgreSQL container; dropped with the value
pub struct TestDatabase {
    _container: ContainerAsync<GenericImage>,
    pub url: String,
    pool: PgPool,
}

impl TestDatabase {
    /// Starts a container with the default settings
    pub async fn new() -> Result<Self, BoxError> {
        Self::start(TestDatabaseConfig::default()).await
    }

    pub async fn start(config: TestDatabaseConfig) -> Result<Self, BoxError> {
        let container = GenericImage::new(config.image, config.tag)
            .with_exposed_port(PG_PORT.tcp())
            .with_wait_for(WaitFor::message_on_stderr(READY_LINE))
            .with_env_var("POSTGRES_USER", config.user)
            .with_env_var("POSTGRES_PASSWORD", config.password)
            .with_env_var("POSTGRES_DB", config.database)
            .start()
            .await?;

        let host = container.get_host().await?.to_string();
        let port = container.get_host_port_ipv4(PG_PORT).await?;
        let url = config.url_for(&host, port);

        let pool = create_pool(
            DatabaseConfig::new(&url)
                .with_max_connections(5)
                .with_acquire_timeout(Duration::from_secs(10)),
        )
        .await?;
        run_migrations(&pool).await?;

        Ok(Self {
            _container: container,
            url,
            pool,
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// A claim repository adapter over this database
    pub fn adapter(&self) -> PostgresClaimAdapter {
        PostgresClaimAdapter::new(self.pool.clone())
    }

    /// Removes all claims while preserving the schema
    pub async fn clear_data(&self) -> Result<(), BoxError> {
        sqlx::query("TRUNCATE TABLE claims").execute(&self.pool).await?;
        Ok(())
    }
}
