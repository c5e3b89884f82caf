//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for claims using SQLx.
//!
//! # Architecture
//!
//! The crate follows the repository pattern: [`repositories`] owns the SQL
//! and row types, [`adapters`] implements the domain's
//! `ClaimRepositoryPort` on top of it.
//!
//! Derived adjudication fields are write-once. The repository fills a column
//! only while it is still NULL, so concurrent or repeated patches can never
//! replace a stored result.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresClaimAdapter};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/claims")).await?;
//! run_migrations(&pool).await?;
//! let repository = PostgresClaimAdapter::new(pool);
//! ```

pub mod pool;
pub mod error;
pub mod repositories;
pub mod adapters;

pub use pool::{create_pool, create_pool_from_url, run_migrations, DatabaseConfig, DatabasePool};
pub use error::DatabaseError;
pub use adapters::PostgresClaimAdapter;
