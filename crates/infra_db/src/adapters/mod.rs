//! Domain Adapters
//!
//! Adapter implementations connecting domain ports to the PostgreSQL
//! database layer. Each adapter implements a port trait, translates between
//! domain models and row types, and delegates SQL to the repository layer.

pub mod claims;

pub use claims::PostgresClaimAdapter;
