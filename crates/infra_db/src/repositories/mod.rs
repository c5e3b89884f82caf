//! Repository implementations
//!
//! Repositories own the SQL and map between database rows and plain row
//! structs. Conversion to domain types happens in [`crate::adapters`].
//!
//! Queries are built at runtime with `sqlx::query_as` and `FromRow`, so the
//! crate compiles without a live database.

pub mod claims;

pub use claims::ClaimsRepository;
