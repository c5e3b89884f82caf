//! Test Utilities Crate
//!
//! Shared test infrastructure, fixtures, and helpers for the claims
//! adjudication test suite.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built test data for submissions and callers
//! - `builders`: Builders for claims and for a `ClaimsService` wired with mocks
//! - `database`: PostgreSQL test container management
//! - `assertions`: Assertion helpers for claims and listings
//! - `generators`: Property-based test data generators

pub mod fixtures;
pub mod builders;
pub mod database;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use database::*;
pub use assertions::*;
pub use generators::*;
