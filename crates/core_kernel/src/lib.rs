//! Core Kernel - Foundational types for the claims adjudication system
//!
//! This crate provides the building blocks shared by every other crate:
//! - Strongly-typed identifiers for claims and claim owners
//! - The port error type returned by every adapter
//! - Health check abstractions for adapters

pub mod identifiers;
pub mod ports;

pub use identifiers::{ClaimId, OwnerId};
pub use ports::{
    PortError, DomainPort, AdapterHealth, HealthCheckResult, HealthCheckable,
};
