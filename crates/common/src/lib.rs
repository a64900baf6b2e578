//! Shared types and utilities for the local-tunnel client
//!
//! This crate provides the error type, tuning constants, broker wire types and
//! small helpers used by both the client library and the `ltc` binary.

pub mod constants;
pub mod error;
pub mod models;
pub mod protocol;
pub mod utils;
pub mod validation;

// Re-export commonly used types for convenience
pub use error::{Result, TunnelError};
pub use models::TunnelAssignment;
pub use protocol::{BrokerErrorResponse, BrokerResponse};
pub use utils::generate_connection_id;
pub use validation::validate_subdomain;
