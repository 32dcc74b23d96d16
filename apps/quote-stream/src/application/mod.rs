//! Application Layer - Port definitions.
//!
//! Contracts the infrastructure adapters implement and the HTTP layer
//! consumes.

/// Provider port implemented by every quote source.
pub mod ports;
