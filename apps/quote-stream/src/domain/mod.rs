//! Domain Layer - Core quote types and subscription tracking.
//!
//! Pure Rust types with serialization support and no I/O.

/// Quote value object and the closed symbol enumeration.
pub mod quote;

/// Tracked symbol set and subscribe outcomes.
pub mod subscription;
