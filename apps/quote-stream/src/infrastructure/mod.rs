//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete quote sources implementing the
//! provider port, and the HTTP surface that exposes them.

/// Broadcast channel adapter for quote fan-out.
pub mod broadcast;

/// Configuration loaded from the environment.
pub mod config;

/// Health and metrics HTTP handlers.
pub mod health;

/// HTTP server, subscribe endpoint and quote WebSocket.
pub mod http;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Polled REST quote source.
pub mod polygon;

/// Background production task lifecycle.
pub mod producer;

/// Active provider selection.
pub mod registry;

/// Synthetic quote source.
pub mod synthetic;

/// Logging and OpenTelemetry tracing setup.
pub mod telemetry;
