//! Observability for the relay
//!
//! Structured logging through `tracing` and process-wide counters for
//! inbound requests and forward outcomes.

pub mod logging;
pub mod metrics;

// Re-export for convenience
pub use logging::{init_default_logging, init_logging, LogFormat};
pub use metrics::{metrics, InFlightRequest, MetricsCollector, MetricsSnapshot};

// Span macros for structured logging
pub use logging::{forward_span, relay_span};
