//! Prometheus metrics and structured logging for the order management core.
//!
//! - Prometheus counters for orders, close outcomes, timeouts and notifier failures
//! - Order latency histogram
//! - Structured JSON logging with tracing

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
