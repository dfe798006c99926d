//! Prometheus metrics and structured logging for hlsign.
//!
//! - Prometheus counters and histograms for signed and rejected requests
//! - Structured logging with tracing (JSON in production)
//! - [`PrometheusObserver`] bridging the signing engine to the metrics

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::{Metrics, PrometheusObserver};
