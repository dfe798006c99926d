//! Prometheus metrics for the signing pipeline.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. If registration fails,
//! it indicates a fatal configuration error (e.g., duplicate metric names)
//! that should cause an immediate crash at startup rather than silent failure.
//! These panics only occur during static initialization, never at runtime.

use std::time::Duration;

use hlsign_signer::SigningObserver;
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

use crate::error::{TelemetryError, TelemetryResult};

/// Total signed requests.
/// Labels: action (exchange `type` tag)
pub static REQUESTS_SIGNED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "hlsign_requests_signed_total",
        "Total requests signed",
        &["action"]
    )
    .unwrap()
});

/// Requests rejected before signing.
/// Labels: reason (invalid_quantity/unknown_instrument/invalid_grouping/...)
pub static VALIDATION_REJECTED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "hlsign_validation_rejected_total",
        "Total requests rejected before signing",
        &["reason"]
    )
    .unwrap()
});

/// Hash plus signature latency in microseconds.
pub static SIGN_LATENCY_US: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "hlsign_sign_latency_us",
        "Action hash and signature latency in microseconds",
        &["action"],
        vec![10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0]
    )
    .unwrap()
});

/// Metrics helper for common operations.
pub struct Metrics;

impl Metrics {
    /// Record a signed request.
    pub fn request_signed(action: &str, latency_us: f64) {
        REQUESTS_SIGNED_TOTAL.with_label_values(&[action]).inc();
        SIGN_LATENCY_US
            .with_label_values(&[action])
            .observe(latency_us);
    }

    /// Record a request rejected before signing.
    pub fn request_rejected(reason: &str) {
        VALIDATION_REJECTED_TOTAL
            .with_label_values(&[reason])
            .inc();
    }

    /// Render the default registry in the Prometheus text format.
    pub fn gather_text() -> TelemetryResult<String> {
        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&prometheus::gather(), &mut buf)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buf).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }
}

/// `SigningObserver` that feeds the Prometheus statics.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrometheusObserver;

impl SigningObserver for PrometheusObserver {
    fn on_signed(&self, action_type: &'static str, elapsed: Duration) {
        Metrics::request_signed(action_type, elapsed.as_secs_f64() * 1_000_000.0);
    }

    fn on_rejected(&self, reason: &'static str) {
        Metrics::request_rejected(reason);
    }
}
