// Copyright 2026 Dropbox (created by Andrew Yates <ayates@dropbox.com>)
// Driftwatch Core - Service Metrics

//! # Service Metrics
//!
//! Prometheus metrics for the ingestion pipeline and HTTP transport, held in
//! an explicit registry handle rather than process-global statics: construct
//! one [`ServiceMetrics`], wrap it in an `Arc`, and pass it to the components
//! that record into it.
//!
//! Metric names follow Prometheus conventions:
//! - Counters end with `_total`
//! - Histograms carry a unit suffix (`_seconds`)
//!
//! Note: the Rust `prometheus` crate exposes metric names exactly as
//! provided (no auto-suffix), so `_total` is part of the name itself.

use crate::error::Result;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

// ============================================================================
// Metric name constants
// ============================================================================

/// Total HTTP requests, labeled by path/method/status.
pub const METRIC_HTTP_REQUESTS_TOTAL: &str = "driftwatch_http_requests_total";

/// HTTP request latency histogram, labeled by path/method.
pub const METRIC_HTTP_REQUEST_DURATION_SECONDS: &str =
    "driftwatch_http_request_duration_seconds";

/// Total samples drained from the ingest buffer and fed to the analyzer.
pub const METRIC_SAMPLES_INGESTED_TOTAL: &str = "driftwatch_samples_ingested_total";

/// Total samples classified anomalous.
pub const METRIC_ANOMALIES_TOTAL: &str = "driftwatch_anomalies_total";

/// Total enqueue attempts rejected with backpressure.
pub const METRIC_BUFFER_REJECTIONS_TOTAL: &str = "driftwatch_buffer_rejections_total";

/// Total best-effort persistence calls that failed or timed out.
pub const METRIC_PERSISTENCE_FAILURES_TOTAL: &str = "driftwatch_persistence_failures_total";

/// Default buckets for HTTP request duration in seconds.
/// Tight low end: both endpoints are O(1) and should answer in milliseconds.
fn default_duration_buckets_seconds() -> Vec<f64> {
    vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
}

/// Typed handles to every metric the service records, plus the registry
/// that owns them.
pub struct ServiceMetrics {
    registry: Registry,

    /// HTTP requests by path/method/status.
    pub http_requests_total: IntCounterVec,
    /// HTTP request latency by path/method.
    pub http_request_duration_seconds: HistogramVec,
    /// Samples fed to the analyzer.
    pub samples_ingested_total: IntCounter,
    /// Samples classified anomalous.
    pub anomalies_total: IntCounter,
    /// Backpressure rejections at the ingest boundary.
    pub buffer_rejections_total: IntCounter,
    /// Persistence failures/timeouts (swallowed, but counted).
    pub persistence_failures_total: IntCounter,
}

impl ServiceMetrics {
    /// Create a fresh registry and register every service metric into it.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Metrics`] if registration fails (only
    /// possible with duplicate names, which the constants rule out).
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new(METRIC_HTTP_REQUESTS_TOTAL, "Total HTTP requests"),
            &["path", "method", "status"],
        )?;
        registry.register(Box::new(http_requests_total.clone()))?;

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                METRIC_HTTP_REQUEST_DURATION_SECONDS,
                "HTTP request latency in seconds",
            )
            .buckets(default_duration_buckets_seconds()),
            &["path", "method"],
        )?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;

        let samples_ingested_total = IntCounter::with_opts(Opts::new(
            METRIC_SAMPLES_INGESTED_TOTAL,
            "Total samples drained from the ingest buffer",
        ))?;
        registry.register(Box::new(samples_ingested_total.clone()))?;

        let anomalies_total = IntCounter::with_opts(Opts::new(
            METRIC_ANOMALIES_TOTAL,
            "Total detected anomalies",
        ))?;
        registry.register(Box::new(anomalies_total.clone()))?;

        let buffer_rejections_total = IntCounter::with_opts(Opts::new(
            METRIC_BUFFER_REJECTIONS_TOTAL,
            "Total ingest requests rejected due to a full buffer",
        ))?;
        registry.register(Box::new(buffer_rejections_total.clone()))?;

        let persistence_failures_total = IntCounter::with_opts(Opts::new(
            METRIC_PERSISTENCE_FAILURES_TOTAL,
            "Total best-effort sample persistence failures",
        ))?;
        registry.register(Box::new(persistence_failures_total.clone()))?;

        Ok(Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            samples_ingested_total,
            anomalies_total,
            buffer_rejections_total,
            persistence_failures_total,
        })
    }

    /// Render every registered metric in the Prometheus text format.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Metrics`] if encoding fails.
    pub fn export(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&families, &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| crate::Error::Metrics(format!("metrics output not UTF-8: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        assert!(ServiceMetrics::new().is_ok());
    }

    #[test]
    fn test_counter_names_end_with_total() {
        let counters = [
            METRIC_HTTP_REQUESTS_TOTAL,
            METRIC_SAMPLES_INGESTED_TOTAL,
            METRIC_ANOMALIES_TOTAL,
            METRIC_BUFFER_REJECTIONS_TOTAL,
            METRIC_PERSISTENCE_FAILURES_TOTAL,
        ];
        for name in counters {
            assert!(name.ends_with("_total"), "counter '{name}' must end with '_total'");
        }
    }

    #[test]
    fn test_all_metrics_have_prefix() {
        let all = [
            METRIC_HTTP_REQUESTS_TOTAL,
            METRIC_HTTP_REQUEST_DURATION_SECONDS,
            METRIC_SAMPLES_INGESTED_TOTAL,
            METRIC_ANOMALIES_TOTAL,
            METRIC_BUFFER_REJECTIONS_TOTAL,
            METRIC_PERSISTENCE_FAILURES_TOTAL,
        ];
        for name in all {
            assert!(
                name.starts_with("driftwatch_"),
                "metric '{name}' must start with 'driftwatch_'"
            );
        }
    }

    #[test]
    fn test_export_contains_registered_metrics() {
        let metrics = ServiceMetrics::new().unwrap();
        metrics.anomalies_total.inc();
        metrics
            .http_requests_total
            .with_label_values(&["/ingest", "POST", "202"])
            .inc();
        let text = metrics.export().unwrap();
        assert!(text.contains("# HELP"));
        assert!(text.contains(METRIC_ANOMALIES_TOTAL));
        assert!(text.contains(METRIC_HTTP_REQUESTS_TOTAL));
    }

    #[test]
    fn test_independent_registries() {
        // Two handles never share counters — no ambient global state.
        let a = ServiceMetrics::new().unwrap();
        let b = ServiceMetrics::new().unwrap();
        a.anomalies_total.inc();
        assert_eq!(a.anomalies_total.get(), 1);
        assert_eq!(b.anomalies_total.get(), 0);
    }
}
