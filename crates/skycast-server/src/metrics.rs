//! Prometheus metrics for the SkyCast server.
//!
//! This module provides:
//! - HTTP request metrics (count, latency)
//! - Forecast cache metrics (hits, misses, stale refreshes)
//! - Upstream and store failure counters

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use skycast_storage::ErrorCategory;
use std::sync::OnceLock;
use std::time::Duration;

/// Global Prometheus handle for rendering metrics.
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";

    // Forecast cache metrics
    pub const FORECAST_CACHE_LOOKUPS_TOTAL: &str = "forecast_cache_lookups_total";
    pub const FORECAST_UPSTREAM_FAILURES_TOTAL: &str = "forecast_upstream_failures_total";
    pub const FORECAST_STORE_READ_FAILURES_TOTAL: &str = "forecast_store_read_failures_total";
    pub const FORECAST_STORE_WRITE_FAILURES_TOTAL: &str = "forecast_store_write_failures_total";
}

/// Outcome of checking the store for a city.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    Hit,
    Miss,
    Stale,
}

impl CacheOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::Miss => "miss",
            Self::Stale => "stale",
        }
    }
}

/// Initialize the Prometheus metrics exporter.
///
/// This should be called once at server startup.
/// Returns `true` if initialization succeeded, `false` if already initialized.
pub fn init_metrics() -> bool {
    if PROMETHEUS_HANDLE.get().is_some() {
        tracing::debug!("Prometheus metrics already initialized");
        return false;
    }

    // Pull-based: /metrics renders from the handle
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if PROMETHEUS_HANDLE.set(handle).is_err() {
                tracing::warn!("Failed to store Prometheus handle (already set)");
                return false;
            }

            tracing::info!("Prometheus metrics initialized");
            true
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to install Prometheus recorder");
            false
        }
    }
}

/// Render all metrics in Prometheus text format.
///
/// Returns `None` if metrics were not initialized.
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|handle| handle.render())
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    let status_class = match status {
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        500..=599 => "5xx",
        _ => "other",
    };

    let route = normalize_path(path);

    counter!(
        names::HTTP_REQUESTS_TOTAL,
        "method" => method.to_string(),
        "path" => route,
        "status" => status.to_string(),
        "status_class" => status_class
    )
    .increment(1);

    histogram!(
        names::HTTP_REQUEST_DURATION_SECONDS,
        "method" => method.to_string(),
        "path" => route
    )
    .record(duration.as_secs_f64());
}

pub fn record_cache_lookup(outcome: CacheOutcome) {
    counter!(names::FORECAST_CACHE_LOOKUPS_TOTAL, "outcome" => outcome.as_str()).increment(1);
}

pub fn record_upstream_failure(kind: &'static str) {
    counter!(names::FORECAST_UPSTREAM_FAILURES_TOTAL, "kind" => kind).increment(1);
}

pub fn record_store_read_failure(category: ErrorCategory) {
    counter!(names::FORECAST_STORE_READ_FAILURES_TOTAL, "category" => category.to_string())
        .increment(1);
}

pub fn record_store_write_failure(category: ErrorCategory) {
    counter!(names::FORECAST_STORE_WRITE_FAILURES_TOTAL, "category" => category.to_string())
        .increment(1);
}

/// Maps a request path onto a fixed set of labels to bound cardinality.
fn normalize_path(path: &str) -> &'static str {
    match path {
        "/forecast" => "/forecast",
        "/healthz" => "/healthz",
        "/readyz" => "/readyz",
        "/metrics" => "/metrics",
        _ => "other",
    }
}
