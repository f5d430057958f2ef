//! Prometheus Metrics Module
//!
//! Provides application-wide metrics collection using Prometheus.
//!
//! # Metrics Collected
//! - HTTP request counts by method, path, and status
//! - HTTP request latency histograms
//! - Connected socket gauge
//! - Broadcast activities by kind
//! - Events dropped by lagging sockets

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use tracing::error;

const NAMESPACE: &str = "crm";

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// HTTP request counter - tracks total requests by method, path, and status code
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests").namespace(NAMESPACE),
        &["method", "path", "status"],
    )
    .expect("Failed to create HTTP_REQUESTS_TOTAL metric")
});

/// HTTP request latency histogram - tracks request duration in seconds
pub static HTTP_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let buckets = vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];
    HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request latency in seconds",
        )
        .namespace(NAMESPACE)
        .buckets(buckets),
        &["method", "path"],
    )
    .expect("Failed to create HTTP_REQUEST_DURATION_SECONDS metric")
});

/// Currently connected sockets
pub static SOCKETS_CONNECTED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::with_opts(
        Opts::new("sockets_connected", "Number of connected realtime sockets")
            .namespace(NAMESPACE),
    )
    .expect("Failed to create SOCKETS_CONNECTED metric")
});

/// Activities fanned out through the hub, by kind
pub static ACTIVITIES_BROADCAST_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "activities_broadcast_total",
            "Activities broadcast to connected sockets",
        )
        .namespace(NAMESPACE),
        &["kind"],
    )
    .expect("Failed to create ACTIVITIES_BROADCAST_TOTAL metric")
});

/// Events skipped by sockets that fell behind the broadcast channel
pub static BROADCAST_LAGGED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::with_opts(
        Opts::new(
            "broadcast_lagged_events_total",
            "Events dropped because a socket lagged behind the broadcast channel",
        )
        .namespace(NAMESPACE),
    )
    .expect("Failed to create BROADCAST_LAGGED_TOTAL metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .expect("Failed to register HTTP_REQUESTS_TOTAL");
    registry
        .register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()))
        .expect("Failed to register HTTP_REQUEST_DURATION_SECONDS");
    registry
        .register(Box::new(SOCKETS_CONNECTED.clone()))
        .expect("Failed to register SOCKETS_CONNECTED");
    registry
        .register(Box::new(ACTIVITIES_BROADCAST_TOTAL.clone()))
        .expect("Failed to register ACTIVITIES_BROADCAST_TOTAL");
    registry
        .register(Box::new(BROADCAST_LAGGED_TOTAL.clone()))
        .expect("Failed to register BROADCAST_LAGGED_TOTAL");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Helper to record HTTP request metrics
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration_secs);
}

/// Helper to update the connected socket gauge
pub fn set_sockets_connected(count: usize) {
    SOCKETS_CONNECTED.set(count as i64);
}

/// Helper to count a broadcast activity
pub fn record_activity_broadcast(kind: &str) {
    ACTIVITIES_BROADCAST_TOTAL.with_label_values(&[kind]).inc();
}

/// Helper to count events a lagging socket skipped
pub fn record_lagged(skipped: u64) {
    BROADCAST_LAGGED_TOTAL.inc_by(skipped);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registration() {
        // Force lazy initialization
        let _ = &*REGISTRY;
        let _ = &*HTTP_REQUESTS_TOTAL;
        let _ = &*SOCKETS_CONNECTED;
        let _ = &*ACTIVITIES_BROADCAST_TOTAL;
        let _ = &*BROADCAST_LAGGED_TOTAL;
    }

    #[test]
    fn test_record_http_request() {
        record_http_request("GET", "/health", 200, 0.001);
        let metrics = gather_metrics();
        assert!(metrics.contains("crm_http_requests_total"));
    }

    #[test]
    fn test_realtime_metrics_are_exported() {
        set_sockets_connected(3);
        record_activity_broadcast("deal_closed");
        record_lagged(2);
        let metrics = gather_metrics();
        assert!(metrics.contains("crm_sockets_connected"));
        assert!(metrics.contains("kind=\"deal_closed\""));
        assert!(metrics.contains("crm_broadcast_lagged_events_total"));
    }
}
