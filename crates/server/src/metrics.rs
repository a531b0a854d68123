//! Prometheus metrics for the Tally server.
//!
//! The `/metrics` endpoint is unauthenticated so Prometheus can scrape it.
//! Metrics carry operation names only, never request data.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use std::sync::{LazyLock, Once};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// Counter service metrics
pub static COUNTER_OPERATIONS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "tally_counter_operations_total",
            "Total counter operations completed, by operation",
        ),
        &["operation"],
    )
    .expect("metric creation failed")
});

pub static COUNTER_ERRORS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "tally_counter_errors_total",
            "Total counter operations that failed, by operation",
        ),
        &["operation"],
    )
    .expect("metric creation failed")
});

pub static COUNTER_OPERATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "tally_counter_operation_duration_seconds",
            "Time taken by a counter operation, including the commit",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
        &["operation"],
    )
    .expect("metric creation failed")
});

// Health metrics
pub static HEALTH_CHECK_FAILURES: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "tally_health_check_failures_total",
        "Total health probes that could not reach the database",
    )
    .expect("metric creation failed")
});

static REGISTER: Once = Once::new();

/// Register all metrics with the global registry. Safe to call more than once.
pub fn register_metrics() {
    REGISTER.call_once(|| {
        REGISTRY
            .register(Box::new(COUNTER_OPERATIONS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(COUNTER_ERRORS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(COUNTER_OPERATION_DURATION.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(HEALTH_CHECK_FAILURES.clone()))
            .expect("metric registration failed");
    });
}

/// GET /metrics - Prometheus metrics endpoint.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        ),
    }
}

/// Record a completed counter operation.
pub fn record_counter_operation(operation: &str, elapsed_secs: f64) {
    COUNTER_OPERATIONS.with_label_values(&[operation]).inc();
    COUNTER_OPERATION_DURATION
        .with_label_values(&[operation])
        .observe(elapsed_secs);
}

/// Record a failed counter operation.
pub fn record_counter_error(operation: &str) {
    COUNTER_ERRORS.with_label_values(&[operation]).inc();
}
