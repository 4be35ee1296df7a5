//! Metrics collection for call-intake-service.
//!
//! Provides intake pipeline counters and standard Prometheus metrics.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use prometheus::{IntCounterVec, Opts, Registry};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
pub static PROMETHEUS_REGISTRY: OnceLock<Registry> = OnceLock::new();
pub static NOTIFICATIONS_RECEIVED_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static NOTIFICATIONS_DROPPED_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static CALL_PROCESSING_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static SUBSCRIPTION_REQUESTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize metrics collection.
pub fn init_metrics() {
    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    if METRICS_HANDLE.set(handle).is_err() {
        panic!("failed to set metrics handle: already initialized");
    }

    // Initialize Prometheus registry for custom metrics
    let registry = Registry::new();

    let received_counter = IntCounterVec::new(
        Opts::new(
            "notifications_received_total",
            "Total webhook deliveries received by kind",
        ),
        &["kind"],
    )
    .expect("Failed to create notifications_received_total metric");

    let dropped_counter = IntCounterVec::new(
        Opts::new(
            "notifications_dropped_total",
            "Total notifications dropped after acknowledgment by reason",
        ),
        &["reason"],
    )
    .expect("Failed to create notifications_dropped_total metric");

    let processing_counter = IntCounterVec::new(
        Opts::new(
            "call_processing_total",
            "Total per-call media processing results by outcome",
        ),
        &["outcome"],
    )
    .expect("Failed to create call_processing_total metric");

    let subscription_counter = IntCounterVec::new(
        Opts::new(
            "subscription_requests_total",
            "Total subscription registration attempts by status",
        ),
        &["status"],
    )
    .expect("Failed to create subscription_requests_total metric");

    registry
        .register(Box::new(received_counter.clone()))
        .expect("Failed to register notifications_received_total");
    registry
        .register(Box::new(dropped_counter.clone()))
        .expect("Failed to register notifications_dropped_total");
    registry
        .register(Box::new(processing_counter.clone()))
        .expect("Failed to register call_processing_total");
    registry
        .register(Box::new(subscription_counter.clone()))
        .expect("Failed to register subscription_requests_total");

    PROMETHEUS_REGISTRY
        .set(registry)
        .expect("Failed to set prometheus registry");
    NOTIFICATIONS_RECEIVED_TOTAL
        .set(received_counter)
        .expect("Failed to set notifications_received_total");
    NOTIFICATIONS_DROPPED_TOTAL
        .set(dropped_counter)
        .expect("Failed to set notifications_dropped_total");
    CALL_PROCESSING_TOTAL
        .set(processing_counter)
        .expect("Failed to set call_processing_total");
    SUBSCRIPTION_REQUESTS_TOTAL
        .set(subscription_counter)
        .expect("Failed to set subscription_requests_total");
}

/// Get metrics output in Prometheus text format.
pub fn get_metrics() -> String {
    let mut output = METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string());

    // Append custom prometheus metrics
    if let Some(registry) = PROMETHEUS_REGISTRY.get() {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).ok();
        if let Ok(custom_metrics) = String::from_utf8(buffer) {
            output.push_str(&custom_metrics);
        }
    }

    output
}

/// Record an inbound webhook delivery (`handshake` or `content`).
pub fn record_notification(kind: &str) {
    if let Some(counter) = NOTIFICATIONS_RECEIVED_TOTAL.get() {
        counter.with_label_values(&[kind]).inc();
    }
}

/// Record a notification dropped after acknowledgment.
pub fn record_drop(reason: &str) {
    if let Some(counter) = NOTIFICATIONS_DROPPED_TOTAL.get() {
        counter.with_label_values(&[reason]).inc();
    }
}

/// Record the terminal outcome of one call's media processing.
pub fn record_call_outcome(outcome: &str) {
    if let Some(counter) = CALL_PROCESSING_TOTAL.get() {
        counter.with_label_values(&[outcome]).inc();
    }
}

/// Record a subscription registration attempt.
pub fn record_subscription(status: &str) {
    if let Some(counter) = SUBSCRIPTION_REQUESTS_TOTAL.get() {
        counter.with_label_values(&[status]).inc();
    }
}
