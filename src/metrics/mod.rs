//! Prometheus metrics for monitoring
//!
//! Exposes metrics for:
//! - Estimation requests and stale-response discards
//! - Allowance approvals and bridge transfers
//! - Validation failures

use crate::error::BridgeResult;

use axum::{routing::get, Router};
use lazy_static::lazy_static;
use prometheus::{register_counter_vec, CounterVec, Encoder, TextEncoder};
use std::net::SocketAddr;
use tracing::info;

lazy_static! {
    // Estimation metrics
    pub static ref ESTIMATES_SERVED: CounterVec = register_counter_vec!(
        "bridgepay_estimates_served_total",
        "Total exchange-rate estimates served",
        &["origin", "destination"]
    ).unwrap();

    pub static ref ESTIMATE_FAILURES: CounterVec = register_counter_vec!(
        "bridgepay_estimate_failures_total",
        "Total estimates that failed at the price API",
        &[]
    ).unwrap();

    pub static ref ESTIMATES_STALE: CounterVec = register_counter_vec!(
        "bridgepay_estimates_stale_total",
        "Total estimation responses discarded as stale",
        &[]
    ).unwrap();

    // Contract call metrics
    pub static ref APPROVALS_SUBMITTED: CounterVec = register_counter_vec!(
        "bridgepay_approvals_submitted_total",
        "Total allowance approvals submitted",
        &["token"]
    ).unwrap();

    pub static ref TRANSFERS_SUBMITTED: CounterVec = register_counter_vec!(
        "bridgepay_transfers_submitted_total",
        "Total bridge transfers submitted",
        &["source", "destination"]
    ).unwrap();

    pub static ref TRANSFER_FAILURES: CounterVec = register_counter_vec!(
        "bridgepay_transfer_failures_total",
        "Total bridge transfers that failed",
        &[]
    ).unwrap();

    // Input metrics
    pub static ref VALIDATION_FAILURES: CounterVec = register_counter_vec!(
        "bridgepay_validation_failures_total",
        "Total form validation failures by field",
        &["field"]
    ).unwrap();
}

/// Prometheus metrics server
pub struct MetricsServer {
    port: u16,
}

impl MetricsServer {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    pub async fn run(&self) -> BridgeResult<()> {
        let app = Router::new().route("/metrics", get(metrics_handler));

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        info!("Starting metrics server on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
        axum::serve(listener, app).await.unwrap();

        Ok(())
    }
}

async fn metrics_handler() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

// Helper functions to record metrics

pub fn record_estimate(origin: &str, destination: &str) {
    ESTIMATES_SERVED
        .with_label_values(&[origin, destination])
        .inc();
}

pub fn record_estimate_failure() {
    ESTIMATE_FAILURES.with_label_values(&[]).inc();
}

pub fn record_estimate_stale() {
    ESTIMATES_STALE.with_label_values(&[]).inc();
}

pub fn record_approval(token: &str) {
    APPROVALS_SUBMITTED.with_label_values(&[token]).inc();
}

pub fn record_transfer(source: &str, destination: &str) {
    TRANSFERS_SUBMITTED
        .with_label_values(&[source, destination])
        .inc();
}

pub fn record_transfer_failure() {
    TRANSFER_FAILURES.with_label_values(&[]).inc();
}

pub fn record_validation_failure(field: &str) {
    VALIDATION_FAILURES.with_label_values(&[field]).inc();
}
