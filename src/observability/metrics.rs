//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): forwarded attempts by method,
//!   status, target
//! - `gateway_request_duration_seconds` (histogram): end-to-end forward
//!   latency per target
//! - `gateway_rate_limited_total` (counter): rejected admissions per key
//! - `gateway_upstream_errors_total` (counter): connection-level upstream
//!   failures per target
//! - `gateway_usage_write_failures_total` (counter): billing discrepancies
//!   that need operator attention

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        tracing::error!(error = %e, "failed to install metrics exporter");
    } else {
        tracing::info!(address = %addr, "metrics endpoint listening");
    }
}

pub fn record_request(method: &str, status: u16, target: &str, start: Instant) {
    counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "target" => target.to_string(),
    )
    .increment(1);
    histogram!("gateway_request_duration_seconds", "target" => target.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited(key_id: &str) {
    counter!("gateway_rate_limited_total", "key" => key_id.to_string()).increment(1);
}

pub fn record_upstream_error(target: &str) {
    counter!("gateway_upstream_errors_total", "target" => target.to_string()).increment(1);
}

pub fn record_usage_write_failure(target: &str) {
    counter!("gateway_usage_write_failures_total", "target" => target.to_string()).increment(1);
}
