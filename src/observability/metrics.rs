//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): inbound requests by method, status, route
//! - `gateway_request_duration_seconds` (histogram): inbound latency
//! - `gateway_upstream_calls_total` (counter): upstream calls by instance and outcome
//! - `gateway_upstream_up` (gauge): 1=up, 0=down
//!
//! Without an installed recorder every call here is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint. Must run inside the Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, route: &str, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
        ("route", route.to_string()),
    ];
    counter!("gateway_requests_total", &labels).increment(1);
    histogram!("gateway_request_duration_seconds", &labels).record(start.elapsed().as_secs_f64());
}

/// `status` is `None` when the call failed below HTTP.
pub fn record_upstream_call(instance: usize, status: Option<u16>) {
    let outcome = match status {
        Some(code) => code.to_string(),
        None => "error".to_string(),
    };
    counter!(
        "gateway_upstream_calls_total",
        "instance" => instance.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_upstream_health(is_up: bool) {
    gauge!("gateway_upstream_up").set(if is_up { 1.0 } else { 0.0 });
}
