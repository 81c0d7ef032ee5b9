//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by route, status
//! - `gateway_request_duration_seconds` (histogram): latency by route
//! - `gateway_policy_rejections_total` (counter): admission/breaker/timeout rejections
//! - `gateway_fallbacks_total` (counter): fallback invocations by route and failure kind
//! - `gateway_circuit_state` (gauge): 0=closed, 1=open, 2=half-open
//! - `gateway_retry_attempts_total` (counter): retries issued per policy
//!
//! Recording without an installed recorder is a no-op, so unit tests need no setup.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder with its HTTP scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(route: &str, status: u16, start: Instant) {
    metrics::counter!(
        "gateway_requests_total",
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("gateway_request_duration_seconds", "route" => route.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_policy_rejection(policy: &str, kind: &'static str) {
    metrics::counter!(
        "gateway_policy_rejections_total",
        "policy" => policy.to_string(),
        "kind" => kind
    )
    .increment(1);
}

pub fn record_fallback(route: &str, kind: &'static str) {
    metrics::counter!(
        "gateway_fallbacks_total",
        "route" => route.to_string(),
        "kind" => kind
    )
    .increment(1);
}

pub fn record_circuit_state(policy: &str, state: u8) {
    metrics::gauge!("gateway_circuit_state", "policy" => policy.to_string()).set(f64::from(state));
}

pub fn record_retry(policy: &str) {
    metrics::counter!("gateway_retry_attempts_total", "policy" => policy.to_string()).increment(1);
}
