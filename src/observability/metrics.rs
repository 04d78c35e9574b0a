//! Metrics collection and exposition.
//!
//! # Metrics
//! - `edge_router_requests_total` (counter): requests by backend, environment, status
//! - `edge_router_request_duration_seconds` (histogram): latency per backend
//! - `edge_router_redirects_total` (counter): static redirects by path
//! - `edge_router_upstream_errors_total` (counter): failed fetches per backend
//! - `edge_router_access_log_failures_total` (counter): access-log posts that failed
//!
//! # Design Decisions
//! - Updates go through the `metrics` facade and are no-ops until a
//!   recorder is installed
//! - Redirect paths are the only free-form label; configuration bounds them

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::routing::types::{Backend, Environment};

pub const REQUESTS_TOTAL: &str = "edge_router_requests_total";
pub const REQUEST_DURATION: &str = "edge_router_request_duration_seconds";
pub const REDIRECTS_TOTAL: &str = "edge_router_redirects_total";
pub const UPSTREAM_ERRORS_TOTAL: &str = "edge_router_upstream_errors_total";
pub const ACCESS_LOG_FAILURES_TOTAL: &str = "edge_router_access_log_failures_total";

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    describe_counter!(REQUESTS_TOTAL, "Total number of forwarded requests");
    describe_histogram!(REQUEST_DURATION, "Duration of forwarded requests in seconds");
    describe_counter!(REDIRECTS_TOTAL, "Total number of static redirects served");
    describe_counter!(UPSTREAM_ERRORS_TOTAL, "Total number of failed backend fetches");
    describe_counter!(
        ACCESS_LOG_FAILURES_TOTAL,
        "Total number of access-log deliveries that failed"
    );

    tracing::info!(address = %addr, "Prometheus metrics endpoint started");
    Ok(())
}

/// Record a completed forwarded request.
pub fn record_request(
    backend: Backend,
    environment: Option<Environment>,
    status: u16,
    start: Instant,
) {
    let environment = environment.map_or("unknown", |e| e.as_str());
    counter!(
        REQUESTS_TOTAL,
        "backend" => backend.as_str(),
        "environment" => environment,
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(REQUEST_DURATION, "backend" => backend.as_str())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_redirect(path: &str) {
    counter!(REDIRECTS_TOTAL, "path" => path.to_string()).increment(1);
}

pub fn record_upstream_error(backend: Backend) {
    counter!(UPSTREAM_ERRORS_TOTAL, "backend" => backend.as_str()).increment(1);
}

pub fn record_access_log_failure() {
    counter!(ACCESS_LOG_FAILURES_TOTAL).increment(1);
}
