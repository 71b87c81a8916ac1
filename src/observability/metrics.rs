//! Metrics collection and exposition.
//!
//! # Metrics
//! - `waypost_requests_total` (counter): dispatched requests by method, route, status
//! - `waypost_request_duration_seconds` (histogram): dispatch latency by method, route
//! - `waypost_handler_failures_total` (counter): errors and panics recovered per route
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(method: &str, route: &str, status: u16, start: Instant) {
    let elapsed = start.elapsed().as_secs_f64();
    counter!(
        "waypost_requests_total",
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "waypost_request_duration_seconds",
        "method" => method.to_string(),
        "route" => route.to_string()
    )
    .record(elapsed);
}

pub fn record_handler_failure(route: &str) {
    counter!("waypost_handler_failures_total", "route" => route.to_string()).increment(1);
}
