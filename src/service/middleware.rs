//! Request metrics middleware: explicit counters incremented at enumerated
//! call sites, not framework-glue metrics.

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::info;

/// Logs one structured line per request: path (with ids normalized out),
/// method, status, and latency. A real metrics backend would increment
/// counters/histograms here instead of just logging; this crate's metrics
/// live on [`crate::metrics::Metrics`] and are read directly by the health
/// handlers rather than scraped from these log lines.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = normalize_path(request.uri().path());

    let response = next.run(request).await;

    info!(
        target: "flow_core::metrics",
        path = %path,
        method = %method,
        status = response.status().as_u16(),
        latency_ms = start.elapsed().as_millis() as u64,
        "request_metric"
    );

    response
}

/// Replaces path segments that look like graph/trace ids or zoom levels
/// with `:id` so per-path metrics don't explode in cardinality. Graph and
/// trace ids are submitter-chosen strings, not UUIDs (`order-service`,
/// `svc::pay#charge`), so this whitelists the known route words rather than
/// pattern-matching an id shape.
fn normalize_path(path: &str) -> String {
    const ROUTE_WORDS: &[&str] = &["api", "graphs", "traces", "slice", "cypher", "push", "health", "live", "ready"];

    path.split('/')
        .map(|segment| {
            if segment.is_empty() || ROUTE_WORDS.contains(&segment) {
                segment.to_string()
            } else {
                ":id".to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
