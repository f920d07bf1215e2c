//! Converts a submitted static-graph payload into a validated `Graph`.
//!
//! Runs on the worker, not the ingress thread: payload parsing and graph
//! construction are pure CPU work, so doing it off the request path keeps
//! ingress latency to just the enqueue.

use crate::error::CoreError;
use crate::model::Graph;
use crate::payload::StaticGraphPayload;

pub fn load(payload: StaticGraphPayload) -> Result<Graph, CoreError> {
    payload.into_graph()
}
