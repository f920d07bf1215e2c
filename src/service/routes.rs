//! Axum routes for the Flow Core service: the nine core operations plus
//! health/liveness/readiness, with the error-to-HTTP-status mapping.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::model::{GraphId, TraceId};
use crate::payload::{EventPayload, StaticGraphPayload};
use crate::store::GraphMetadata;
use crate::trace::Trace;
use crate::PAYLOAD_SCHEMA_VERSION;

use super::state::ServiceState;

/// Structured error body. `code` is [`CoreError::code`]; stable across
/// restarts, unlike `error` which is the human-readable `Display` text.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub error: String,
}

impl From<&CoreError> for ErrorResponse {
    fn from(err: &CoreError) -> Self {
        Self { code: err.code().to_string(), error: err.to_string() }
    }
}

/// Maps a [`CoreError`] onto an HTTP status.
fn status_for(err: &CoreError) -> StatusCode {
    match err {
        CoreError::ValidationError(_) => StatusCode::BAD_REQUEST,
        CoreError::GraphNotFound(_) | CoreError::TraceNotFound(_) => StatusCode::NOT_FOUND,
        CoreError::QueueFull => StatusCode::SERVICE_UNAVAILABLE,
        CoreError::InvalidReference { .. } => StatusCode::BAD_REQUEST,
        CoreError::MergeConflict(_) | CoreError::MergeInvalid(_) | CoreError::Unavailable(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        CoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for &CoreError {
    fn into_response(self) -> axum::response::Response {
        (status_for(self), Json(ErrorResponse::from(self))).into_response()
    }
}

fn err_response(err: CoreError) -> (StatusCode, Json<ErrorResponse>) {
    (status_for(&err), Json(ErrorResponse::from(&err)))
}

async fn submit_static_handler(
    State(state): State<ServiceState>,
    Json(payload): Json<StaticGraphPayload>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    let graph_id = payload.graph_id();
    state.core.submit_static(graph_id, payload).await.map_err(err_response)?;
    Ok(StatusCode::ACCEPTED)
}

async fn submit_runtime_handler(
    State(state): State<ServiceState>,
    Json(payload): Json<EventPayload>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    let trace_id = payload.trace_id();
    let graph_id = payload.graph_id();
    let trace_complete = payload.trace_complete;
    state
        .core
        .submit_runtime(trace_id, graph_id, payload, trace_complete)
        .await
        .map_err(err_response)?;
    Ok(StatusCode::ACCEPTED)
}

async fn get_graph_handler(
    State(state): State<ServiceState>,
    Path(graph_id): Path<String>,
) -> Result<Json<crate::model::Graph>, (StatusCode, Json<ErrorResponse>)> {
    let graph = state.core.get_graph(&GraphId::new(graph_id)).map_err(err_response)?;
    Ok(Json(graph))
}

async fn list_graphs_handler(State(state): State<ServiceState>) -> Json<Vec<GraphMetadata>> {
    Json(state.core.list_graphs())
}

async fn delete_graph_handler(
    State(state): State<ServiceState>,
    Path(graph_id): Path<String>,
) -> StatusCode {
    if state.core.delete_graph(&GraphId::new(graph_id)) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn slice_handler(
    State(state): State<ServiceState>,
    Path((graph_id, zoom)): Path<(String, u8)>,
) -> Result<Json<crate::model::Graph>, (StatusCode, Json<ErrorResponse>)> {
    let graph = state.core.slice(&GraphId::new(graph_id), zoom).map_err(err_response)?;
    Ok(Json(graph))
}

async fn get_trace_handler(
    State(state): State<ServiceState>,
    Path(trace_id): Path<String>,
) -> Result<Json<Trace>, (StatusCode, Json<ErrorResponse>)> {
    let trace = state.core.get_trace(&TraceId::new(trace_id)).map_err(err_response)?;
    Ok(Json(trace))
}

#[derive(Debug, Serialize)]
struct CypherResponse {
    statements: Vec<String>,
}

async fn export_cypher_handler(
    State(state): State<ServiceState>,
    Path(graph_id): Path<String>,
) -> Result<Json<CypherResponse>, (StatusCode, Json<ErrorResponse>)> {
    let statements = state.core.export_cypher(&GraphId::new(graph_id)).map_err(err_response)?;
    Ok(Json(CypherResponse { statements }))
}

async fn push_to_analytics_handler(
    State(state): State<ServiceState>,
    Path(graph_id): Path<String>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    state.core.push_to_analytics(&GraphId::new(graph_id)).await.map_err(err_response)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Full service status: queue health, degraded flag, schema version.
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    schema_version: &'static str,
    queue_size: usize,
    queue_capacity: usize,
    queue_utilization_percent: f64,
}

async fn health_handler(State(state): State<ServiceState>) -> Json<HealthResponse> {
    let health = state.core.queue_health();
    let degraded = state.core.is_degraded();
    Json(HealthResponse {
        status: if degraded { "degraded" } else { "healthy" },
        schema_version: PAYLOAD_SCHEMA_VERSION,
        queue_size: health.size,
        queue_capacity: health.capacity,
        queue_utilization_percent: health.utilization_percent,
    })
}

#[derive(Debug, Serialize)]
struct LivenessResponse {
    status: &'static str,
}

/// Process-alive check only; never inspects queue/worker state. Cloud
/// schedulers that restart on liveness failure shouldn't restart the whole
/// process just because ingest is backpressured.
async fn liveness_handler() -> Json<LivenessResponse> {
    Json(LivenessResponse { status: "alive" })
}

#[derive(Debug, Serialize)]
struct ReadinessResponse {
    ready: bool,
}

/// Not ready once backpressured — a load balancer should stop routing new
/// submissions here until the queue drains, rather than adding to a pile
/// the worker pool is already behind on.
async fn readiness_handler(
    State(state): State<ServiceState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    if state.core.is_degraded() {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(ReadinessResponse { ready: false })))
    } else {
        Ok(Json(ReadinessResponse { ready: true }))
    }
}

/// Builds the router. Handlers take `ServiceState` directly rather than
/// `Arc<ServiceState>` — it is already a thin `Arc<FlowCore>` wrapper.
pub fn create_router(state: ServiceState) -> Router {
    Router::new()
        .route("/api/graphs", post(submit_static_handler))
        .route("/api/graphs", get(list_graphs_handler))
        .route("/api/graphs/:graph_id", get(get_graph_handler))
        .route("/api/graphs/:graph_id", delete(delete_graph_handler))
        .route("/api/graphs/:graph_id/slice/:zoom", get(slice_handler))
        .route("/api/graphs/:graph_id/cypher", get(export_cypher_handler))
        .route("/api/graphs/:graph_id/push", post(push_to_analytics_handler))
        .route("/api/traces", post(submit_runtime_handler))
        .route("/api/traces/:trace_id", get(get_trace_handler))
        .route("/health", get(health_handler))
        .route("/health/live", get(liveness_handler))
        .route("/health/ready", get(readiness_handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::FlowCore;
    use crate::clock::ManualClock;
    use crate::config::Config;
    use crate::extract::NullSink;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::Utc;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn router() -> Router {
        let core = FlowCore::with_clock_and_sink(
            Config::default(),
            Arc::new(ManualClock::new(Utc::now())),
            Arc::new(NullSink),
        );
        create_router(ServiceState::new(core))
    }

    #[tokio::test]
    async fn get_graph_on_missing_id_returns_404() {
        let response = router()
            .oneshot(
                Request::builder()
                    .uri("/api/graphs/missing")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn liveness_always_reports_alive() {
        let response = router()
            .oneshot(Request::builder().uri("/health/live").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn submit_static_is_accepted_for_async_processing() {
        // Validation (e.g. the "at least one node" rule) happens in the
        // worker pool, not at submission time, so even a payload a worker
        // will later reject still gets a 202 here.
        let body = serde_json::json!({
            "graphId": "g1",
            "version": "1",
            "nodes": [],
            "edges": [],
        });
        let response = router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/graphs")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }
}
