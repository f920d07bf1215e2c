//! The HTTP service (feature `service`): a thin Axum layer over [`crate::api::FlowCore`].
//!
//! Endpoints:
//!
//! - `POST /api/graphs` — `submit_static`
//! - `GET /api/graphs` — `list_graphs`
//! - `GET /api/graphs/:graph_id` — `get_graph`
//! - `DELETE /api/graphs/:graph_id` — `delete_graph`
//! - `GET /api/graphs/:graph_id/slice/:zoom` — `slice`
//! - `GET /api/graphs/:graph_id/cypher` — `export_cypher`
//! - `POST /api/graphs/:graph_id/push` — `push_to_analytics`
//! - `POST /api/traces` — `submit_runtime`
//! - `GET /api/traces/:trace_id` — `get_trace`
//! - `GET /health`, `/health/live`, `/health/ready`
//!
//! DTO mapping, error-to-status translation, and request logging live here;
//! everything domain-level is delegated straight to `FlowCore`.

mod middleware;
mod routes;
mod state;

pub use middleware::metrics_middleware;
pub use routes::create_router;
pub use state::ServiceState;
