//! # flow-core
//!
//! In-process telemetry pipeline correlating static application structure
//! graphs with runtime execution traces into enriched, queryable flow
//! graphs.
//!
//! Flow Core sits between three external collaborators:
//!
//! - a build-time **Adapter** that uploads static graph definitions,
//! - a runtime **Plugin** that emits per-trace event batches,
//! - a **UI/analytics layer** that reads merged graphs, zoom slices, trace
//!   timelines, and Cypher exports.
//!
//! ## Architecture
//!
//! ```text
//! Static Submit  ─┐
//!                 ├─► Ingest Queue ─► Worker Pool ──► Graph Store
//! Runtime Submit ─┘                        │               ▲
//!                                          └─► Merge Engine ┘
//!                                                   ▲
//!                                            Trace Buffer
//! ```
//!
//! [`FlowCore`] is the composition root: it wires the ingest queue, worker
//! pool, graph store, trace buffer, merge engine, and extractor/exporter
//! together and exposes the handler-style operations external collaborators
//! call.
//!
//! The core persists nothing across process restarts and provides no
//! cross-node consensus or partial-update streaming.

#![warn(missing_docs)]

pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod extract;
pub mod merge;
pub mod metrics;
pub mod model;
pub mod payload;
pub mod queue;
pub mod store;
pub mod trace;
pub mod workers;

#[cfg(feature = "service")]
pub mod service;

pub use api::FlowCore;
pub use clock::{Clock, SharedClock, SystemClock};
pub use config::Config;
pub use error::CoreError;
pub use model::{Edge, EdgeType, Graph, GraphId, Node, NodeId, NodeType, TraceId, Visibility, ZoomLevel};

/// Schema version for the submitted-payload contract. Bumped only on
/// breaking wire-format changes.
pub const PAYLOAD_SCHEMA_VERSION: &str = "1";
