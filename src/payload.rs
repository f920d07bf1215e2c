//! Wire payloads and their conversion into the canonical model.
//!
//! These are the shapes submitters actually post. Unknown enum strings and
//! missing required fields fail validation at this boundary with
//! `CoreError::ValidationError` rather than being silently coerced — once a
//! payload is converted, everything downstream trusts the canonical types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::CoreError;
use crate::model::{Edge, EdgeId, EdgeType, EventId, GraphId, Node, NodeId, NodeType, SpanId, TraceId, Visibility};
use crate::trace::{EventType, RuntimeEvent};

/// A submitted node, as it appears on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodePayload {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(rename = "serviceId")]
    pub service_id: Option<String>,
    pub visibility: Option<String>,
}

impl NodePayload {
    pub fn into_node(self) -> Result<Node, CoreError> {
        let node_type = NodeType::from_str(&self.node_type)
            .ok_or_else(|| CoreError::ValidationError(format!("unknown node type: {}", self.node_type)))?;

        let visibility = match self.visibility {
            Some(v) => Visibility::from_str(&v)
                .ok_or_else(|| CoreError::ValidationError(format!("unknown visibility: {v}")))?,
            None => Visibility::default(),
        };

        // Service-id defaults to the portion of the node-id before the
        // first "::" separator, mirroring how the static adapter derives it
        // when an element has no declared owning service.
        let service_id = self.service_id.unwrap_or_else(|| {
            self.id
                .split("::")
                .next()
                .unwrap_or(&self.id)
                .to_string()
        });

        Ok(Node::new(NodeId::new(self.id), self.name, node_type, service_id).with_visibility(visibility))
    }
}

/// A submitted edge, as it appears on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgePayload {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub edge_type: String,
}

impl EdgePayload {
    pub fn into_edge(self) -> Result<Edge, CoreError> {
        let edge_type = EdgeType::from_str(&self.edge_type)
            .ok_or_else(|| CoreError::ValidationError(format!("unknown edge type: {}", self.edge_type)))?;

        Ok(Edge::new(
            EdgeId::new(self.id),
            NodeId::new(self.source),
            NodeId::new(self.target),
            edge_type,
        ))
    }
}

/// A submitted static graph (`submit_static`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticGraphPayload {
    #[serde(rename = "graphId")]
    pub graph_id: String,
    pub version: Option<String>,
    pub nodes: Vec<NodePayload>,
    pub edges: Vec<EdgePayload>,
}

impl StaticGraphPayload {
    pub fn graph_id(&self) -> GraphId {
        GraphId::new(self.graph_id.clone())
    }

    /// Builds a validated `Graph`, rejecting edges whose endpoints are
    /// missing (same rule as `Graph::add_edge`, surfaced here as a
    /// validation error rather than an internal one since it is caught on
    /// the submitter's own payload).
    pub fn into_graph(self) -> Result<crate::model::Graph, CoreError> {
        if self.nodes.is_empty() {
            return Err(CoreError::ValidationError("static graph must declare at least one node".into()));
        }

        let version = self.version.unwrap_or_else(|| "1".to_string());
        let mut graph = crate::model::Graph::new(version);

        for node in self.nodes {
            let node = node.into_node()?;
            graph
                .add_node(node)
                .map_err(|e| CoreError::ValidationError(e.to_string()))?;
        }
        for edge in self.edges {
            let edge = edge.into_edge()?;
            graph.add_edge(edge)?;
        }

        Ok(graph)
    }
}

/// A single submitted runtime event, as it appears on the wire. Named
/// optional fields (`correlationId`, `errorMessage`, `errorType`,
/// `durationMs`) are folded into the canonical event's open `attributes` bag
/// on conversion — the canonical model has no dedicated fields for them
/// because not every event carries them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeEventPayload {
    #[serde(rename = "eventId")]
    pub event_id: Option<String>,
    #[serde(rename = "spanId")]
    pub span_id: String,
    #[serde(rename = "parentSpanId")]
    pub parent_span_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(rename = "nodeId")]
    pub node_id: String,
    #[serde(rename = "correlationId")]
    pub correlation_id: Option<String>,
    #[serde(rename = "errorMessage")]
    pub error_message: Option<String>,
    #[serde(rename = "errorType")]
    pub error_type: Option<String>,
    #[serde(rename = "durationMs")]
    pub duration_ms: Option<f64>,
    pub name: Option<String>,
    pub data: Option<serde_json::Value>,
}

impl RuntimeEventPayload {
    pub fn into_event(self, trace_id: TraceId) -> Result<RuntimeEvent, CoreError> {
        let event_type = EventType::from_str(&self.event_type)
            .ok_or_else(|| CoreError::ValidationError(format!("unknown event type: {}", self.event_type)))?;

        let mut attributes = BTreeMap::new();
        if let Some(v) = self.correlation_id {
            attributes.insert("correlationId".to_string(), serde_json::Value::String(v));
        }
        if let Some(v) = self.error_message {
            attributes.insert("errorMessage".to_string(), serde_json::Value::String(v));
        }
        if let Some(v) = self.error_type {
            attributes.insert("errorType".to_string(), serde_json::Value::String(v));
        }
        if let Some(v) = self.duration_ms {
            attributes.insert(
                "durationMs".to_string(),
                serde_json::Number::from_f64(v).map(serde_json::Value::Number).unwrap_or(serde_json::Value::Null),
            );
        }
        if let Some(v) = self.name {
            attributes.insert("name".to_string(), serde_json::Value::String(v));
        }
        if let Some(v) = self.data {
            attributes.insert("data".to_string(), v);
        }

        Ok(RuntimeEvent {
            event_id: self.event_id.map(EventId::new),
            trace_id,
            span_id: SpanId::new(self.span_id),
            parent_span_id: self.parent_span_id.map(SpanId::new),
            timestamp: self.timestamp,
            event_type,
            node_id: NodeId::new(self.node_id),
            attributes,
        })
    }
}

/// The envelope for `submit_runtime`: a batch of events for one trace,
/// with an explicit completion flag so the submitter can mark the last
/// batch of a trace without a separate call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventPayload {
    #[serde(rename = "traceId")]
    pub trace_id: String,
    #[serde(rename = "graphId")]
    pub graph_id: String,
    pub events: Vec<RuntimeEventPayload>,
    #[serde(rename = "traceComplete", default)]
    pub trace_complete: bool,
}

impl EventPayload {
    pub fn trace_id(&self) -> TraceId {
        TraceId::new(self.trace_id.clone())
    }

    pub fn graph_id(&self) -> GraphId {
        GraphId::new(self.graph_id.clone())
    }

    pub fn into_events(self) -> Result<Vec<RuntimeEvent>, CoreError> {
        if self.events.is_empty() {
            return Err(CoreError::ValidationError("runtime submission must include at least one event".into()));
        }
        let trace_id = self.trace_id();
        self.events.into_iter().map(|e| e.into_event(trace_id.clone())).collect()
    }
}
