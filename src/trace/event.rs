//! Runtime events and their dedup key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::{EventId, NodeId, SpanId, TraceId};

/// The kind of runtime occurrence an event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    MethodEnter,
    MethodExit,
    ProduceTopic,
    ConsumeTopic,
    Checkpoint,
    Error,
}

impl EventType {
    /// Parses the wire representation. `START`/`END` are accepted as
    /// synonyms for `METHOD_ENTER`/`METHOD_EXIT` — adapters in the wild emit
    /// both vocabularies and the merge engine treats them as the same thing.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "METHOD_ENTER" | "START" => Some(Self::MethodEnter),
            "METHOD_EXIT" | "END" => Some(Self::MethodExit),
            "PRODUCE_TOPIC" => Some(Self::ProduceTopic),
            "CONSUME_TOPIC" => Some(Self::ConsumeTopic),
            "CHECKPOINT" => Some(Self::Checkpoint),
            "ERROR" => Some(Self::Error),
            _ => None,
        }
    }
}

/// A single runtime event. `attributes` is the open bag that carries
/// `correlationId`, `errorMessage`, `errorType`, `durationMs`, checkpoint
/// `name`/`data`, and any adapter-specific fields — the canonical event type
/// has no other way to express them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeEvent {
    pub event_id: Option<EventId>,
    pub trace_id: TraceId,
    pub span_id: SpanId,
    pub parent_span_id: Option<SpanId>,
    pub timestamp: DateTime<Utc>,
    pub event_type: EventType,
    pub node_id: NodeId,
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl RuntimeEvent {
    /// The dedup key: `event_id` when present, else `(span_id, type,
    /// timestamp)`.
    pub fn dedup_key(&self) -> DedupKey {
        match &self.event_id {
            Some(id) => DedupKey::EventId(id.clone()),
            None => DedupKey::Fallback(self.span_id.clone(), self.event_type, self.timestamp),
        }
    }

    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(|v| v.as_str())
    }
}

/// The key used to detect repeat submissions of the same runtime event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DedupKey {
    EventId(EventId),
    Fallback(SpanId, EventType, DateTime<Utc>),
}
