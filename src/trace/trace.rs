//! The accumulating trace and its derived projections.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::event::{DedupKey, EventType, RuntimeEvent};
use crate::model::{GraphId, NodeId, TraceId};

/// A produce/consume pair sharing a correlation id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsyncHop {
    pub correlation_id: String,
    pub producer_node_id: NodeId,
    pub consumer_node_id: NodeId,
    pub produced_at: DateTime<Utc>,
    pub consumed_at: DateTime<Utc>,
}

/// A CHECKPOINT event, projected for quick access without re-scanning events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceCheckpoint {
    pub node_id: NodeId,
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub data: serde_json::Value,
}

/// An ERROR event, projected for quick access without re-scanning events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceError {
    pub node_id: NodeId,
    pub message: String,
    pub error_type: String,
    pub timestamp: DateTime<Utc>,
}

/// A time-ordered collection of runtime events sharing a trace id.
///
/// `checkpoints`, `errors`, and `async_hops` are derived projections filled
/// incrementally as events are appended — the merge engine reads these
/// directly rather than re-deriving them from `events`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trace {
    pub trace_id: TraceId,
    pub graph_id: GraphId,
    pub events: Vec<RuntimeEvent>,
    pub checkpoints: Vec<TraceCheckpoint>,
    pub errors: Vec<TraceError>,
    pub async_hops: Vec<AsyncHop>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub complete: bool,
    pub merged: bool,
    #[serde(skip)]
    dedup_seen: HashSet<DedupKey>,
    /// Produce events awaiting a consume with a matching correlation id.
    #[serde(skip)]
    pending_produces: HashMap<String, RuntimeEvent>,
}

impl Trace {
    pub fn new(trace_id: TraceId, graph_id: GraphId, created_at: DateTime<Utc>) -> Self {
        Self {
            trace_id,
            graph_id,
            events: Vec::new(),
            checkpoints: Vec::new(),
            errors: Vec::new(),
            async_hops: Vec::new(),
            created_at,
            completed_at: None,
            complete: false,
            merged: false,
            dedup_seen: HashSet::new(),
            pending_produces: HashMap::new(),
        }
    }

    /// Appends one event, applying dedup (if enabled) and updating the
    /// derived projections. Returns `true` if the event was newly appended,
    /// `false` if it was a duplicate.
    pub fn append_event(&mut self, event: RuntimeEvent, dedup_enabled: bool) -> bool {
        if dedup_enabled {
            let key = event.dedup_key();
            if self.dedup_seen.contains(&key) {
                return false;
            }
            self.dedup_seen.insert(key);
        }

        match event.event_type {
            EventType::Checkpoint => {
                self.checkpoints.push(TraceCheckpoint {
                    node_id: event.node_id.clone(),
                    name: event.attribute_str("name").unwrap_or_default().to_string(),
                    timestamp: event.timestamp,
                    data: event
                        .attributes
                        .get("data")
                        .cloned()
                        .unwrap_or(serde_json::Value::Null),
                });
            }
            EventType::Error => {
                self.errors.push(TraceError {
                    node_id: event.node_id.clone(),
                    message: event.attribute_str("errorMessage").unwrap_or_default().to_string(),
                    error_type: event.attribute_str("errorType").unwrap_or_default().to_string(),
                    timestamp: event.timestamp,
                });
            }
            EventType::ProduceTopic => {
                if let Some(correlation_id) = event.attribute_str("correlationId").map(str::to_string) {
                    self.pending_produces.insert(correlation_id, event.clone());
                }
            }
            EventType::ConsumeTopic => {
                if let Some(correlation_id) = event.attribute_str("correlationId").map(str::to_string) {
                    if let Some(produce) = self.pending_produces.remove(&correlation_id) {
                        self.async_hops.push(AsyncHop {
                            correlation_id,
                            producer_node_id: produce.node_id.clone(),
                            consumer_node_id: event.node_id.clone(),
                            produced_at: produce.timestamp,
                            consumed_at: event.timestamp,
                        });
                    }
                }
            }
            EventType::MethodEnter | EventType::MethodExit => {}
        }

        self.events.push(event);
        true
    }

    /// Idempotent: calling this more than once does not move
    /// `completed_at`.
    pub fn mark_complete(&mut self, now: DateTime<Utc>) {
        if !self.complete {
            self.complete = true;
            self.completed_at = Some(now);
        }
    }

    pub fn mark_merged(&mut self) {
        self.merged = true;
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Traces eligible for merge: complete but not yet merged.
    pub fn is_pending(&self) -> bool {
        self.complete && !self.merged
    }

    /// Merged and past its TTL. Traces that never complete are never
    /// evicted by TTL.
    pub fn is_ttl_expired(&self, now: DateTime<Utc>, ttl: ChronoDuration) -> bool {
        self.merged
            && self
                .completed_at
                .map(|completed| completed + ttl < now)
                .unwrap_or(false)
    }

    /// Unmerged traces past the hard bound are forcibly evicted regardless
    /// of completion state.
    pub fn is_past_hard_bound(&self, now: DateTime<Utc>, hard_bound: ChronoDuration) -> bool {
        self.created_at + hard_bound < now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NodeId, SpanId, TraceId};
    use std::collections::BTreeMap;

    fn event(event_type: EventType, node: &str, span: &str, ts: DateTime<Utc>) -> RuntimeEvent {
        RuntimeEvent {
            event_id: None,
            trace_id: TraceId::new("t1"),
            span_id: SpanId::new(span),
            parent_span_id: None,
            timestamp: ts,
            event_type,
            node_id: NodeId::new(node),
            attributes: BTreeMap::new(),
        }
    }

    #[test]
    fn dedup_by_event_id_collapses_repeats() {
        let mut trace = Trace::new(TraceId::new("t1"), GraphId::new("g1"), Utc::now());
        let mut e = event(EventType::MethodEnter, "a", "s1", Utc::now());
        e.event_id = Some(crate::model::EventId::new("evt-1"));

        assert!(trace.append_event(e.clone(), true));
        assert!(!trace.append_event(e, true));
        assert_eq!(trace.events.len(), 1);
    }

    #[test]
    fn dedup_fallback_uses_span_type_timestamp() {
        let mut trace = Trace::new(TraceId::new("t1"), GraphId::new("g1"), Utc::now());
        let ts = Utc::now();
        let e1 = event(EventType::MethodEnter, "a", "s1", ts);
        let e2 = event(EventType::MethodEnter, "a", "s1", ts);

        assert!(trace.append_event(e1, true));
        assert!(!trace.append_event(e2, true));
        assert_eq!(trace.events.len(), 1);
    }

    #[test]
    fn async_hop_recorded_on_matching_correlation_id() {
        let mut trace = Trace::new(TraceId::new("t1"), GraphId::new("g1"), Utc::now());
        let t0 = Utc::now();

        let mut produce = event(EventType::ProduceTopic, "producer", "s1", t0);
        produce
            .attributes
            .insert("correlationId".into(), serde_json::json!("corr-1"));

        let mut consume = event(
            EventType::ConsumeTopic,
            "consumer",
            "s2",
            t0 + ChronoDuration::milliseconds(5),
        );
        consume
            .attributes
            .insert("correlationId".into(), serde_json::json!("corr-1"));

        trace.append_event(produce, true);
        trace.append_event(consume, true);

        assert_eq!(trace.async_hops.len(), 1);
        assert_eq!(trace.async_hops[0].producer_node_id, NodeId::new("producer"));
        assert_eq!(trace.async_hops[0].consumer_node_id, NodeId::new("consumer"));
    }

    #[test]
    fn ttl_expiry_requires_merged() {
        let mut trace = Trace::new(TraceId::new("t1"), GraphId::new("g1"), Utc::now());
        let now = Utc::now();
        trace.mark_complete(now);

        assert!(!trace.is_ttl_expired(now + ChronoDuration::seconds(100), ChronoDuration::seconds(1)));

        trace.mark_merged();
        assert!(trace.is_ttl_expired(now + ChronoDuration::seconds(100), ChronoDuration::seconds(1)));
    }
}
