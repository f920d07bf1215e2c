//! The trace buffer: a keyed, thread-safe map of trace-id to accumulating
//! trace, with a secondary graph-id index.

use chrono::Duration as ChronoDuration;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::event::RuntimeEvent;
use super::trace::Trace;
use crate::clock::SharedClock;
use crate::config::TraceConfig;
use crate::metrics::Metrics;
use crate::model::{GraphId, TraceId};

struct Inner {
    traces: HashMap<TraceId, Trace>,
    by_graph: HashMap<GraphId, HashSet<TraceId>>,
}

/// Thread-safe trace store. Single `RwLock` over both maps: the graph-id
/// index must stay in lockstep with the trace map on every insert/delete, so
/// splitting them into independent locks would only buy false concurrency.
pub struct TraceBuffer {
    inner: RwLock<Inner>,
    clock: SharedClock,
    config: TraceConfig,
    metrics: Arc<Metrics>,
}

impl TraceBuffer {
    pub fn new(clock: SharedClock, config: TraceConfig, metrics: Arc<Metrics>) -> Self {
        Self {
            inner: RwLock::new(Inner {
                traces: HashMap::new(),
                by_graph: HashMap::new(),
            }),
            clock,
            config,
            metrics,
        }
    }

    /// Creates the trace if absent; dedups and appends each event, updating
    /// derived projections. Returns the count of events that were newly
    /// appended (not dropped as duplicates).
    pub fn append(&self, trace_id: TraceId, graph_id: GraphId, events: Vec<RuntimeEvent>) -> usize {
        let mut inner = self.inner.write();

        if !inner.traces.contains_key(&trace_id) {
            let now = self.clock.now();
            inner
                .traces
                .insert(trace_id.clone(), Trace::new(trace_id.clone(), graph_id.clone(), now));
            inner
                .by_graph
                .entry(graph_id.clone())
                .or_default()
                .insert(trace_id.clone());
        }

        let trace = inner
            .traces
            .get_mut(&trace_id)
            .expect("trace was just inserted if absent");

        let mut appended = 0;
        for event in events {
            if trace.append_event(event, self.config.dedup_enabled) {
                appended += 1;
            } else {
                self.metrics.record_dedup_hit();
            }
        }
        appended
    }

    /// Idempotent.
    pub fn mark_complete(&self, trace_id: &TraceId) {
        let now = self.clock.now();
        if let Some(trace) = self.inner.write().traces.get_mut(trace_id) {
            trace.mark_complete(now);
        }
    }

    /// Idempotent.
    pub fn mark_merged(&self, trace_id: &TraceId) {
        if let Some(trace) = self.inner.write().traces.get_mut(trace_id) {
            trace.mark_merged();
        }
    }

    /// A deep snapshot (owned clone); the caller cannot observe or cause
    /// further mutation through it.
    pub fn get(&self, trace_id: &TraceId) -> Option<Trace> {
        self.inner.read().traces.get(trace_id).cloned()
    }

    /// Traces for `graph_id` that are complete but not yet merged.
    pub fn pending_for_graph(&self, graph_id: &GraphId) -> Vec<Trace> {
        let inner = self.inner.read();
        inner
            .by_graph
            .get(graph_id)
            .into_iter()
            .flatten()
            .filter_map(|id| inner.traces.get(id))
            .filter(|t| t.is_pending())
            .cloned()
            .collect()
    }

    /// Idempotent: returns whether a trace was actually removed.
    pub fn delete(&self, trace_id: &TraceId) -> bool {
        let mut inner = self.inner.write();
        match inner.traces.remove(trace_id) {
            Some(trace) => {
                if let Some(set) = inner.by_graph.get_mut(&trace.graph_id) {
                    set.remove(trace_id);
                }
                true
            }
            None => false,
        }
    }

    /// Idempotent: removes every trace associated with `graph_id`.
    pub fn delete_for_graph(&self, graph_id: &GraphId) -> usize {
        let mut inner = self.inner.write();
        let Some(ids) = inner.by_graph.remove(graph_id) else {
            return 0;
        };
        for id in &ids {
            inner.traces.remove(id);
        }
        ids.len()
    }

    /// Removes every trace where `merged && completed_at + ttl < now`.
    /// Additionally forces eviction of unmerged traces older than the
    /// configured hard bound, logging each one. Returns the total count
    /// removed.
    pub fn evict_expired(&self) -> usize {
        let now = self.clock.now();
        let ttl = ChronoDuration::from_std(self.config.ttl).unwrap_or(ChronoDuration::zero());
        let hard_bound = ChronoDuration::from_std(self.config.unmerged_hard_bound)
            .unwrap_or(ChronoDuration::zero());

        let mut inner = self.inner.write();
        let expired: Vec<TraceId> = inner
            .traces
            .values()
            .filter(|t| {
                t.is_ttl_expired(now, ttl) || (!t.merged && t.is_past_hard_bound(now, hard_bound))
            })
            .map(|t| t.trace_id.clone())
            .collect();

        for id in &expired {
            if let Some(trace) = inner.traces.remove(id) {
                if !trace.merged {
                    tracing::warn!(
                        trace_id = %trace.trace_id,
                        graph_id = %trace.graph_id,
                        "forcibly evicted unmerged trace past hard bound"
                    );
                }
                if let Some(set) = inner.by_graph.get_mut(&trace.graph_id) {
                    set.remove(id);
                }
            }
        }

        self.metrics.record_evictions(expired.len() as u64);
        expired.len()
    }

    /// Enforces `trace.max_count`: when the buffer exceeds the hard cap,
    /// evicts the oldest traces by `created_at` first.
    pub fn enforce_max_count(&self) -> usize {
        let mut inner = self.inner.write();
        if inner.traces.len() <= self.config.max_count {
            return 0;
        }

        let mut ordered: Vec<(TraceId, chrono::DateTime<chrono::Utc>)> = inner
            .traces
            .values()
            .map(|t| (t.trace_id.clone(), t.created_at))
            .collect();
        ordered.sort_by_key(|(_, created_at)| *created_at);

        let overflow = inner.traces.len() - self.config.max_count;
        let mut removed = 0;
        for (id, _) in ordered.into_iter().take(overflow) {
            if let Some(trace) = inner.traces.remove(&id) {
                if let Some(set) = inner.by_graph.get_mut(&trace.graph_id) {
                    set.remove(&id);
                }
                removed += 1;
            }
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.inner.read().traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::model::{NodeId, SpanId};
    use crate::trace::event::EventType;
    use std::collections::BTreeMap;

    fn buffer(clock: Arc<ManualClock>) -> TraceBuffer {
        TraceBuffer::new(clock, TraceConfig::default(), Arc::new(Metrics::new()))
    }

    fn event(event_type: EventType, ts: chrono::DateTime<chrono::Utc>) -> RuntimeEvent {
        RuntimeEvent {
            event_id: None,
            trace_id: TraceId::new("t1"),
            span_id: SpanId::new("s1"),
            parent_span_id: None,
            timestamp: ts,
            event_type,
            node_id: NodeId::new("a"),
            attributes: BTreeMap::new(),
        }
    }

    #[test]
    fn append_creates_trace_and_dedups_across_calls() {
        let clock = Arc::new(ManualClock::new(chrono::Utc::now()));
        let buf = buffer(clock.clone());
        let ts = clock.now();

        let appended = buf.append(TraceId::new("t1"), GraphId::new("g1"), vec![event(EventType::MethodEnter, ts)]);
        assert_eq!(appended, 1);

        // Same span/type/timestamp, no event_id -> dedup fallback should drop it.
        let appended_again = buf.append(TraceId::new("t1"), GraphId::new("g1"), vec![event(EventType::MethodEnter, ts)]);
        assert_eq!(appended_again, 0);

        let trace = buf.get(&TraceId::new("t1")).unwrap();
        assert_eq!(trace.events.len(), 1);
    }

    #[test]
    fn pending_for_graph_only_lists_complete_unmerged() {
        let clock = Arc::new(ManualClock::new(chrono::Utc::now()));
        let buf = buffer(clock.clone());
        let ts = clock.now();

        buf.append(TraceId::new("t1"), GraphId::new("g1"), vec![event(EventType::MethodEnter, ts)]);
        assert!(buf.pending_for_graph(&GraphId::new("g1")).is_empty());

        buf.mark_complete(&TraceId::new("t1"));
        assert_eq!(buf.pending_for_graph(&GraphId::new("g1")).len(), 1);

        buf.mark_merged(&TraceId::new("t1"));
        assert!(buf.pending_for_graph(&GraphId::new("g1")).is_empty());
    }

    #[test]
    fn ttl_eviction_removes_merged_traces_once() {
        let clock = Arc::new(ManualClock::new(chrono::Utc::now()));
        let mut config = TraceConfig::default();
        config.ttl = std::time::Duration::from_secs(1);
        let buf = TraceBuffer::new(clock.clone(), config, Arc::new(Metrics::new()));

        let ts = clock.now();
        buf.append(TraceId::new("t1"), GraphId::new("g1"), vec![event(EventType::MethodEnter, ts)]);
        buf.mark_complete(&TraceId::new("t1"));
        buf.mark_merged(&TraceId::new("t1"));

        clock.advance(ChronoDuration::seconds(2));
        let removed = buf.evict_expired();
        assert_eq!(removed, 1);
        assert!(buf.get(&TraceId::new("t1")).is_none());
    }

    #[test]
    fn delete_for_graph_is_idempotent() {
        let clock = Arc::new(ManualClock::new(chrono::Utc::now()));
        let buf = buffer(clock.clone());
        let ts = clock.now();
        buf.append(TraceId::new("t1"), GraphId::new("g1"), vec![event(EventType::MethodEnter, ts)]);

        assert_eq!(buf.delete_for_graph(&GraphId::new("g1")), 1);
        assert_eq!(buf.delete_for_graph(&GraphId::new("g1")), 0);
    }
}
