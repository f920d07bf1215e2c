//! The composition root: wires the queue, worker pool, graph store, trace
//! buffer, merge engine, and extractor/exporter together and exposes the
//! nine external-facing operations as methods.
//!
//! `FlowCore` owns the worker pool and the eviction ticker it spawns; tests
//! and embedders construct it directly rather than through a framework
//! singleton.

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::clock::{system_clock, SharedClock};
use crate::config::Config;
use crate::error::CoreError;
use crate::extract::{self, AnalyticsSink, NullSink};
use crate::merge::MergeEngine;
use crate::metrics::Metrics;
use crate::model::{Graph, GraphId, TraceId};
use crate::payload::{EventPayload, StaticGraphPayload};
use crate::queue::{IngestQueue, QueueHealth, WorkItem};
use crate::store::{GraphMetadata, GraphStore};
use crate::trace::{Trace, TraceBuffer};
use crate::workers::{self, WorkerPool};

/// The wired-up core: ingest queue, worker pool, graph store, trace buffer,
/// merge engine, extractor/exporter, and the periodic trace-eviction
/// ticker.
pub struct FlowCore {
    queue: Arc<IngestQueue>,
    store: Arc<GraphStore>,
    traces: Arc<TraceBuffer>,
    metrics: Arc<Metrics>,
    clock: SharedClock,
    config: Config,
    sink: Arc<dyn AnalyticsSink>,
    workers: Option<WorkerPool>,
    eviction_stop: watch::Sender<bool>,
    eviction_handle: Option<JoinHandle<()>>,
}

impl FlowCore {
    /// Builds a core with the system clock and a sink that discards every
    /// export batch. Suitable for embedders that don't push to analytics.
    pub fn new(config: Config) -> Self {
        Self::with_clock_and_sink(config, system_clock(), Arc::new(NullSink))
    }

    /// Builds a core with an explicit clock and analytics sink, for tests
    /// (a [`crate::clock::ManualClock`]) and for wiring a real
    /// [`AnalyticsSink`] implementation in production.
    pub fn with_clock_and_sink(config: Config, clock: SharedClock, sink: Arc<dyn AnalyticsSink>) -> Self {
        let metrics = Arc::new(Metrics::new());
        let queue = IngestQueue::new(config.queue.capacity);
        let store = Arc::new(GraphStore::new(clock.clone()));
        let traces = Arc::new(TraceBuffer::new(clock.clone(), config.trace.clone(), metrics.clone()));
        let merge_engine = Arc::new(MergeEngine::new(
            store.clone(),
            traces.clone(),
            config.merge.clone(),
            metrics.clone(),
        ));

        let workers = WorkerPool::spawn(
            config.worker.clone(),
            queue.clone(),
            store.clone(),
            traces.clone(),
            merge_engine,
            metrics.clone(),
        );

        let (eviction_stop, eviction_stop_rx) = watch::channel(false);
        let eviction_handle = workers::spawn_eviction_ticker(traces.clone(), config.trace.clone(), eviction_stop_rx);

        Self {
            queue,
            store,
            traces,
            metrics,
            clock,
            config,
            sink,
            workers: Some(workers),
            eviction_stop,
            eviction_handle: Some(eviction_handle),
        }
    }

    /// Enqueues a static graph payload for the worker pool to parse and
    /// load; returns `QUEUE_FULL` if the ingest queue rejects it within
    /// `queue.enqueue_timeout`.
    pub async fn submit_static(&self, graph_id: GraphId, payload: StaticGraphPayload) -> Result<(), CoreError> {
        let item = WorkItem::StaticGraph { graph_id, payload, created_at: self.clock.now() };
        self.enqueue(item).await
    }

    /// Submits a batch of runtime events for `trace_id`. Rejects with
    /// `GRAPH_NOT_FOUND` before enqueueing if no graph exists for
    /// `graph_id` yet.
    pub async fn submit_runtime(
        &self,
        trace_id: TraceId,
        graph_id: GraphId,
        payload: EventPayload,
        trace_complete: bool,
    ) -> Result<(), CoreError> {
        if !self.store.contains(&graph_id) {
            return Err(CoreError::GraphNotFound(graph_id));
        }
        let item = WorkItem::RuntimeEvents { trace_id, graph_id, payload, trace_complete, created_at: self.clock.now() };
        self.enqueue(item).await
    }

    async fn enqueue(&self, item: WorkItem) -> Result<(), CoreError> {
        let accepted = self.queue.enqueue(item, self.config.queue.enqueue_timeout).await;
        self.metrics.record_enqueue(accepted);
        if accepted {
            Ok(())
        } else {
            Err(CoreError::QueueFull)
        }
    }

    /// Returns the current graph snapshot for `graph_id`.
    pub fn get_graph(&self, graph_id: &GraphId) -> Result<Graph, CoreError> {
        self.store.get(graph_id).ok_or_else(|| CoreError::GraphNotFound(graph_id.clone()))
    }

    /// Snapshot metadata for every graph currently stored.
    pub fn list_graphs(&self) -> Vec<GraphMetadata> {
        self.store.list()
    }

    /// Deletes the graph and every trace associated with it. Idempotent;
    /// returns whether the graph was present.
    pub fn delete_graph(&self, graph_id: &GraphId) -> bool {
        let deleted = self.store.delete(graph_id);
        self.traces.delete_for_graph(graph_id);
        deleted
    }

    /// Returns the zoom-level slice of `graph_id`'s current graph.
    pub fn slice(&self, graph_id: &GraphId, zoom: u8) -> Result<Graph, CoreError> {
        let graph = self.get_graph(graph_id)?;
        Ok(extract::slice_graph(&graph, zoom))
    }

    /// Returns a snapshot of the trace identified by `trace_id`.
    pub fn get_trace(&self, trace_id: &TraceId) -> Result<Trace, CoreError> {
        self.traces.get(trace_id).ok_or_else(|| CoreError::TraceNotFound(trace_id.clone()))
    }

    /// Serializes `graph_id`'s current graph as Cypher statements.
    pub fn export_cypher(&self, graph_id: &GraphId) -> Result<Vec<String>, CoreError> {
        let graph = self.get_graph(graph_id)?;
        let metadata = self
            .store
            .metadata(graph_id)
            .ok_or_else(|| CoreError::GraphNotFound(graph_id.clone()))?;
        Ok(extract::export_cypher(&graph, &metadata))
    }

    /// Runs the Cypher export through the configured [`AnalyticsSink`];
    /// this is the only operation here that performs I/O, and it does so
    /// on the sink's own executor, not the ingest worker pool.
    pub async fn push_to_analytics(&self, graph_id: &GraphId) -> Result<(), CoreError> {
        let statements = self.export_cypher(graph_id)?;
        let result = self.sink.push(graph_id.as_str(), &statements).await;
        self.metrics.record_export(result.is_ok());
        result
    }

    /// Current ingest-queue size/capacity/utilization, for health reporting.
    pub fn queue_health(&self) -> QueueHealth {
        self.queue.health()
    }

    /// Whether queue utilization has crossed `queue.backpressure_threshold`.
    pub fn is_degraded(&self) -> bool {
        Metrics::is_degraded(self.queue.utilization_percent(), self.config.queue.backpressure_threshold)
    }

    /// Shared metrics counters, for a health/metrics endpoint to read.
    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Stops the eviction ticker and drains the worker pool. Consumes
    /// `self` because neither can be restarted once stopped.
    pub async fn shutdown(mut self) {
        let _ = self.eviction_stop.send(true);
        if let Some(handle) = self.eviction_handle.take() {
            let _ = handle.await;
        }
        if let Some(workers) = self.workers.take() {
            workers.shutdown().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::payload::NodePayload;
    use chrono::Utc;
    use std::time::Duration;
    use tokio::time::{sleep, timeout};

    fn core() -> FlowCore {
        FlowCore::with_clock_and_sink(Config::default(), Arc::new(ManualClock::new(Utc::now())), Arc::new(NullSink))
    }

    fn static_payload(graph_id: &str) -> StaticGraphPayload {
        StaticGraphPayload {
            graph_id: graph_id.to_string(),
            version: Some("1".to_string()),
            nodes: vec![NodePayload {
                id: "order-service".to_string(),
                name: "OrderService".to_string(),
                node_type: "SERVICE".to_string(),
                service_id: None,
                visibility: None,
            }],
            edges: vec![],
        }
    }

    #[tokio::test]
    async fn submit_static_then_get_graph_round_trips() {
        let core = core();
        core.submit_static(GraphId::new("g1"), static_payload("g1")).await.unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        loop {
            if core.get_graph(&GraphId::new("g1")).is_ok() {
                break;
            }
            assert!(std::time::Instant::now() < deadline, "worker never processed the static submit");
            sleep(Duration::from_millis(5)).await;
        }

        let graph = core.get_graph(&GraphId::new("g1")).unwrap();
        assert_eq!(graph.node_count(), 1);
        core.shutdown().await;
    }

    #[tokio::test]
    async fn submit_runtime_against_missing_graph_is_rejected() {
        let core = core();
        let payload = EventPayload {
            trace_id: "t1".to_string(),
            graph_id: "missing".to_string(),
            events: vec![],
            trace_complete: false,
        };
        let err = core
            .submit_runtime(TraceId::new("t1"), GraphId::new("missing"), payload, false)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::GraphNotFound(_)));
        core.shutdown().await;
    }

    #[tokio::test]
    async fn delete_graph_also_drops_its_traces() {
        let core = core();
        core.submit_static(GraphId::new("g1"), static_payload("g1")).await.unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        loop {
            if core.get_graph(&GraphId::new("g1")).is_ok() {
                break;
            }
            assert!(std::time::Instant::now() < deadline);
            sleep(Duration::from_millis(5)).await;
        }

        assert!(core.delete_graph(&GraphId::new("g1")));
        assert!(core.get_graph(&GraphId::new("g1")).is_err());
        assert!(!core.delete_graph(&GraphId::new("g1")));
        core.shutdown().await;
    }

    #[tokio::test]
    async fn export_cypher_on_missing_graph_is_not_found() {
        let core = core();
        let err = core.export_cypher(&GraphId::new("missing")).unwrap_err();
        assert!(matches!(err, CoreError::GraphNotFound(_)));
        core.shutdown().await;
    }

    #[tokio::test]
    async fn enqueue_times_out_against_full_queue() {
        let mut config = Config::default();
        config.queue.capacity = 1;
        config.queue.enqueue_timeout = Duration::from_millis(0);
        config.worker.count = 0; // nothing drains the queue for this test
        let core = FlowCore::with_clock_and_sink(config, Arc::new(ManualClock::new(Utc::now())), Arc::new(NullSink));

        core.submit_static(GraphId::new("g1"), static_payload("g1")).await.unwrap();
        let err = core.submit_static(GraphId::new("g2"), static_payload("g2")).await.unwrap_err();
        assert!(matches!(err, CoreError::QueueFull));
        core.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_completes_within_grace_period() {
        let core = core();
        timeout(Duration::from_secs(5), core.shutdown()).await.expect("shutdown hung");
    }
}
