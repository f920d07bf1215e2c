//! The worker pool: N consumers dispatching ingest queue items to
//! the graph store, trace buffer, and merge engine.

mod loader;

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, warn};

use crate::config::{TraceConfig, WorkerConfig};
use crate::merge::MergeEngine;
use crate::metrics::Metrics;
use crate::queue::{IngestQueue, WorkItem};
use crate::store::GraphStore;
use crate::trace::TraceBuffer;

/// Owns the worker tasks and the stop signal that tells them to drain and
/// exit. Dropping this without calling [`shutdown`](Self::shutdown) leaves
/// the spawned tasks running detached — callers should always shut down
/// explicitly.
pub struct WorkerPool {
    stop_tx: watch::Sender<bool>,
    handles: Vec<tokio::task::JoinHandle<()>>,
    grace: std::time::Duration,
}

impl WorkerPool {
    pub fn spawn(
        config: WorkerConfig,
        queue: Arc<IngestQueue>,
        store: Arc<GraphStore>,
        traces: Arc<TraceBuffer>,
        merge_engine: Arc<MergeEngine>,
        metrics: Arc<Metrics>,
    ) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        let mut handles = Vec::with_capacity(config.count);

        for worker_id in 0..config.count {
            let queue = queue.clone();
            let store = store.clone();
            let traces = traces.clone();
            let merge_engine = merge_engine.clone();
            let metrics = metrics.clone();
            let mut stop_rx = stop_rx.clone();
            let poll_timeout = config.poll_timeout;

            handles.push(tokio::spawn(async move {
                loop {
                    if *stop_rx.borrow() {
                        break;
                    }

                    let item = tokio::select! {
                        item = queue.dequeue(poll_timeout) => item,
                        _ = stop_rx.changed() => continue,
                    };

                    let Some(item) = item else {
                        continue;
                    };
                    metrics.record_dequeue();
                    dispatch(item, &store, &traces, &merge_engine, worker_id);
                }
            }));
        }

        Self { stop_tx, handles, grace: config.shutdown_grace }
    }

    /// Signals workers to stop, waits up to the configured grace period for
    /// them to drain in-flight work, then returns.
    pub async fn shutdown(self) {
        let _ = self.stop_tx.send(true);
        let joined = tokio::time::timeout(self.grace, futures_join_all(self.handles)).await;
        if joined.is_err() {
            warn!("worker pool did not drain within the shutdown grace period");
        }
    }
}

async fn futures_join_all(handles: Vec<tokio::task::JoinHandle<()>>) {
    for handle in handles {
        let _ = handle.await;
    }
}

fn dispatch(item: WorkItem, store: &Arc<GraphStore>, traces: &Arc<TraceBuffer>, merge_engine: &Arc<MergeEngine>, worker_id: usize) {
    match item {
        WorkItem::StaticGraph { graph_id, payload, .. } => match loader::load(payload) {
            Ok(graph) => store.put_static(graph_id, graph),
            Err(err) => error!(worker_id, %graph_id, error = %err, "rejected static graph payload"),
        },
        WorkItem::RuntimeEvents { trace_id, graph_id, payload, trace_complete, .. } => match payload.into_events() {
            Ok(events) => {
                traces.append(trace_id.clone(), graph_id.clone(), events);
                if trace_complete {
                    traces.mark_complete(&trace_id);
                    // Scheduling the merge must not block this worker beyond
                    // its own completion; the merge itself is pure in-memory
                    // work so a plain spawn is enough.
                    let merge_engine = merge_engine.clone();
                    tokio::spawn(async move {
                        if let Err(err) = merge_engine.merge(&graph_id, &trace_id) {
                            error!(%graph_id, %trace_id, error = %err, "merge failed");
                        }
                    });
                }
            }
            Err(err) => error!(worker_id, %trace_id, error = %err, "rejected runtime event batch"),
        },
    }
}

/// Spawns the periodic trace-eviction ticker.
pub fn spawn_eviction_ticker(traces: Arc<TraceBuffer>, config: TraceConfig, mut stop_rx: watch::Receiver<bool>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(config.eviction_interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = traces.evict_expired();
                    traces.enforce_max_count();
                    if evicted > 0 {
                        tracing::debug!(evicted, "trace eviction pass completed");
                    }
                }
                _ = stop_rx.changed() => {
                    if *stop_rx.borrow() {
                        break;
                    }
                }
            }
        }
    })
}
