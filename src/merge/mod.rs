//! The merge engine: folds a completed trace into its graph.

mod stages;
mod validator;
mod zoom_policy;

use std::sync::Arc;
use tracing::{info, warn};

use crate::config::MergeConfig;
use crate::error::CoreError;
use crate::metrics::{MergeOutcome, Metrics};
use crate::model::GraphId;
use crate::model::TraceId;
use crate::store::GraphStore;
use crate::trace::TraceBuffer;

pub struct MergeEngine {
    store: Arc<GraphStore>,
    traces: Arc<TraceBuffer>,
    config: MergeConfig,
    metrics: Arc<Metrics>,
}

impl MergeEngine {
    pub fn new(store: Arc<GraphStore>, traces: Arc<TraceBuffer>, config: MergeConfig, metrics: Arc<Metrics>) -> Self {
        Self { store, traces, config, metrics }
    }

    /// Folds `trace_id` into `graph_id`'s graph. Retries on optimistic
    /// version conflicts up to `config.max_retries` times before surfacing
    /// `MERGE_CONFLICT`. A no-op (success) if this trace was already merged
    /// into the graph's current version — the mechanism behind merge being
    /// idempotent for a given completed trace.
    pub fn merge(&self, graph_id: &GraphId, trace_id: &TraceId) -> Result<(), CoreError> {
        if self.store.has_merged_trace(graph_id, trace_id) {
            self.traces.mark_merged(trace_id);
            return Ok(());
        }

        let trace = self
            .traces
            .get(trace_id)
            .ok_or_else(|| CoreError::Internal(format!("trace {trace_id} vanished before merge")))?;

        for attempt in 0..=self.config.max_retries {
            let Some(mut graph) = self.store.get(graph_id) else {
                return Err(CoreError::GraphNotFound(graph_id.clone()));
            };
            let base_version = graph.version.clone();

            if self.store.has_merged_trace(graph_id, trace_id) {
                self.traces.mark_merged(trace_id);
                return Ok(());
            }

            stages::apply(&mut graph, &trace);
            zoom_policy::assign(&mut graph);

            if let Err(reason) = validator::validate(&graph, self.config.validator_strict) {
                self.metrics.record_merge(MergeOutcome::Invalid);
                warn!(%graph_id, %trace_id, %reason, "merge produced an invalid graph");
                return Err(CoreError::MergeInvalid(reason));
            }

            graph.version = format!("{base_version}/{trace_id}");

            if self.store.try_update_merged(graph_id, &base_version, graph, trace_id.clone()) {
                self.traces.mark_merged(trace_id);
                self.metrics.record_merge(MergeOutcome::Success);
                info!(%graph_id, %trace_id, attempt, "merge succeeded");
                return Ok(());
            }

            warn!(%graph_id, %trace_id, attempt, "merge lost an optimistic race, retrying");
        }

        self.metrics.record_merge(MergeOutcome::Conflict);
        Err(CoreError::MergeConflict(graph_id.clone()))
    }
}
