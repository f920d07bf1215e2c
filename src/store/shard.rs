//! Sharded concurrent storage for merged graphs.
//!
//! Sixteen shards, each behind its own `RwLock`. Writers to distinct
//! graph-ids proceed in parallel; writes to the same graph-id serialize
//! through that graph's shard lock. Plain `dashmap`-shaped sharding by hand —
//! nothing in this corpus pulls in a concurrent-map crate, and one shard per
//! CPU-ish bucket is enough for the write-serialization the merge engine
//! actually needs.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};

use crate::clock::SharedClock;
use crate::model::{Graph, GraphId, TraceId};

const SHARD_COUNT: usize = 16;

/// Metadata about a stored graph, kept alongside the graph itself so callers
/// can list graphs without paying for a deep clone of every node and edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphMetadata {
    pub graph_id: GraphId,
    pub version: String,
    pub node_count: usize,
    pub edge_count: usize,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
    pub has_runtime_data: bool,
    pub trace_count: usize,
}

struct Entry {
    graph: Graph,
    metadata: GraphMetadata,
    /// Trace ids already folded into this graph. Consulted by the merge
    /// engine so that re-running a merge for a trace it already applied is
    /// a no-op — the mechanism behind `merge(merge(G, T), T) = merge(G, T)`.
    merged_trace_ids: BTreeSet<TraceId>,
}

#[derive(Default)]
struct Shard {
    entries: BTreeMap<GraphId, Entry>,
}

/// Thread-safe storage for merged graphs.
pub struct GraphStore {
    shards: Vec<RwLock<Shard>>,
    clock: SharedClock,
}

fn shard_index(graph_id: &GraphId) -> usize {
    let mut hasher = DefaultHasher::new();
    graph_id.hash(&mut hasher);
    (hasher.finish() as usize) % SHARD_COUNT
}

impl GraphStore {
    pub fn new(clock: SharedClock) -> Self {
        let mut shards = Vec::with_capacity(SHARD_COUNT);
        for _ in 0..SHARD_COUNT {
            shards.push(RwLock::new(Shard::default()));
        }
        Self { shards, clock }
    }

    /// Inserts a freshly validated static graph. Overwrites any existing
    /// graph at the same id and clears its merged-trace history — a new
    /// static base starts a new runtime-overlay era.
    pub fn put_static(&self, graph_id: GraphId, graph: Graph) {
        let now = self.clock.now();
        let shard = &self.shards[shard_index(&graph_id)];
        let mut shard = shard.write();

        let created_at = shard
            .entries
            .get(&graph_id)
            .map(|e| e.metadata.created_at)
            .unwrap_or(now);

        let metadata = GraphMetadata {
            graph_id: graph_id.clone(),
            version: graph.version.clone(),
            node_count: graph.node_count(),
            edge_count: graph.edge_count(),
            created_at,
            last_updated_at: now,
            has_runtime_data: false,
            trace_count: 0,
        };

        shard.entries.insert(
            graph_id,
            Entry {
                graph,
                metadata,
                merged_trace_ids: BTreeSet::new(),
            },
        );
    }

    /// A deep snapshot clone of the stored graph, if present.
    pub fn get(&self, graph_id: &GraphId) -> Option<Graph> {
        let shard = self.shards[shard_index(graph_id)].read();
        shard.entries.get(graph_id).map(|e| e.graph.clone())
    }

    pub fn metadata(&self, graph_id: &GraphId) -> Option<GraphMetadata> {
        let shard = self.shards[shard_index(graph_id)].read();
        shard.entries.get(graph_id).map(|e| e.metadata.clone())
    }

    pub fn contains(&self, graph_id: &GraphId) -> bool {
        self.shards[shard_index(graph_id)]
            .read()
            .entries
            .contains_key(graph_id)
    }

    /// Whether `trace_id` has already been folded into `graph_id`'s current
    /// graph. The merge engine consults this before doing any work.
    pub fn has_merged_trace(&self, graph_id: &GraphId, trace_id: &TraceId) -> bool {
        self.shards[shard_index(graph_id)]
            .read()
            .entries
            .get(graph_id)
            .map(|e| e.merged_trace_ids.contains(trace_id))
            .unwrap_or(false)
    }

    /// Replaces the stored graph and recomputes its derived metadata.
    /// No-op if no prior value exists for `graph_id`.
    pub fn update_merged(&self, graph_id: GraphId, graph: Graph, merged_trace_count: usize) {
        let now = self.clock.now();
        let shard = &self.shards[shard_index(&graph_id)];
        let mut shard = shard.write();

        let Some(created_at) = shard.entries.get(&graph_id).map(|e| e.metadata.created_at) else {
            return;
        };
        let merged_trace_ids = shard
            .entries
            .get(&graph_id)
            .map(|e| e.merged_trace_ids.clone())
            .unwrap_or_default();

        let metadata = GraphMetadata {
            graph_id: graph_id.clone(),
            version: graph.version.clone(),
            node_count: graph.node_count(),
            edge_count: graph.edge_count(),
            created_at,
            last_updated_at: now,
            has_runtime_data: true,
            trace_count: merged_trace_count,
        };

        shard.entries.insert(graph_id, Entry { graph, metadata, merged_trace_ids });
    }

    /// Optimistic compare-and-swap used by the merge engine: replaces
    /// the stored graph only if its current version still equals
    /// `expected_version`, and records `trace_id` as merged. Returns whether
    /// the swap happened; `false` means the merge engine should re-read and
    /// retry.
    pub fn try_update_merged(
        &self,
        graph_id: &GraphId,
        expected_version: &str,
        graph: Graph,
        trace_id: TraceId,
    ) -> bool {
        let now = self.clock.now();
        let shard = &self.shards[shard_index(graph_id)];
        let mut shard = shard.write();

        let Some(entry) = shard.entries.get(graph_id) else {
            return false;
        };
        if entry.graph.version != expected_version {
            return false;
        }
        let created_at = entry.metadata.created_at;
        let mut merged_trace_ids = entry.merged_trace_ids.clone();
        merged_trace_ids.insert(trace_id);

        let metadata = GraphMetadata {
            graph_id: graph_id.clone(),
            version: graph.version.clone(),
            node_count: graph.node_count(),
            edge_count: graph.edge_count(),
            created_at,
            last_updated_at: now,
            has_runtime_data: true,
            trace_count: merged_trace_ids.len(),
        };

        shard.entries.insert(
            graph_id.clone(),
            Entry { graph, metadata, merged_trace_ids },
        );
        true
    }

    /// Idempotent: returns whether a graph was actually removed.
    pub fn delete(&self, graph_id: &GraphId) -> bool {
        self.shards[shard_index(graph_id)]
            .write()
            .entries
            .remove(graph_id)
            .is_some()
    }

    /// All stored graph-ids' metadata, in lexicographic graph-id order.
    pub fn list(&self) -> Vec<GraphMetadata> {
        let mut out = Vec::new();
        for shard in &self.shards {
            out.extend(shard.read().entries.values().map(|e| e.metadata.clone()));
        }
        out.sort_by(|a, b| a.graph_id.cmp(&b.graph_id));
        out
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.read().entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
