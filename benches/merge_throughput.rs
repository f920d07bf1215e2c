//! Throughput of folding a completed trace into its graph.
//!
//! Run with: `cargo bench --bench merge_throughput`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use flow_core::clock::ManualClock;
use flow_core::config::{MergeConfig, TraceConfig};
use flow_core::merge::MergeEngine;
use flow_core::metrics::Metrics;
use flow_core::model::{Graph, GraphId, Node, NodeId, NodeType, TraceId};
use flow_core::store::GraphStore;
use flow_core::trace::{EventType, RuntimeEvent, TraceBuffer};

/// A graph of `node_count` method nodes chained `a -> b -> c -> ...` plus a
/// trace whose events walk the chain once, so merging grows both the node
/// metadata (durations) and, on the first merge, the edge set.
fn setup(node_count: usize) -> (MergeEngine, Arc<GraphStore>, Arc<TraceBuffer>, GraphId, TraceId) {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let store = Arc::new(GraphStore::new(clock.clone()));
    let traces = Arc::new(TraceBuffer::new(clock, TraceConfig::default(), Arc::new(Metrics::new())));
    let engine = MergeEngine::new(store.clone(), traces.clone(), MergeConfig::default(), Arc::new(Metrics::new()));

    let graph_id = GraphId::new("bench-graph");
    let mut graph = Graph::new("v1");
    for i in 0..node_count {
        graph
            .add_node(Node::new(NodeId::new(format!("n{i}")), format!("n{i}"), NodeType::Method, "svc"))
            .unwrap();
    }
    store.put_static(graph_id.clone(), graph);

    let trace_id = TraceId::new("bench-trace");
    let t0 = Utc::now();
    let mut events = Vec::with_capacity(node_count * 2);
    for i in 0..node_count {
        let span = format!("s{i}");
        events.push(RuntimeEvent {
            event_id: None,
            trace_id: trace_id.clone(),
            span_id: flow_core::model::SpanId::new(span.clone()),
            parent_span_id: None,
            timestamp: t0 + ChronoDuration::milliseconds(i as i64 * 10),
            event_type: EventType::MethodEnter,
            node_id: NodeId::new(format!("n{i}")),
            attributes: Default::default(),
        });
        events.push(RuntimeEvent {
            event_id: None,
            trace_id: trace_id.clone(),
            span_id: flow_core::model::SpanId::new(span),
            parent_span_id: None,
            timestamp: t0 + ChronoDuration::milliseconds(i as i64 * 10 + 5),
            event_type: EventType::MethodExit,
            node_id: NodeId::new(format!("n{i}")),
            attributes: Default::default(),
        });
    }
    traces.append(trace_id.clone(), graph_id.clone(), events);
    traces.mark_complete(&trace_id);

    (engine, store, traces, graph_id, trace_id)
}

fn bench_first_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("first_merge");

    for node_count in [1, 10, 100, 1000] {
        group.throughput(Throughput::Elements(node_count as u64));
        group.bench_with_input(BenchmarkId::new("nodes", node_count), &node_count, |b, &node_count| {
            b.iter_batched(
                || setup(node_count),
                |(engine, _store, _traces, graph_id, trace_id)| {
                    engine.merge(black_box(&graph_id), black_box(&trace_id)).unwrap();
                },
                criterion::BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

/// Re-merging an already-merged trace is the cheap, idempotent path (a
/// single `has_merged_trace` lookup, no stage pipeline run) — this should be
/// orders of magnitude faster than `bench_first_merge` regardless of graph
/// size.
fn bench_repeat_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("repeat_merge");

    for node_count in [1, 10, 100, 1000] {
        let (engine, _store, _traces, graph_id, trace_id) = setup(node_count);
        engine.merge(&graph_id, &trace_id).unwrap();

        group.throughput(Throughput::Elements(node_count as u64));
        group.bench_with_input(BenchmarkId::new("nodes", node_count), &node_count, |b, _| {
            b.iter(|| {
                engine.merge(black_box(&graph_id), black_box(&trace_id)).unwrap();
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_first_merge, bench_repeat_merge);
criterion_main!(benches);
