//! The six idempotent merge stages, applied in a fixed order to a
//! mutable graph given a trace snapshot. Each stage only ever adds nodes,
//! adds edges, or updates metadata — it never removes anything, which is
//! what makes `merge(merge(G, T), T) = merge(G, T)` hold.

use crate::model::metadata::{Checkpoint, LastError};
use crate::model::{Edge, EdgeId, EdgeType, Graph, MetadataValue, Node, NodeId, NodeType, Visibility, ZoomLevel};
use crate::trace::{EventType, Trace};

/// Runs all six stages in their fixed order.
pub fn apply(graph: &mut Graph, trace: &Trace) {
    runtime_node_stage(graph, trace);
    runtime_edge_stage(graph, trace);
    duration_stage(graph, trace);
    checkpoint_stage(graph, trace);
    async_hop_stage(graph, trace);
    error_stage(graph, trace);
}

/// Stage 1: every event whose `node_id` is absent from the graph gets a
/// synthetic node (`type=METHOD`, `visibility=PUBLIC`, `zoom=5`). Existing
/// nodes are never overwritten.
fn runtime_node_stage(graph: &mut Graph, trace: &Trace) {
    for event in &trace.events {
        if graph.get_node(&event.node_id).is_some() {
            continue;
        }
        let mut node = Node::new(event.node_id.clone(), event.node_id.as_str(), NodeType::Method, "")
            .with_visibility(Visibility::Public);
        node.zoom_level = Some(ZoomLevel::RUNTIME);
        graph.add_node_if_absent(node);
    }
}

fn next_edge_id(graph: &Graph, source: &NodeId, target: &NodeId, edge_type: EdgeType) -> EdgeId {
    EdgeId::new(format!("{}::{}::{}::{}", source, edge_type, target, graph.edge_count()))
}

/// Stage 2: a `METHOD_ENTER` immediately preceded by another `METHOD_ENTER`
/// is a control transfer from the predecessor's node to the successor's.
/// Every such ordered pair increments `execution_count` by one, adding a
/// `RUNTIME_CALL` edge the first time the pair is observed.
fn runtime_edge_stage(graph: &mut Graph, trace: &Trace) {
    for window in trace.events.windows(2) {
        let (prev, curr) = (&window[0], &window[1]);
        if prev.event_type != EventType::MethodEnter || curr.event_type != EventType::MethodEnter {
            continue;
        }

        let source = prev.node_id.clone();
        let target = curr.node_id.clone();

        if graph.find_edge(&source, &target).is_none() {
            let id = next_edge_id(graph, &source, &target, EdgeType::RuntimeCall);
            // Endpoints were just guaranteed to exist by the Runtime-Node
            // stage; a failure here would be a bug in that stage.
            let _ = graph.add_edge(Edge::new(id, source.clone(), target.clone(), EdgeType::RuntimeCall));
        }

        if let Some(edge) = graph.find_edge_mut(&source, &target) {
            edge.execution_count += 1;
        }
    }
}

/// Stage 3: for every `METHOD_EXIT` with a matching `METHOD_ENTER` (same
/// `span_id`, `enter.timestamp <= exit.timestamp`), folds the duration into
/// the target node's running average and bumps `executionCount`.
fn duration_stage(graph: &mut Graph, trace: &Trace) {
    for exit in trace.events.iter().filter(|e| e.event_type == EventType::MethodExit) {
        let Some(enter) = trace
            .events
            .iter()
            .find(|e| e.event_type == EventType::MethodEnter && e.span_id == exit.span_id && e.timestamp <= exit.timestamp)
        else {
            continue;
        };

        let duration_ms = (exit.timestamp - enter.timestamp).num_milliseconds() as f64;
        let Some(node) = graph.get_node_mut(&exit.node_id) else {
            continue;
        };

        let prior_count = node.metadata_get("executionCount").and_then(MetadataValue::as_i64).unwrap_or(0);
        let prior_avg = node.metadata_get("duration").and_then(MetadataValue::as_f64).unwrap_or(0.0);
        let new_avg = (prior_avg * prior_count as f64 + duration_ms) / (prior_count + 1) as f64;

        node.set_metadata("duration", MetadataValue::Float(new_avg));
        node.set_metadata("executionCount", MetadataValue::Int(prior_count + 1));
    }
}

/// Stage 4: appends each checkpoint to the target node's ordered
/// `metadata["checkpoints"]`.
fn checkpoint_stage(graph: &mut Graph, trace: &Trace) {
    for checkpoint in &trace.checkpoints {
        let Some(node) = graph.get_node_mut(&checkpoint.node_id) else {
            continue;
        };

        if node.metadata_get("checkpoints").is_none() {
            node.set_metadata("checkpoints", MetadataValue::Checkpoints(Vec::new()));
        }
        if let Some(value) = node.metadata.get_mut("checkpoints") {
            if let Some(list) = value.as_checkpoints_mut() {
                list.push(Checkpoint {
                    name: checkpoint.name.clone(),
                    timestamp: checkpoint.timestamp,
                    data: checkpoint.data.clone(),
                });
            }
        }
    }
}

/// Stage 5: for every produce/consume pair sharing a correlation id,
/// records the hop and adds a derived `FLOWS_TO` edge if none already
/// connects producer to consumer. The graph model has no per-edge
/// attribute bag, so the hop itself is recorded on the producer node's
/// metadata rather than "on the producing edge" literally.
fn async_hop_stage(graph: &mut Graph, trace: &Trace) {
    for hop in &trace.async_hops {
        if let Some(node) = graph.get_node_mut(&hop.producer_node_id) {
            let entry = serde_json::json!({
                "correlationId": hop.correlation_id,
                "consumerNodeId": hop.consumer_node_id.as_str(),
                "producedAt": hop.produced_at,
                "consumedAt": hop.consumed_at,
            });

            let mut hops = match node.metadata.remove("asyncHops") {
                Some(MetadataValue::Json(serde_json::Value::Array(existing))) => existing,
                _ => Vec::new(),
            };
            hops.push(entry);
            node.set_metadata("asyncHops", MetadataValue::Json(serde_json::Value::Array(hops)));
        }

        if graph.get_node(&hop.producer_node_id).is_none() || graph.get_node(&hop.consumer_node_id).is_none() {
            continue;
        }
        if graph.find_edge(&hop.producer_node_id, &hop.consumer_node_id).is_none() {
            let id = next_edge_id(graph, &hop.producer_node_id, &hop.consumer_node_id, EdgeType::FlowsTo);
            let _ = graph.add_edge(Edge::new(
                id,
                hop.producer_node_id.clone(),
                hop.consumer_node_id.clone(),
                EdgeType::FlowsTo,
            ));
        }
    }
}

/// Stage 6: every ERROR event bumps the target node's `errorCount` and
/// overwrites `lastError` with the most recent error.
fn error_stage(graph: &mut Graph, trace: &Trace) {
    for error in &trace.errors {
        let Some(node) = graph.get_node_mut(&error.node_id) else {
            continue;
        };

        let prior_count = node.metadata_get("errorCount").and_then(MetadataValue::as_i64).unwrap_or(0);
        node.set_metadata("errorCount", MetadataValue::Int(prior_count + 1));
        node.set_metadata(
            "lastError",
            MetadataValue::Error(LastError {
                message: error.message.clone(),
                error_type: error.error_type.clone(),
            }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GraphId, TraceId};
    use chrono::{Duration as ChronoDuration, Utc};

    fn event(event_type: EventType, node: &str, span: &str, ts: chrono::DateTime<Utc>) -> crate::trace::RuntimeEvent {
        crate::trace::RuntimeEvent {
            event_id: None,
            trace_id: TraceId::new("t1"),
            span_id: crate::model::SpanId::new(span),
            parent_span_id: None,
            timestamp: ts,
            event_type,
            node_id: NodeId::new(node),
            attributes: Default::default(),
        }
    }

    #[test]
    fn runtime_discovered_node_gets_runtime_call_edge() {
        let mut graph = Graph::new("v1");
        graph.add_node(Node::new(NodeId::new("a"), "a", NodeType::Service, "svc")).unwrap();

        let t0 = Utc::now();
        let mut trace = Trace::new(TraceId::new("t1"), GraphId::new("g1"), t0);
        trace.append_event(event(EventType::MethodEnter, "a", "s1", t0), true);
        trace.append_event(event(EventType::MethodEnter, "c", "s2", t0 + ChronoDuration::milliseconds(1)), true);
        trace.append_event(event(EventType::MethodExit, "c", "s2", t0 + ChronoDuration::milliseconds(2)), true);
        trace.append_event(event(EventType::MethodExit, "a", "s1", t0 + ChronoDuration::milliseconds(3)), true);

        apply(&mut graph, &trace);

        assert_eq!(graph.node_count(), 2);
        let c = graph.get_node(&NodeId::new("c")).unwrap();
        assert_eq!(c.zoom_level, Some(ZoomLevel::RUNTIME));
        assert!(graph.find_edge(&NodeId::new("a"), &NodeId::new("c")).is_some());
    }

    #[test]
    fn duration_stage_records_elapsed_time() {
        let mut graph = Graph::new("v1");
        graph.add_node(Node::new(NodeId::new("a"), "a", NodeType::Method, "svc")).unwrap();

        let t0 = Utc::now();
        let mut trace = Trace::new(TraceId::new("t1"), GraphId::new("g1"), t0);
        trace.append_event(event(EventType::MethodEnter, "a", "s1", t0), true);
        trace.append_event(event(EventType::MethodExit, "a", "s1", t0 + ChronoDuration::milliseconds(30)), true);

        apply(&mut graph, &trace);

        let node = graph.get_node(&NodeId::new("a")).unwrap();
        assert_eq!(node.metadata_get("duration").and_then(MetadataValue::as_f64), Some(30.0));
        assert_eq!(node.metadata_get("executionCount").and_then(MetadataValue::as_i64), Some(1));
    }

    #[test]
    fn error_with_no_matching_enter_still_records() {
        let mut graph = Graph::new("v1");
        graph.add_node(Node::new(NodeId::new("payment-service"), "payment-service", NodeType::Service, "svc")).unwrap();

        let t0 = Utc::now();
        let mut trace = Trace::new(TraceId::new("t2"), GraphId::new("g1"), t0);
        let mut err = event(EventType::Error, "payment-service", "s1", t0);
        err.attributes.insert("errorMessage".into(), serde_json::json!("Insufficient funds"));
        err.attributes.insert("errorType".into(), serde_json::json!("PaymentDeclinedException"));
        trace.append_event(err, true);

        apply(&mut graph, &trace);

        let node = graph.get_node(&NodeId::new("payment-service")).unwrap();
        assert_eq!(node.metadata_get("errorCount").and_then(MetadataValue::as_i64), Some(1));
        assert!(node.metadata_get("duration").is_none());
    }

}
