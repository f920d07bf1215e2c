//! BFS flow extraction from endpoint/topic nodes into step sequences.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::model::{Graph, NodeId, NodeType};

/// One node visited during a BFS flow walk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowStep {
    pub node_id: NodeId,
    pub name: String,
    pub zoom_level: Option<u8>,
    pub depth: u32,
    pub parent_node_ids: BTreeSet<NodeId>,
}

/// A single BFS walk, in visitation order.
pub type Flow = Vec<FlowStep>;

/// BFS from every `ENDPOINT`/`TOPIC` node, in node-id order for determinism.
pub fn extract_flows(graph: &Graph) -> Vec<Flow> {
    let mut starts: Vec<&NodeId> = graph
        .nodes()
        .filter(|n| matches!(n.node_type, NodeType::Endpoint | NodeType::Topic))
        .map(|n| &n.id)
        .collect();
    starts.sort();

    starts.into_iter().map(|start| extract_flow(graph, start)).collect()
}

/// A single BFS flow starting at `start_node`. Each node is visited at most
/// once; cycles terminate the walk along that path. `depth` is the BFS
/// distance from `start_node`; `parent_node_ids` collects every predecessor
/// reached at `depth - 1` that has an edge into this node (there can be more
/// than one on a minimum-depth path through a diamond).
pub fn extract_flow(graph: &Graph, start_node: &NodeId) -> Flow {
    let Some(start) = graph.get_node(start_node) else {
        return Vec::new();
    };

    let mut depth_of: BTreeMap<NodeId, u32> = BTreeMap::new();
    let mut parents: BTreeMap<NodeId, BTreeSet<NodeId>> = BTreeMap::new();
    let mut order: Vec<NodeId> = Vec::new();
    let mut queue: VecDeque<NodeId> = VecDeque::new();

    depth_of.insert(start.id.clone(), 0);
    order.push(start.id.clone());
    queue.push_back(start.id.clone());

    while let Some(current) = queue.pop_front() {
        let current_depth = depth_of[&current];
        for edge_id in graph.outgoing(&current) {
            let Some(edge) = graph.get_edge(edge_id) else { continue };
            let target = edge.target.clone();

            match depth_of.get(&target) {
                None => {
                    depth_of.insert(target.clone(), current_depth + 1);
                    parents.entry(target.clone()).or_default().insert(current.clone());
                    order.push(target.clone());
                    queue.push_back(target);
                }
                Some(&existing_depth) if existing_depth == current_depth + 1 => {
                    parents.entry(target).or_default().insert(current.clone());
                }
                _ => {}
            }
        }
    }

    order
        .into_iter()
        .map(|node_id| {
            let node = graph.get_node(&node_id).expect("node_id came from the same graph");
            FlowStep {
                depth: depth_of[&node_id],
                parent_node_ids: parents.get(&node_id).cloned().unwrap_or_default(),
                node_id: node.id.clone(),
                name: node.name.clone(),
                zoom_level: node.zoom_level.map(|z| z.value()),
            }
        })
        .collect()
}
