//! The read-only graph validator, run at the end of every merge.

use crate::model::Graph;

/// Re-checks the graph's structural invariants. Strict mode additionally
/// rejects self-loops and requires every node to have an assigned zoom
/// level; do not extend strict mode beyond those two rules without an
/// explicit requirement.
pub fn validate(graph: &Graph, strict: bool) -> Result<(), String> {
    for edge in graph.edges() {
        if graph.get_node(&edge.source).is_none() {
            return Err(format!("edge {} references missing source node {}", edge.id, edge.source));
        }
        if graph.get_node(&edge.target).is_none() {
            return Err(format!("edge {} references missing target node {}", edge.id, edge.target));
        }
        if strict && edge.is_self_loop() {
            return Err(format!("edge {} is a self-loop (strict mode)", edge.id));
        }
    }

    if strict {
        for node in graph.nodes() {
            if node.zoom_level.is_none() {
                return Err(format!("node {} has no assigned zoom level (strict mode)", node.id));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Edge, EdgeId, EdgeType, Node, NodeId, NodeType};

    fn node(id: &str) -> Node {
        Node::new(NodeId::new(id), id, NodeType::Service, "svc")
    }

    #[test]
    fn lenient_mode_allows_self_loops() {
        let mut graph = Graph::new("v1");
        graph.add_node(node("a")).unwrap();
        graph
            .add_edge(Edge::new(EdgeId::new("e1"), NodeId::new("a"), NodeId::new("a"), EdgeType::Call))
            .unwrap();

        assert!(validate(&graph, false).is_ok());
    }

    #[test]
    fn strict_mode_rejects_self_loops() {
        let mut graph = Graph::new("v1");
        graph.add_node(node("a")).unwrap();
        graph
            .add_edge(Edge::new(EdgeId::new("e1"), NodeId::new("a"), NodeId::new("a"), EdgeType::Call))
            .unwrap();

        assert!(validate(&graph, true).is_err());
    }

    #[test]
    fn strict_mode_requires_all_zoom_levels_assigned() {
        let mut graph = Graph::new("v1");
        graph.add_node(node("a")).unwrap();

        assert!(validate(&graph, true).is_err());

        let n = graph.get_node_mut(&NodeId::new("a")).unwrap();
        n.zoom_level = Some(crate::model::ZoomLevel::SERVICE);
        assert!(validate(&graph, true).is_ok());
    }
}
