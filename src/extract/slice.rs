//! Zoom slicing.

use crate::model::Graph;

/// Returns a subgraph: every node whose zoom level is unassigned or
/// `<= requested_level + 1`, and every edge whose endpoints are both in
/// that node set.
///
/// The request encodes "0 = highest level, 5 = most detailed"; the
/// inclusion rule is fixed as `node.zoom <= requested_level + 1` — one
/// level of lookahead context beyond the requested zoom, so a slice
/// boundary doesn't cut a node off from its immediate children.
pub fn slice(graph: &Graph, requested_level: u8) -> Graph {
    let ceiling = requested_level.saturating_add(1);
    let mut out = Graph::new(graph.version.clone());

    for node in graph.nodes() {
        let included = match node.zoom_level {
            Some(level) => level.value() <= ceiling,
            None => true,
        };
        if included {
            let _ = out.add_node(node.clone());
        }
    }

    for edge in graph.edges() {
        if out.get_node(&edge.source).is_some() && out.get_node(&edge.target).is_some() {
            let _ = out.add_edge(edge.clone());
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Edge, EdgeId, EdgeType, Node, NodeId, NodeType, ZoomLevel};

    fn graph_with_levels() -> Graph {
        let mut g = Graph::new("v1");
        let mut business = Node::new(NodeId::new("biz"), "biz", NodeType::Endpoint, "svc");
        business.zoom_level = Some(ZoomLevel::BUSINESS);
        let mut service = Node::new(NodeId::new("svc"), "svc", NodeType::Service, "svc");
        service.zoom_level = Some(ZoomLevel::SERVICE);
        let mut runtime = Node::new(NodeId::new("rt"), "rt", NodeType::Method, "svc");
        runtime.zoom_level = Some(ZoomLevel::RUNTIME);

        g.add_node(business).unwrap();
        g.add_node(service).unwrap();
        g.add_node(runtime).unwrap();
        g.add_edge(Edge::new(EdgeId::new("e1"), NodeId::new("biz"), NodeId::new("svc"), EdgeType::Call)).unwrap();
        g.add_edge(Edge::new(EdgeId::new("e2"), NodeId::new("svc"), NodeId::new("rt"), EdgeType::RuntimeCall)).unwrap();
        g
    }

    #[test]
    fn slice_at_zero_includes_only_business_level() {
        let g = graph_with_levels();
        let sliced = slice(&g, 0);
        assert_eq!(sliced.node_count(), 1);
        assert!(sliced.get_node(&NodeId::new("biz")).is_some());
    }

    #[test]
    fn slice_closure_never_keeps_dangling_edges() {
        let g = graph_with_levels();
        let sliced = slice(&g, 0);
        assert_eq!(sliced.edge_count(), 0);

        let sliced = slice(&g, 1);
        for edge in sliced.edges() {
            assert!(sliced.get_node(&edge.source).is_some());
            assert!(sliced.get_node(&edge.target).is_some());
        }
    }

    #[test]
    fn slice_at_four_includes_everything() {
        let g = graph_with_levels();
        let sliced = slice(&g, 4);
        assert_eq!(sliced.node_count(), 3);
        assert_eq!(sliced.edge_count(), 2);
    }
}
