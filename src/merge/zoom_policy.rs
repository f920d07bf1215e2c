//! Zoom-level assignment, applied once after the merge stages to
//! every node whose zoom level is still unset. Levels already assigned —
//! including the 5 stamped by the Runtime-Node stage — are never revisited.

use crate::model::{Graph, NodeType, Visibility, ZoomLevel};

pub fn assign(graph: &mut Graph) {
    let ids: Vec<_> = graph.nodes().map(|n| n.id.clone()).collect();
    for id in ids {
        let node = graph.get_node_mut(&id).expect("id came from graph.nodes()");
        if node.zoom_level.is_some() {
            continue;
        }

        node.zoom_level = match node.node_type {
            NodeType::Endpoint | NodeType::Topic => Some(ZoomLevel::BUSINESS),
            NodeType::Service | NodeType::Class => Some(ZoomLevel::SERVICE),
            NodeType::Method if node.visibility == Visibility::Public => Some(ZoomLevel::PUBLIC),
            NodeType::Method | NodeType::PrivateMethod => Some(ZoomLevel::PRIVATE),
            NodeType::Interface | NodeType::Field | NodeType::Constructor => None,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Node, NodeId};

    #[test]
    fn assigns_by_type_and_visibility() {
        let mut graph = Graph::new("v1");
        graph
            .add_node(Node::new(NodeId::new("ep"), "ep", NodeType::Endpoint, "svc"))
            .unwrap();
        graph
            .add_node(Node::new(NodeId::new("pub-method"), "m", NodeType::Method, "svc").with_visibility(Visibility::Public))
            .unwrap();
        graph
            .add_node(Node::new(NodeId::new("priv-method"), "m", NodeType::Method, "svc").with_visibility(Visibility::Private))
            .unwrap();

        assign(&mut graph);

        assert_eq!(graph.get_node(&NodeId::new("ep")).unwrap().zoom_level, Some(ZoomLevel::BUSINESS));
        assert_eq!(graph.get_node(&NodeId::new("pub-method")).unwrap().zoom_level, Some(ZoomLevel::PUBLIC));
        assert_eq!(graph.get_node(&NodeId::new("priv-method")).unwrap().zoom_level, Some(ZoomLevel::PRIVATE));
    }

    #[test]
    fn never_overwrites_existing_zoom_level() {
        let mut graph = Graph::new("v1");
        let mut node = Node::new(NodeId::new("a"), "a", NodeType::Endpoint, "svc");
        node.zoom_level = Some(ZoomLevel::RUNTIME);
        graph.add_node(node).unwrap();

        assign(&mut graph);
        assert_eq!(graph.get_node(&NodeId::new("a")).unwrap().zoom_level, Some(ZoomLevel::RUNTIME));
    }
}
