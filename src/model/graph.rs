//! The versioned directed multigraph.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::edge::Edge;
use super::ids::{EdgeId, NodeId};
use super::node::{Node, ZoomLevel};

/// Errors raised by direct graph mutation. These are distinct from
/// [`crate::error::CoreError`] because the graph model has no I/O and no
/// knowledge of graph ids or stores; callers translate
/// `GraphError::InvalidReference` into `CoreError::InvalidReference`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    #[error("edge {edge_id} references missing node {node_id}")]
    InvalidReference { edge_id: EdgeId, node_id: NodeId },
    #[error("duplicate node id {0}")]
    DuplicateNode(NodeId),
    #[error("duplicate edge id {0}")]
    DuplicateEdge(EdgeId),
}

/// A versioned directed multigraph of typed nodes and edges.
///
/// `outgoing`/`incoming` are maintained in lockstep with `edges` on every
/// mutation rather than recomputed, so reads never pay an indexing cost.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Graph {
    pub version: String,
    nodes: BTreeMap<NodeId, Node>,
    edges: BTreeMap<EdgeId, Edge>,
    outgoing: BTreeMap<NodeId, Vec<EdgeId>>,
    incoming: BTreeMap<NodeId, Vec<EdgeId>>,
}

impl Graph {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
            outgoing: BTreeMap::new(),
            incoming: BTreeMap::new(),
        }
    }

    pub fn add_node(&mut self, node: Node) -> Result<(), GraphError> {
        if self.nodes.contains_key(&node.id) {
            return Err(GraphError::DuplicateNode(node.id));
        }
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    /// Insert a node if absent; no-op (and `false`) if it already exists.
    /// Used by the merge engine's Runtime-Node stage, which must never
    /// overwrite an existing node.
    pub fn add_node_if_absent(&mut self, node: Node) -> bool {
        if self.nodes.contains_key(&node.id) {
            return false;
        }
        self.nodes.insert(node.id.clone(), node);
        true
    }

    /// Fails with `GraphError::InvalidReference` if either endpoint is
    /// absent from the graph.
    pub fn add_edge(&mut self, edge: Edge) -> Result<(), GraphError> {
        if !self.nodes.contains_key(&edge.source) {
            return Err(GraphError::InvalidReference {
                edge_id: edge.id,
                node_id: edge.source,
            });
        }
        if !self.nodes.contains_key(&edge.target) {
            return Err(GraphError::InvalidReference {
                edge_id: edge.id,
                node_id: edge.target,
            });
        }
        if self.edges.contains_key(&edge.id) {
            return Err(GraphError::DuplicateEdge(edge.id));
        }
        self.outgoing
            .entry(edge.source.clone())
            .or_default()
            .push(edge.id.clone());
        self.incoming
            .entry(edge.target.clone())
            .or_default()
            .push(edge.id.clone());
        self.edges.insert(edge.id.clone(), edge);
        Ok(())
    }

    pub fn get_node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn get_node_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn get_edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.edges.get(id)
    }

    pub fn get_edge_mut(&mut self, id: &EdgeId) -> Option<&mut Edge> {
        self.edges.get_mut(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn outgoing(&self, node_id: &NodeId) -> &[EdgeId] {
        self.outgoing.get(node_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn incoming(&self, node_id: &NodeId) -> &[EdgeId] {
        self.incoming.get(node_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The first edge of any type from `source` to `target`, if any. Used by
    /// the Runtime-Edge merge stage to decide whether a `RUNTIME_CALL` edge
    /// is needed.
    pub fn find_edge(&self, source: &NodeId, target: &NodeId) -> Option<&Edge> {
        self.outgoing(source)
            .iter()
            .filter_map(|id| self.edges.get(id))
            .find(|e| &e.target == target)
    }

    pub fn find_edge_mut(&mut self, source: &NodeId, target: &NodeId) -> Option<&mut Edge> {
        let edge_id = self
            .outgoing(source)
            .iter()
            .find(|id| self.edges.get(*id).map(|e| &e.target) == Some(target))
            .cloned()?;
        self.edges.get_mut(&edge_id)
    }

    pub fn nodes_at_zoom(&self, level: ZoomLevel) -> Vec<&Node> {
        self.nodes
            .values()
            .filter(|n| n.zoom_level == Some(level))
            .collect()
    }

    /// An immutable copy for publication to readers. The model has no
    /// interior mutability, so a snapshot is simply an owned clone; the
    /// store enforces "never mutate a published snapshot" by only ever
    /// handing out fresh clones from behind its lock, never a live
    /// reference into the stored graph.
    pub fn snapshot(&self) -> Graph {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::node::{NodeType, Visibility};

    fn node(id: &str) -> Node {
        Node::new(NodeId::new(id), id, NodeType::Service, "svc").with_visibility(Visibility::Public)
    }

    #[test]
    fn add_edge_requires_both_endpoints() {
        let mut g = Graph::new("v1");
        g.add_node(node("a")).unwrap();
        let err = g
            .add_edge(Edge::new(
                EdgeId::new("e1"),
                NodeId::new("a"),
                NodeId::new("missing"),
                crate::model::edge::EdgeType::Call,
            ))
            .unwrap_err();
        assert!(matches!(err, GraphError::InvalidReference { .. }));
    }

    #[test]
    fn outgoing_incoming_stay_in_lockstep() {
        let mut g = Graph::new("v1");
        g.add_node(node("a")).unwrap();
        g.add_node(node("b")).unwrap();
        g.add_edge(Edge::new(
            EdgeId::new("e1"),
            NodeId::new("a"),
            NodeId::new("b"),
            crate::model::edge::EdgeType::Call,
        ))
        .unwrap();

        assert_eq!(g.outgoing(&NodeId::new("a")), &[EdgeId::new("e1")]);
        assert_eq!(g.incoming(&NodeId::new("b")), &[EdgeId::new("e1")]);
    }

    #[test]
    fn add_node_if_absent_never_overwrites() {
        let mut g = Graph::new("v1");
        let mut a = node("a");
        a.set_metadata("k", crate::model::metadata::MetadataValue::Int(1));
        g.add_node(a).unwrap();

        let fresh = node("a");
        assert!(!g.add_node_if_absent(fresh));
        assert!(g.get_node(&NodeId::new("a")).unwrap().metadata_get("k").is_some());
    }
}
