//! Cypher export: serializes a merged graph snapshot into statements an
//! external analytics store can execute. Flow Core never runs these
//! statements itself.

use crate::model::{Edge, Graph, GraphId, MetadataValue, Node};
use crate::store::GraphMetadata;

/// Emits, in order: one `MERGE` for the graph node, one `CREATE` per node,
/// then one `MATCH`/`CREATE` pair per edge. Each statement is terminated
/// with `;` and the caller joins them in the returned order.
pub fn export(graph: &Graph, metadata: &GraphMetadata) -> Vec<String> {
    let mut statements = Vec::with_capacity(1 + graph.node_count() + graph.edge_count());
    statements.push(graph_statement(metadata));
    for node in graph.nodes() {
        statements.push(node_statement(node, &metadata.graph_id));
    }
    for edge in graph.edges() {
        statements.push(edge_statement(edge, &metadata.graph_id));
    }
    statements
}

fn graph_statement(metadata: &GraphMetadata) -> String {
    format!(
        "MERGE (g:FlowGraph {{graphId: {}, version: {}, nodeCount: {}, edgeCount: {}, updatedAt: {}}});",
        quoted(&metadata.graph_id.to_string()),
        quoted(&metadata.version),
        metadata.node_count,
        metadata.edge_count,
        quoted(&metadata.last_updated_at.to_rfc3339()),
    )
}

fn node_statement(node: &Node, graph_id: &GraphId) -> String {
    let mut props = vec![
        format!("id: {}", quoted(node.id.as_str())),
        format!("graphId: {}", quoted(graph_id.as_str())),
        format!("name: {}", quoted(&node.name)),
        format!("type: {}", quoted(&node.node_type.to_string())),
        format!("serviceId: {}", quoted(&node.service_id)),
        format!("visibility: {}", quoted(&node.visibility.to_string())),
    ];
    match node.zoom_level {
        Some(level) => props.push(format!("zoomLevel: {}", level.value())),
        None => props.push("zoomLevel: null".to_string()),
    }
    for (key, value) in &node.metadata {
        props.push(format!("{key}: {}", metadata_value(value)));
    }

    format!("CREATE (n{}:FlowNode {{{}}});", sanitize_id(node.id.as_str()), props.join(", "))
}

fn edge_statement(edge: &Edge, graph_id: &GraphId) -> String {
    format!(
        "MATCH (s:FlowNode {{id: {}, graphId: {}}}), (t:FlowNode {{id: {}, graphId: {}}}) CREATE (s)-[e:{} {{id: {}, executionCount: {}}}]->(t);",
        quoted(edge.source.as_str()),
        quoted(graph_id.as_str()),
        quoted(edge.target.as_str()),
        quoted(graph_id.as_str()),
        edge.edge_type,
        quoted(edge.id.as_str()),
        edge.execution_count,
    )
}

/// Node-id → Cypher variable identifier: every character outside
/// `[A-Za-z0-9_]` becomes `_`.
fn sanitize_id(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

fn quoted(s: &str) -> String {
    format!("'{}'", s.replace('\'', "\\'"))
}

fn metadata_value(value: &MetadataValue) -> String {
    match value {
        MetadataValue::Str(s) => quoted(s),
        MetadataValue::Int(i) => i.to_string(),
        MetadataValue::Float(f) => f.to_string(),
        MetadataValue::Bool(b) => b.to_string(),
        MetadataValue::Null => "null".to_string(),
        MetadataValue::Checkpoints(c) => quoted(&serde_json::to_string(c).unwrap_or_default()),
        MetadataValue::Error(e) => quoted(&serde_json::to_string(e).unwrap_or_default()),
        MetadataValue::Json(v) => quoted(&v.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::model::{EdgeId, EdgeType, NodeId, NodeType};
    use crate::store::GraphStore;
    use chrono::Utc;
    use std::sync::Arc;

    fn sample_graph() -> Graph {
        let mut g = Graph::new("v1");
        g.add_node(Node::new(NodeId::new("svc::a"), "a", NodeType::Service, "svc")).unwrap();
        g.add_node(Node::new(NodeId::new("svc::b"), "b", NodeType::Service, "svc")).unwrap();
        g.add_edge(Edge::new(EdgeId::new("e1"), NodeId::new("svc::a"), NodeId::new("svc::b"), EdgeType::Call)).unwrap();
        g
    }

    #[test]
    fn sanitize_replaces_non_word_characters() {
        assert_eq!(sanitize_id("svc::a#1"), "svc__a_1");
    }

    #[test]
    fn quoted_escapes_single_quotes() {
        assert_eq!(quoted("it's"), "'it\\'s'");
    }

    #[test]
    fn export_emits_graph_then_nodes_then_edges() {
        let store = GraphStore::new(Arc::new(ManualClock::new(Utc::now())));
        let gid = GraphId::new("g1");
        store.put_static(gid.clone(), sample_graph());

        let graph = store.get(&gid).unwrap();
        let metadata = store.metadata(&gid).unwrap();
        let statements = export(&graph, &metadata);

        assert_eq!(statements.len(), 1 + 2 + 1);
        assert!(statements[0].starts_with("MERGE (g:FlowGraph"));
        assert!(statements[1].starts_with("CREATE (n"));
        assert!(statements[2].starts_with("CREATE (n"));
        assert!(statements[3].starts_with("MATCH (s:FlowNode"));
    }

    #[test]
    fn every_node_id_in_an_edge_match_appears_in_a_preceding_create() {
        let store = GraphStore::new(Arc::new(ManualClock::new(Utc::now())));
        let gid = GraphId::new("g1");
        store.put_static(gid.clone(), sample_graph());

        let graph = store.get(&gid).unwrap();
        let metadata = store.metadata(&gid).unwrap();
        let statements = export(&graph, &metadata);

        let creates: Vec<&String> = statements.iter().filter(|s| s.starts_with("CREATE (n")).collect();
        for statement in statements.iter().filter(|s| s.starts_with("MATCH")) {
            assert!(creates.iter().any(|c| c.contains(&sanitize_id("svc::a")) || c.contains(&sanitize_id("svc::b"))));
            let _ = statement;
        }
    }

    #[test]
    fn package_private_visibility_round_trips_through_the_canonical_enum_value() {
        let mut node = Node::new(NodeId::new("a"), "a", NodeType::Class, "svc");
        node.visibility = crate::model::Visibility::PackagePrivate;

        let statement = node_statement(&node, &GraphId::new("g1"));

        assert!(statement.contains("visibility: 'PACKAGE_PRIVATE'"));
        assert!(crate::model::Visibility::from_str("PACKAGE_PRIVATE").is_some());
    }
}
