//! Edge types for the flow graph.

use serde::{Deserialize, Serialize};

use super::ids::{EdgeId, NodeId};

/// The kind of relationship an edge represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeType {
    Call,
    Handles,
    Produces,
    Consumes,
    BelongsTo,
    Defines,
    RuntimeCall,
    DependsOn,
    FlowsTo,
}

impl EdgeType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "CALL" => Some(Self::Call),
            "HANDLES" => Some(Self::Handles),
            "PRODUCES" => Some(Self::Produces),
            "CONSUMES" => Some(Self::Consumes),
            "BELONGS_TO" => Some(Self::BelongsTo),
            "DEFINES" => Some(Self::Defines),
            "RUNTIME_CALL" => Some(Self::RuntimeCall),
            "DEPENDS_ON" => Some(Self::DependsOn),
            "FLOWS_TO" => Some(Self::FlowsTo),
            _ => None,
        }
    }
}

impl std::fmt::Display for EdgeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Call => "CALL",
            Self::Handles => "HANDLES",
            Self::Produces => "PRODUCES",
            Self::Consumes => "CONSUMES",
            Self::BelongsTo => "BELONGS_TO",
            Self::Defines => "DEFINES",
            Self::RuntimeCall => "RUNTIME_CALL",
            Self::DependsOn => "DEPENDS_ON",
            Self::FlowsTo => "FLOWS_TO",
        };
        write!(f, "{s}")
    }
}

/// A directed edge in the flow graph. `execution_count` is non-negative and
/// monotonically non-decreasing over the graph's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    pub edge_type: EdgeType,
    pub execution_count: u64,
}

impl Edge {
    pub fn new(id: EdgeId, source: NodeId, target: NodeId, edge_type: EdgeType) -> Self {
        Self {
            id,
            source,
            target,
            edge_type,
            execution_count: 0,
        }
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}
