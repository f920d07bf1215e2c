//! The stable error taxonomy surfaced to submitters and readers.

use thiserror::Error;

use crate::model::{EdgeId, GraphId, NodeId, TraceId};

/// Errors returned by [`crate::api::FlowCore`] operations.
///
/// Internal failures never leak type names or stack traces past this
/// boundary — only the kind and a short message survive into `Display`.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("graph not found: {0}")]
    GraphNotFound(GraphId),

    #[error("trace not found: {0}")]
    TraceNotFound(TraceId),

    #[error("queue full")]
    QueueFull,

    #[error("edge {edge_id} references missing node {node_id}")]
    InvalidReference { edge_id: EdgeId, node_id: NodeId },

    #[error("merge conflict on graph {0} after exhausting retry budget")]
    MergeConflict(GraphId),

    #[error("merge produced an invalid graph: {0}")]
    MergeInvalid(String),

    #[error("analytics sink unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<crate::model::GraphError> for CoreError {
    fn from(err: crate::model::GraphError) -> Self {
        match err {
            crate::model::GraphError::InvalidReference { edge_id, node_id } => {
                CoreError::InvalidReference { edge_id, node_id }
            }
            other => CoreError::Internal(other.to_string()),
        }
    }
}

impl CoreError {
    /// A stable, machine-readable identifier for this error kind, used by
    /// the (feature-gated) HTTP layer's status-code mapping and by log
    /// fields. Never changes across restarts.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::GraphNotFound(_) => "GRAPH_NOT_FOUND",
            Self::TraceNotFound(_) => "TRACE_NOT_FOUND",
            Self::QueueFull => "QUEUE_FULL",
            Self::InvalidReference { .. } => "INVALID_REFERENCE",
            Self::MergeConflict(_) => "MERGE_CONFLICT",
            Self::MergeInvalid(_) => "MERGE_INVALID",
            Self::Unavailable(_) => "UNAVAILABLE",
            Self::Internal(_) => "INTERNAL",
        }
    }
}
