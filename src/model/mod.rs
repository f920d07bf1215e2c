//! Pure value types for the flow graph: nodes, edges, and the graph itself.
//!
//! No I/O, no concurrency. Everything here is plain data plus the invariant
//! checks that can be enforced locally; the store (`crate::store`) is what
//! adds concurrency and identity.

pub mod edge;
pub mod graph;
pub mod ids;
pub mod metadata;
pub mod node;

pub use edge::{Edge, EdgeType};
pub use graph::{Graph, GraphError};
pub use ids::{EdgeId, EventId, GraphId, NodeId, SpanId, TraceId};
pub use metadata::{Checkpoint, LastError, MetadataValue};
pub use node::{Metadata, Node, NodeType, Visibility, ZoomLevel};
