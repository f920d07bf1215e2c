//! Extractor / exporter: zoom slicing, BFS flow extraction, and Cypher
//! serialization for the external analytics store.

pub mod cypher;
pub mod flow;
pub mod sink;
pub mod slice;

pub use cypher::export as export_cypher;
pub use flow::{extract_flow, extract_flows, Flow, FlowStep};
pub use sink::{AnalyticsSink, InMemorySink, NullSink};
pub use slice::slice as slice_graph;
