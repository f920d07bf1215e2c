//! The graph store: sharded, thread-safe storage for merged graphs plus
//! their metadata.

mod shard;

pub use shard::{GraphMetadata, GraphStore};
