//! The trace buffer: runtime events accumulate per trace id until the trace
//! completes and is handed to the merge engine.

mod buffer;
mod event;
mod trace;

pub use buffer::TraceBuffer;
pub use event::{DedupKey, EventType, RuntimeEvent};
pub use trace::{AsyncHop, Trace, TraceCheckpoint, TraceError};
