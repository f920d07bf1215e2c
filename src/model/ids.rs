//! Identifier newtypes shared across the graph model.
//!
//! Each id wraps a `String` rather than a `Uuid` because static-analysis
//! adapters and runtime agents mint their own ids (e.g. `"order-service"`,
//! `"svc::pay#charge"`) that are not guaranteed to be UUIDs.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw identifier string.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the underlying string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(
    /// Identifies a graph submitted by the build-time adapter.
    GraphId
);
string_id!(
    /// Identifies a node within a single graph.
    NodeId
);
string_id!(
    /// Identifies an edge within a single graph.
    EdgeId
);
string_id!(
    /// Identifies a runtime trace (one execution instance).
    TraceId
);
string_id!(
    /// Identifies a span within a trace.
    SpanId
);
string_id!(
    /// Identifies a single runtime event, when the submitter provides one.
    EventId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_lexicographic() {
        let a = NodeId::new("a");
        let b = NodeId::new("b");
        assert!(a < b);
    }

    #[test]
    fn display_round_trips() {
        let id = GraphId::from("order-flow");
        assert_eq!(id.to_string(), "order-flow");
        assert_eq!(id.as_str(), "order-flow");
    }
}
