//! Node types for the flow graph.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::ids::NodeId;
use super::metadata::MetadataValue;

/// Metadata map attached to a node: an open extension point keyed by string.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// The kind of application element a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeType {
    Endpoint,
    Topic,
    Service,
    Class,
    Method,
    PrivateMethod,
    Interface,
    Field,
    Constructor,
}

impl NodeType {
    /// Parse from the wire representation; unknown values are not accepted
    /// (the submitted-payload boundary raises `VALIDATION_ERROR` instead of
    /// silently defaulting to some fallback type).
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "ENDPOINT" => Some(Self::Endpoint),
            "TOPIC" => Some(Self::Topic),
            "SERVICE" => Some(Self::Service),
            "CLASS" => Some(Self::Class),
            "METHOD" => Some(Self::Method),
            "PRIVATE_METHOD" => Some(Self::PrivateMethod),
            "INTERFACE" => Some(Self::Interface),
            "FIELD" => Some(Self::Field),
            "CONSTRUCTOR" => Some(Self::Constructor),
            _ => None,
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Endpoint => "ENDPOINT",
            Self::Topic => "TOPIC",
            Self::Service => "SERVICE",
            Self::Class => "CLASS",
            Self::Method => "METHOD",
            Self::PrivateMethod => "PRIVATE_METHOD",
            Self::Interface => "INTERFACE",
            Self::Field => "FIELD",
            Self::Constructor => "CONSTRUCTOR",
        };
        write!(f, "{s}")
    }
}

/// Declared visibility of a node's underlying code element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Visibility {
    Public,
    Private,
    Protected,
    PackagePrivate,
}

impl Visibility {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PUBLIC" => Some(Self::Public),
            "PRIVATE" => Some(Self::Private),
            "PROTECTED" => Some(Self::Protected),
            "PACKAGE_PRIVATE" => Some(Self::PackagePrivate),
            _ => None,
        }
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Public => "PUBLIC",
            Self::Private => "PRIVATE",
            Self::Protected => "PROTECTED",
            Self::PackagePrivate => "PACKAGE_PRIVATE",
        };
        write!(f, "{s}")
    }
}

impl Default for Visibility {
    fn default() -> Self {
        Self::Public
    }
}

/// Zoom level at which a node participates in visualization: 1 (coarsest
/// business view) through 5 (runtime-discovered detail). Assigned by the
/// merge engine's zoom-level policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ZoomLevel(u8);

impl ZoomLevel {
    pub const BUSINESS: ZoomLevel = ZoomLevel(1);
    pub const SERVICE: ZoomLevel = ZoomLevel(2);
    pub const PUBLIC: ZoomLevel = ZoomLevel(3);
    pub const PRIVATE: ZoomLevel = ZoomLevel(4);
    pub const RUNTIME: ZoomLevel = ZoomLevel(5);

    /// Construct a zoom level, rejecting anything outside `1..=5`.
    pub fn new(level: u8) -> Option<Self> {
        if (1..=5).contains(&level) {
            Some(Self(level))
        } else {
            None
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl std::fmt::Display for ZoomLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A node in the flow graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub node_type: NodeType,
    pub service_id: String,
    pub visibility: Visibility,
    /// Assigned by the merge engine's zoom-level policy, never by the
    /// submitter.
    pub zoom_level: Option<ZoomLevel>,
    pub metadata: Metadata,
}

impl Node {
    pub fn new(
        id: NodeId,
        name: impl Into<String>,
        node_type: NodeType,
        service_id: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            node_type,
            service_id: service_id.into(),
            visibility: Visibility::default(),
            zoom_level: None,
            metadata: Metadata::new(),
        }
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Insert or replace a metadata value. Concurrent writes on a shared
    /// snapshot are disallowed by construction: nodes are only mutated while
    /// owned exclusively by the merge engine or during initial construction.
    pub fn set_metadata(&mut self, key: impl Into<String>, value: MetadataValue) {
        self.metadata.insert(key.into(), value);
    }

    pub fn metadata_get(&self, key: &str) -> Option<&MetadataValue> {
        self.metadata.get(key)
    }
}
