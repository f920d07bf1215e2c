//! Open-extension metadata values attached to nodes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single checkpoint recorded against a node during merge: a name, the
/// time it fired, and arbitrary payload data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub data: serde_json::Value,
}

/// The most recent error observed for a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastError {
    pub message: String,
    pub error_type: String,
}

/// An arbitrary metadata value. Nodes use this as an open extension point
/// for durations, execution counts, checkpoints, and custom attributes
/// submitted by adapters or discovered at merge time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Checkpoints(Vec<Checkpoint>),
    Error(LastError),
    Json(serde_json::Value),
    Null,
}

impl MetadataValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Float(v) => Some(*v),
            MetadataValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MetadataValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_checkpoints_mut(&mut self) -> Option<&mut Vec<Checkpoint>> {
        match self {
            MetadataValue::Checkpoints(c) => Some(c),
            _ => None,
        }
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::Str(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        MetadataValue::Int(value)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        MetadataValue::Float(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        MetadataValue::Bool(value)
    }
}
