//! # Operations
//!
//! The eight atomic edits a client can submit. Each carries the target
//! `path` plus variant-specific fields; the wire form is a flat record with
//! a `type` discriminator:
//!
//! ```json
//! { "type": "insert_text", "path": [0, 1], "offset": 3, "text": "abc" }
//! ```
//!
//! Operations are value objects. Transformation always produces a new
//! operation and never mutates the one it was given.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{OtError, OtResult};
use crate::node::{Attributes, Node};
use crate::path::Path;

/// Atomic structural edit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    /// Insert a full node at `path`
    InsertNode { path: Path, node: Node },

    /// Splice `text` into the leaf at `path`
    InsertText {
        path: Path,
        offset: usize,
        text: String,
    },

    /// Delete `text.len()` characters starting at `offset`
    RemoveText {
        path: Path,
        offset: usize,
        text: String,
    },

    /// Delete the node at `path`; `node` is informational only
    RemoveNode {
        path: Path,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        node: Option<Node>,
    },

    /// Diff-apply non-structural attributes
    #[serde(rename_all = "camelCase")]
    SetNode {
        path: Path,
        #[serde(default)]
        properties: Attributes,
        new_properties: Attributes,
    },

    /// Split into two siblings; `properties` seeds the right-hand one
    SplitNode {
        path: Path,
        position: usize,
        #[serde(default)]
        properties: Attributes,
    },

    /// Merge into the immediately preceding sibling
    MergeNode {
        path: Path,
        position: usize,
        #[serde(default)]
        properties: Attributes,
    },

    /// Relocate the node at `path` to `new_path`
    #[serde(rename_all = "camelCase")]
    MoveNode { path: Path, new_path: Path },
}

/// Wire discriminators, in the order clients usually see them
pub const OPERATION_TYPES: [&str; 8] = [
    "insert_node",
    "insert_text",
    "merge_node",
    "move_node",
    "remove_node",
    "remove_text",
    "set_node",
    "split_node",
];

impl Operation {
    /// Decode one loosely-typed record.
    pub fn decode(record: Value) -> OtResult<Self> {
        let kind = match record.get("type") {
            Some(Value::String(kind)) => kind.clone(),
            Some(other) => {
                return Err(OtError::MalformedOperation {
                    kind: "unknown".to_string(),
                    reason: format!("type must be a string, got {other}"),
                })
            }
            None => {
                return Err(OtError::MalformedOperation {
                    kind: "unknown".to_string(),
                    reason: "missing type discriminator".to_string(),
                })
            }
        };

        if !OPERATION_TYPES.contains(&kind.as_str()) {
            return Err(OtError::UnsupportedOperationType(kind));
        }

        serde_json::from_value(record).map_err(|e| OtError::MalformedOperation {
            kind,
            reason: e.to_string(),
        })
    }

    /// Decode an ordered sequence of records.
    pub fn decode_all(records: Value) -> OtResult<Vec<Self>> {
        match records {
            Value::Array(items) => items.into_iter().map(Self::decode).collect(),
            other => Err(OtError::MalformedOperation {
                kind: "batch".to_string(),
                reason: format!("operations must be an array, got {other}"),
            }),
        }
    }

    /// Wire discriminator of this variant
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::InsertNode { .. } => "insert_node",
            Operation::InsertText { .. } => "insert_text",
            Operation::RemoveText { .. } => "remove_text",
            Operation::RemoveNode { .. } => "remove_node",
            Operation::SetNode { .. } => "set_node",
            Operation::SplitNode { .. } => "split_node",
            Operation::MergeNode { .. } => "merge_node",
            Operation::MoveNode { .. } => "move_node",
        }
    }

    pub fn path(&self) -> &[usize] {
        match self {
            Operation::InsertNode { path, .. }
            | Operation::InsertText { path, .. }
            | Operation::RemoveText { path, .. }
            | Operation::RemoveNode { path, .. }
            | Operation::SetNode { path, .. }
            | Operation::SplitNode { path, .. }
            | Operation::MergeNode { path, .. }
            | Operation::MoveNode { path, .. } => path,
        }
    }

    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::InsertNode { path, .. } => write!(f, "insert node {path:?}"),
            Operation::InsertText { path, offset, text } => {
                write!(f, "insert '{text}'{path:?}@{offset}")
            }
            Operation::RemoveText { path, offset, text } => {
                write!(f, "remove '{text}'{path:?}@{offset}")
            }
            Operation::RemoveNode { path, .. } => write!(f, "remove node {path:?}"),
            Operation::SetNode { path, .. } => write!(f, "set node {path:?}"),
            Operation::SplitNode { path, position, .. } => write!(f, "split {path:?}@{position}"),
            Operation::MergeNode { path, position, .. } => write!(f, "merge {path:?}@{position}"),
            Operation::MoveNode { path, new_path } => write!(f, "move {path:?} -> {new_path:?}"),
        }
    }
}

/// Operations authored against one document revision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationBatch {
    /// Revision the author believed was current
    pub document_revision: u64,

    pub operations: Vec<Operation>,
}

impl OperationBatch {
    pub fn new(document_revision: u64, operations: Vec<Operation>) -> Self {
        Self {
            document_revision,
            operations,
        }
    }

    /// Decode an inbound `{documentRevision, operations}` record.
    pub fn decode(record: Value) -> OtResult<Self> {
        let malformed = |reason: String| OtError::MalformedOperation {
            kind: "batch".to_string(),
            reason,
        };

        let Value::Object(mut map) = record else {
            return Err(malformed("batch must be an object".to_string()));
        };

        let document_revision = map
            .get("documentRevision")
            .and_then(Value::as_u64)
            .ok_or_else(|| malformed("documentRevision must be a non-negative integer".to_string()))?;

        let operations = map
            .remove("operations")
            .ok_or_else(|| malformed("missing operations".to_string()))?;

        Ok(Self {
            document_revision,
            operations: Operation::decode_all(operations)?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }
}

impl fmt::Display for OperationBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rev [{}]", self.document_revision)?;
        for operation in &self.operations {
            write!(f, "\n{operation}")?;
        }
        Ok(())
    }
}
