//! # Document Handle
//!
//! A Document owns one root element (a `{children: [...]}` wrapper around
//! the user-visible top-level nodes) and the revision counter that the
//! reconciler bumps once per applied batch.
//!
//! ## Lifecycle
//!
//! ```text
//! Seed → Resolve paths → Apply operations → Snapshot
//!   ↓          ↓                ↓               ↓
//! JSON     &Node / parent   scratch root     {revision, content}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{OtError, OtResult};
use crate::node::{InvalidNode, Node, CHILDREN_KEY};
use crate::operation::Operation;
use crate::path;

/// Shared, editable document
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Number of batches applied so far
    pub revision: u64,

    root: Node,
}

/// Point-in-time copy of a document, as served to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub revision: u64,
    pub content: Vec<Node>,
}

impl Document {
    /// Create document at revision 0 from top-level nodes
    pub fn new(content: Vec<Node>) -> Self {
        Self {
            revision: 0,
            root: Node::element(content),
        }
    }

    /// Create document from structural content.
    ///
    /// Accepts either the top-level node array or a `{children: [...]}`
    /// root object; `null` yields an empty document.
    pub fn from_content(content: Value) -> Result<Self, InvalidNode> {
        let root = match content {
            Value::Null => Node::element(Vec::new()),
            Value::Array(items) => {
                let children = items
                    .into_iter()
                    .map(Node::try_from)
                    .collect::<Result<Vec<_>, _>>()?;
                Node::element(children)
            }
            object @ Value::Object(_) => {
                let root = Node::try_from(object)?;
                if !root.is_element() {
                    return Err(InvalidNode(format!(
                        "document root must have {CHILDREN_KEY}"
                    )));
                }
                root
            }
            other => {
                return Err(InvalidNode(format!(
                    "document content must be an array or object, got {other}"
                )))
            }
        };

        Ok(Self { revision: 0, root })
    }

    pub fn with_revision(mut self, revision: u64) -> Self {
        self.revision = revision;
        self
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// User-visible top-level nodes
    pub fn content(&self) -> &[Node] {
        self.root.children().unwrap_or_default()
    }

    pub fn resolve(&self, path: &[usize]) -> OtResult<&Node> {
        resolve(&self.root, path)
    }

    pub fn parent_of(&self, path: &[usize]) -> OtResult<&Node> {
        resolve(&self.root, path::parent(path))
    }

    /// Apply one operation. The tree is left untouched on failure.
    pub fn apply(&mut self, operation: &Operation) -> OtResult<()> {
        self.apply_all(std::slice::from_ref(operation))
    }

    /// Apply operations in order, all or nothing.
    ///
    /// Operations run against a scratch copy of the root which replaces
    /// the live tree only once every operation has succeeded. The
    /// revision is not touched; that is the reconciler's job.
    pub fn apply_all(&mut self, operations: &[Operation]) -> OtResult<()> {
        let mut scratch = self.root.clone();
        for operation in operations {
            operation.apply(&mut scratch)?;
        }
        self.root = scratch;
        Ok(())
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            revision: self.revision,
            content: self.content().to_vec(),
        }
    }

    /// Top-level nodes as a structural JSON array
    pub fn content_json(&self) -> Value {
        Value::Array(self.content().iter().cloned().map(Value::from).collect())
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl From<Snapshot> for Document {
    fn from(snapshot: Snapshot) -> Self {
        Self::new(snapshot.content).with_revision(snapshot.revision)
    }
}

/// Walk from `root` following each index of `path`.
pub fn resolve<'a>(root: &'a Node, path: &[usize]) -> OtResult<&'a Node> {
    let mut current = root;
    for &index in path {
        current = current
            .children()
            .and_then(|children| children.get(index))
            .ok_or_else(|| OtError::not_found(path))?;
    }
    Ok(current)
}

pub fn resolve_mut<'a>(root: &'a mut Node, path: &[usize]) -> OtResult<&'a mut Node> {
    let mut current = root;
    for &index in path {
        current = current
            .children_mut()
            .and_then(|children| children.get_mut(index))
            .ok_or_else(|| OtError::not_found(path))?;
    }
    Ok(current)
}

/// Children array of the node containing `path`.
pub(crate) fn sibling_list_mut<'a>(root: &'a mut Node, path: &[usize]) -> OtResult<&'a mut Vec<Node>> {
    resolve_mut(root, path::parent(path))?
        .children_mut()
        .ok_or_else(|| OtError::not_found(path::parent(path)))
}
