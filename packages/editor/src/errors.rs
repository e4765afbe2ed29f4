//! Error types for the editor

use crate::path::Path;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OtError {
    #[error("Node not found at path {path:?}")]
    NodeNotFound { path: Path },

    #[error("Malformed {kind} operation: {reason}")]
    MalformedOperation { kind: String, reason: String },

    #[error("Unsupported operation type '{0}'")]
    UnsupportedOperationType(String),

    #[error("Failed to apply {variant}: {reason}")]
    ApplyFailed {
        variant: &'static str,
        reason: ApplyFailure,
    },

    #[error("Cannot transform batch at revision {batch} against older revision {against}")]
    StaleTransform { batch: u64, against: u64 },

    #[error("No history to transform revision {revision} against")]
    NoHistoryToTransformAgainst { revision: u64 },

    #[error("Path {path:?} has no previous sibling")]
    NoPreviousSibling { path: Path },

    #[error("Revision {revision} cannot follow logged revision {latest}")]
    RevisionOutOfOrder { revision: u64, latest: u64 },
}

/// Variant-specific reason attached to [`OtError::ApplyFailed`]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApplyFailure {
    #[error("cannot merge a text node with an element")]
    IncompatibleMerge,

    #[error("cannot move a node inside itself")]
    CyclicMove,

    #[error("cannot set properties of the root node")]
    CannotSetRoot,

    #[error("cannot set the reserved '{0}' property")]
    ReservedPropertyName(String),

    #[error("node is neither text nor element")]
    UnsplittableNode,

    #[error("index {index} out of range for {len} children")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("node is not text")]
    NotText,
}

impl OtError {
    pub(crate) fn apply(variant: &'static str, reason: ApplyFailure) -> Self {
        OtError::ApplyFailed { variant, reason }
    }

    pub(crate) fn not_found(path: &[usize]) -> Self {
        OtError::NodeNotFound {
            path: path.to_vec(),
        }
    }

    /// True when the submitting client must re-fetch a full snapshot
    /// instead of retrying the same batch.
    pub fn requires_resync(&self) -> bool {
        matches!(self, OtError::NoHistoryToTransformAgainst { .. })
    }
}

pub type OtResult<T> = Result<T, OtError>;
