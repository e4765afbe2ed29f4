//! Error types for the workspace

use std::path::PathBuf;

use coedit_editor::{InvalidNode, OtError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error(transparent)]
    Ot(#[from] OtError),

    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] serde_json::Error),

    #[error("Invalid document content: {0}")]
    InvalidContent(#[from] InvalidNode),

    #[error("Unknown user '{user_id}' in document '{document}'")]
    UnknownUser { user_id: String, document: String },

    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path:?}: {reason}")]
    Config { path: PathBuf, reason: String },
}

impl WorkspaceError {
    /// The client's revision is older than retained history.
    pub fn requires_resync(&self) -> bool {
        matches!(self, WorkspaceError::Ot(e) if e.requires_resync())
    }
}

pub type WorkspaceResult<T> = Result<T, WorkspaceError>;
