//! # Coedit Editor
//!
//! Operational-transformation engine for tree-structured rich text.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ operation: loosely-typed records → Operation │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ reconcile: apply if current, else           │
//! │  - fold transform_batch over revision log   │
//! │  - retry until the batch is current         │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ apply: all-or-nothing mutation of Document  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Server authority**: the server's revision log orders every batch
//! 2. **Pure algebra**: paths and transforms never mutate their inputs
//! 3. **Atomic batches**: a batch fully applies or leaves the tree alone
//! 4. **Drops are not errors**: edits to deleted nodes simply vanish
//!
//! ## Usage
//!
//! ```rust,ignore
//! use coedit_editor::{commit, Document, OperationBatch, RevisionLog};
//!
//! let mut doc = Document::from_content(json!([{ "text": "ab" }]))?;
//! let mut log = RevisionLog::new();
//!
//! // A batch authored at revision 0, possibly after others were applied
//! let batch = OperationBatch::decode(inbound)?;
//! let applied = commit(&mut doc, batch, &mut log)?;
//!
//! // Broadcast `applied` with the resulting revision `doc.revision`
//! ```

mod apply;
mod document;
mod errors;
mod node;
mod operation;
pub mod path;
mod reconcile;
mod revision_log;
mod session;
mod transform;

pub use document::{resolve, resolve_mut, Document, Snapshot};
pub use errors::{ApplyFailure, OtError, OtResult};
pub use node::{
    Attributes, InvalidNode, Node, TextMarks, BACKGROUND_COLOR_MARK, BOLD_MARK, CHILDREN_KEY,
    ITALIC_MARK, STRIKETHROUGH_MARK, TEXT_KEY,
};
pub use operation::{Operation, OperationBatch, OPERATION_TYPES};
pub use path::Path;
pub use reconcile::{apply_batch, commit};
pub use revision_log::RevisionLog;
pub use session::EditSession;
pub use transform::{
    transform, transform_batch, transform_batch_with, transform_path, transform_point,
    transform_through, transform_with, Affinity, Point,
};
