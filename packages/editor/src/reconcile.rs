//! # Revision Reconciler
//!
//! "Apply if current, else transform forward through history and retry."
//!
//! ```text
//! batch @ R ──► R == doc.revision? ──yes──► apply_all ──► revision += 1
//!                   │ no
//!                   ▼
//!          fold transform_batch over log.since(R) ──► batch @ R' ──┘
//! ```
//!
//! Callers own serialization: the read-transform-apply-append sequence
//! must run under one per-document lock.

use crate::document::Document;
use crate::errors::{OtError, OtResult};
use crate::operation::OperationBatch;
use crate::revision_log::RevisionLog;
use crate::transform::transform_batch;

/// Bring `batch` up to the document's revision and apply it.
///
/// Returns the batch that was actually applied, stamped with the revision
/// it was applied at. The document is untouched on error.
pub fn apply_batch(document: &mut Document, batch: OperationBatch, log: &RevisionLog) -> OtResult<OperationBatch> {
    let submitted = batch.document_revision;
    let mut batch = batch;

    while batch.document_revision != document.revision {
        batch = fast_forward(batch, log)?;
    }

    document.apply_all(&batch.operations)?;
    document.revision += 1;

    tracing::debug!(
        submitted,
        applied_at = batch.document_revision,
        revision = document.revision,
        operations = batch.len(),
        "applied batch"
    );

    Ok(batch)
}

/// [`apply_batch`], then record the applied batch in `log`.
pub fn commit(document: &mut Document, batch: OperationBatch, log: &mut RevisionLog) -> OtResult<OperationBatch> {
    let applied = apply_batch(document, batch, log)?;
    log.append(applied.clone())?;
    Ok(applied)
}

/// One pass of the fold over every logged batch at or after the batch's
/// own revision.
fn fast_forward(batch: OperationBatch, log: &RevisionLog) -> OtResult<OperationBatch> {
    let no_history = || OtError::NoHistoryToTransformAgainst {
        revision: batch.document_revision,
    };

    let mut history = log.since(batch.document_revision).peekable();
    match history.peek() {
        // retention dropped the entries between the batch and the log
        Some(first) if first.document_revision > batch.document_revision => return Err(no_history()),
        Some(_) => {}
        None => return Err(no_history()),
    }

    let mut current = batch.clone();
    for entry in history {
        current = transform_batch(&current, entry)?;
    }
    Ok(current)
}
