//! # Edit Session Management
//!
//! Client-side counterpart to the reconciler.
//!
//! An EditSession represents one client's view of a document: local edits
//! are applied optimistically, at most one batch is in flight to the
//! server, and remote batches are transformed over whatever is still
//! pending so the local tree converges with the server's.
//!
//! ```text
//! apply_local ──► buffered ──flush──► in_flight ──acknowledge──► (cleared)
//!                    ▲                    ▲
//!                    └── receive_remote ──┘  (rebased against remote ops)
//! ```

use crate::document::{Document, Snapshot};
use crate::errors::OtResult;
use crate::operation::{Operation, OperationBatch};
use crate::transform::{transform_through, Affinity};

/// One client's editing state
#[derive(Debug, Clone)]
pub struct EditSession {
    /// Unique session identifier
    pub id: String,

    /// Local tree; `document.revision` is the last server revision seen
    document: Document,

    /// Sent, not yet acknowledged
    in_flight: Option<OperationBatch>,

    /// Applied locally, not yet sent
    buffered: Vec<Operation>,
}

impl EditSession {
    pub fn new(id: impl Into<String>, snapshot: Snapshot) -> Self {
        Self {
            id: id.into(),
            document: Document::from(snapshot),
            in_flight: None,
            buffered: Vec::new(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Last server revision this session has caught up with
    pub fn server_revision(&self) -> u64 {
        self.document.revision
    }

    /// Apply an edit optimistically and queue it for the server.
    pub fn apply_local(&mut self, operation: Operation) -> OtResult<()> {
        self.document.apply(&operation)?;
        self.buffered.push(operation);
        Ok(())
    }

    /// Take the buffered edits as the next batch to send.
    ///
    /// Returns `None` while a batch is still awaiting acknowledgement or
    /// when there is nothing to send.
    pub fn flush(&mut self) -> Option<OperationBatch> {
        if self.in_flight.is_some() || self.buffered.is_empty() {
            return None;
        }

        let batch = OperationBatch::new(self.document.revision, std::mem::take(&mut self.buffered));
        self.in_flight = Some(batch.clone());
        Some(batch)
    }

    /// The server applied our in-flight batch, producing `revision`.
    pub fn acknowledge(&mut self, revision: u64) {
        if self.in_flight.take().is_none() {
            tracing::warn!(session = %self.id, revision, "acknowledgement without a batch in flight");
        }
        self.document.revision = revision;
    }

    /// Integrate a batch the server applied for another client.
    ///
    /// `applied.document_revision` is the revision that batch produced.
    /// Pending edits are rebased with forward affinity, mirroring what
    /// the server will do to them; the remote edits are rebased over the
    /// pending ones with backward affinity since the server ordered them
    /// first.
    pub fn receive_remote(&mut self, applied: &OperationBatch) -> OtResult<()> {
        let mut remote = applied.operations.clone();

        // nothing is committed until the remote edits apply cleanly
        let in_flight = self.in_flight.as_ref().map(|in_flight| {
            let rebased = rebase(&in_flight.operations, &remote, Affinity::Forward);
            remote = rebase(&remote, &in_flight.operations, Affinity::Backward);
            OperationBatch::new(in_flight.document_revision, rebased)
        });

        let buffered = rebase(&self.buffered, &remote, Affinity::Forward);
        remote = rebase(&remote, &self.buffered, Affinity::Backward);

        self.document.apply_all(&remote)?;
        self.document.revision = applied.document_revision;
        self.in_flight = in_flight;
        self.buffered = buffered;

        tracing::trace!(
            session = %self.id,
            revision = applied.document_revision,
            remote = remote.len(),
            pending = self.pending_count(),
            "received remote batch"
        );
        Ok(())
    }

    /// Drop all pending state and restart from a fresh server snapshot.
    pub fn reset(&mut self, snapshot: Snapshot) {
        self.document = Document::from(snapshot);
        self.in_flight = None;
        self.buffered.clear();
    }

    /// Number of edits not yet acknowledged by the server
    pub fn pending_count(&self) -> usize {
        self.in_flight.as_ref().map_or(0, OperationBatch::len) + self.buffered.len()
    }
}

fn rebase(operations: &[Operation], against: &[Operation], affinity: Affinity) -> Vec<Operation> {
    operations
        .iter()
        .filter_map(|operation| transform_through(operation, against, affinity))
        .collect()
}
