//! # Revision Log
//!
//! Append-only history of applied batches. Each entry keeps the revision
//! it was applied at, so the entry that produced revision `r` is stamped
//! `r - 1`. Stale batches are fast-forwarded by folding over the entries
//! at or after their own revision.
//!
//! An optional retention limit drops the oldest entries (0 = unlimited).

use std::collections::VecDeque;

use crate::errors::{OtError, OtResult};
use crate::operation::OperationBatch;

#[derive(Debug, Clone, Default)]
pub struct RevisionLog {
    /// Applied batches, oldest first
    entries: VecDeque<OperationBatch>,

    /// Maximum number of retained entries (0 = unlimited)
    retention: usize,
}

impl RevisionLog {
    pub fn new() -> Self {
        Self::with_retention(0)
    }

    pub fn with_retention(retention: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            retention,
        }
    }

    /// Record a batch that was just applied at `batch.document_revision`.
    ///
    /// Entries must be contiguous: each one follows the latest by exactly
    /// one revision.
    pub fn append(&mut self, batch: OperationBatch) -> OtResult<()> {
        if let Some(latest) = self.latest_revision() {
            if batch.document_revision != latest + 1 {
                return Err(OtError::RevisionOutOfOrder {
                    revision: batch.document_revision,
                    latest,
                });
            }
        }

        self.entries.push_back(batch);

        if self.retention > 0 {
            while self.entries.len() > self.retention {
                if let Some(dropped) = self.entries.pop_front() {
                    tracing::trace!(revision = dropped.document_revision, "evicted revision");
                }
            }
        }
        Ok(())
    }

    /// Entries applied at or after `revision`, ascending
    pub fn since(&self, revision: u64) -> impl Iterator<Item = &OperationBatch> {
        self.entries
            .iter()
            .skip_while(move |entry| entry.document_revision < revision)
    }

    /// Applied-at revision of the oldest retained entry
    pub fn oldest_revision(&self) -> Option<u64> {
        self.entries.front().map(|entry| entry.document_revision)
    }

    pub fn latest_revision(&self) -> Option<u64> {
        self.entries.back().map(|entry| entry.document_revision)
    }

    pub fn entries(&self) -> impl Iterator<Item = &OperationBatch> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn retention(&self) -> usize {
        self.retention
    }
}
