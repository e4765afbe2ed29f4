//! # Operation Transformer
//!
//! Rewrites paths, points and whole operations so they stay valid after a
//! different, concurrently issued operation has already been applied.
//!
//! All functions are pure: they return new values and never mutate their
//! inputs. `None` means the addressed node no longer exists, which callers
//! treat as "drop this operation" rather than as an error.
//!
//! ## Affinity
//!
//! When a point sits exactly where a concurrent insertion or split
//! happened, [`Affinity`] decides which side it binds to. The committed
//! default is [`Affinity::Forward`]: coincident insertions push the point
//! forward and a split at the point moves it into the right-hand node.

use serde::{Deserialize, Serialize};

use crate::errors::{OtError, OtResult};
use crate::operation::{Operation, OperationBatch};
use crate::path::{decrement_at, ends_before, increment_at, is_ancestor, is_sibling, Path};

/// Tie-break direction for coincident positions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Affinity {
    #[default]
    Forward,
    Backward,
}

impl Affinity {
    fn is_forward(self) -> bool {
        self == Affinity::Forward
    }
}

/// A location inside a node: path plus character offset (or child index
/// for element positions)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub path: Path,
    pub offset: usize,
}

impl Point {
    pub fn new(path: Path, offset: usize) -> Self {
        Self { path, offset }
    }
}

/// Rewrite `path` to account for `against` having been applied.
///
/// Every condition is evaluated on the original `path`.
pub fn transform_path(path: &[usize], against: &Operation, affinity: Affinity) -> Option<Path> {
    let mut p = path.to_vec();
    if path.is_empty() {
        return Some(p);
    }

    match against {
        Operation::InsertNode { path: op, .. } => {
            let Some(depth) = last_depth(op) else {
                return Some(p);
            };
            if op == path || ends_before(op, path) || is_ancestor(op, path) {
                increment_at(&mut p, depth, 1);
            }
        }

        Operation::RemoveNode { path: op, .. } => {
            let Some(depth) = last_depth(op) else {
                return Some(p);
            };
            if op == path || is_ancestor(op, path) {
                return None;
            }
            if ends_before(op, path) {
                decrement_at(&mut p, depth, 1);
            }
        }

        Operation::MergeNode { path: op, position, .. } => {
            let Some(depth) = last_depth(op) else {
                return Some(p);
            };
            if op == path || ends_before(op, path) {
                decrement_at(&mut p, depth, 1);
            } else if is_ancestor(op, path) {
                decrement_at(&mut p, depth, 1);
                increment_at(&mut p, op.len(), *position);
            }
        }

        Operation::SplitNode { path: op, position, .. } => {
            let Some(depth) = last_depth(op) else {
                return Some(p);
            };
            if op == path {
                if affinity.is_forward() {
                    increment_at(&mut p, depth, 1);
                }
            } else if ends_before(op, path) {
                increment_at(&mut p, depth, 1);
            } else if is_ancestor(op, path) && path[op.len()] >= *position {
                increment_at(&mut p, depth, 1);
                decrement_at(&mut p, op.len(), *position);
            }
        }

        Operation::MoveNode { path: op, new_path: onp } => {
            let (Some(depth), Some(new_depth)) = (last_depth(op), last_depth(onp)) else {
                return Some(p);
            };
            if op == onp {
                return Some(p);
            }

            if is_ancestor(op, path) || op == path {
                // the node (or one of its ancestors) was moved: reparent
                let mut moved = onp.clone();
                if ends_before(op, onp) && op.len() < onp.len() {
                    decrement_at(&mut moved, depth, 1);
                }
                moved.extend_from_slice(&path[op.len()..]);
                return Some(moved);
            }

            if is_sibling(op, onp) && (is_ancestor(onp, path) || onp == path) {
                if ends_before(op, path) {
                    decrement_at(&mut p, depth, 1);
                } else {
                    increment_at(&mut p, depth, 1);
                }
            } else if ends_before(onp, path) || onp == path || is_ancestor(onp, path) {
                if ends_before(op, path) {
                    decrement_at(&mut p, depth, 1);
                }
                increment_at(&mut p, new_depth, 1);
            } else if ends_before(op, path) {
                if onp == path {
                    increment_at(&mut p, new_depth, 1);
                }
                decrement_at(&mut p, depth, 1);
            }
        }

        Operation::InsertText { .. } | Operation::RemoveText { .. } | Operation::SetNode { .. } => {}
    }

    Some(p)
}

/// Rewrite a point, adjusting the offset for edits inside the same node.
pub fn transform_point(point: &Point, against: &Operation, affinity: Affinity) -> Option<Point> {
    let path = &point.path;
    let mut offset = point.offset;

    let path = match against {
        Operation::InsertNode { .. } | Operation::MoveNode { .. } => {
            transform_path(path, against, affinity)?
        }

        Operation::InsertText {
            path: op,
            offset: at,
            text,
        } => {
            if op == path && (*at < offset || (*at == offset && affinity.is_forward())) {
                offset += text.chars().count();
            }
            path.clone()
        }

        Operation::RemoveText {
            path: op,
            offset: at,
            text,
        } => {
            if op == path && *at <= offset {
                offset -= (offset - at).min(text.chars().count());
            }
            path.clone()
        }

        Operation::MergeNode { path: op, position, .. } => {
            if op == path {
                offset += position;
            }
            transform_path(path, against, affinity)?
        }

        Operation::SplitNode { path: op, position, .. } => {
            if op == path {
                if *position < offset || (*position == offset && affinity.is_forward()) {
                    offset -= position;
                    // the point now lives in the right-hand node
                    transform_path(path, against, Affinity::Forward)?
                } else {
                    path.clone()
                }
            } else {
                transform_path(path, against, affinity)?
            }
        }

        Operation::RemoveNode { path: op, .. } => {
            if op == path || is_ancestor(op, path) {
                return None;
            }
            transform_path(path, against, affinity)?
        }

        Operation::SetNode { .. } => path.clone(),
    };

    Some(Point { path, offset })
}

/// Transform `operation` against `against` with the default affinity.
pub fn transform(operation: &Operation, against: &Operation) -> Option<Operation> {
    transform_with(operation, against, Affinity::default())
}

/// Transform `operation` against `against`; `None` drops the operation.
pub fn transform_with(operation: &Operation, against: &Operation, affinity: Affinity) -> Option<Operation> {
    let mut result = operation.clone();

    match &mut result {
        Operation::InsertText { path, offset, .. } | Operation::RemoveText { path, offset, .. } => {
            let point = transform_point(&Point::new(path.clone(), *offset), against, affinity)?;
            *path = point.path;
            *offset = point.offset;
        }
        Operation::SplitNode { path, position, .. } | Operation::MergeNode { path, position, .. } => {
            let point = transform_point(&Point::new(path.clone(), *position), against, affinity)?;
            *path = point.path;
            *position = point.offset;
        }
        Operation::InsertNode { path, .. }
        | Operation::RemoveNode { path, .. }
        | Operation::SetNode { path, .. } => {
            *path = transform_path(path, against, affinity)?;
        }
        Operation::MoveNode { path, new_path } => {
            let moved_path = transform_path(path, against, affinity)?;
            let moved_new_path = transform_path(new_path, against, affinity)?;
            *path = moved_path;
            *new_path = moved_new_path;
        }
    }

    Some(result)
}

/// Transform `operation` through every operation of `against`, in order.
pub fn transform_through(operation: &Operation, against: &[Operation], affinity: Affinity) -> Option<Operation> {
    against
        .iter()
        .try_fold(operation.clone(), |current, other| transform_with(&current, other, affinity))
}

/// Transform a whole batch against a batch that was applied first.
///
/// Operations that no longer address anything are dropped. The result is
/// stamped with the revision that follows `against`.
pub fn transform_batch(batch: &OperationBatch, against: &OperationBatch) -> OtResult<OperationBatch> {
    transform_batch_with(batch, against, Affinity::default())
}

pub fn transform_batch_with(
    batch: &OperationBatch,
    against: &OperationBatch,
    affinity: Affinity,
) -> OtResult<OperationBatch> {
    if against.document_revision < batch.document_revision {
        return Err(OtError::StaleTransform {
            batch: batch.document_revision,
            against: against.document_revision,
        });
    }

    let operations: Vec<Operation> = batch
        .operations
        .iter()
        .filter_map(|operation| transform_through(operation, &against.operations, affinity))
        .collect();

    tracing::debug!(
        batch = batch.document_revision,
        against = against.document_revision,
        kept = operations.len(),
        dropped = batch.len() - operations.len(),
        "transformed batch"
    );

    Ok(OperationBatch::new(against.document_revision + 1, operations))
}

fn last_depth(op: &[usize]) -> Option<usize> {
    op.len().checked_sub(1)
}
