//! # Path Algebra
//!
//! A path is a sequence of child indices starting at the document root's
//! top-level children. `[]` names the root itself, `[i]` a top-level node,
//! `[i, j]` the `j`th child of that node and so on.
//!
//! Paths are snapshots: they are only meaningful against the tree state
//! they were produced for. Everything here is pure.

use std::cmp::Ordering;

use crate::errors::{OtError, OtResult};

pub type Path = Vec<usize>;

/// Lexicographic comparison over the shared-length prefix.
///
/// An ancestor compares equal to its descendants.
pub fn compare(a: &[usize], b: &[usize]) -> Ordering {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| x.cmp(y))
        .find(|ord| ord.is_ne())
        .unwrap_or(Ordering::Equal)
}

pub fn equals(a: &[usize], b: &[usize]) -> bool {
    a == b
}

/// `a` strictly contains `b`.
pub fn is_ancestor(a: &[usize], b: &[usize]) -> bool {
    a.len() < b.len() && compare(a, b) == Ordering::Equal
}

/// Same parent, different position.
pub fn is_sibling(a: &[usize], b: &[usize]) -> bool {
    match (a.split_last(), b.split_last()) {
        (Some((a_last, a_parent)), Some((b_last, b_parent))) => {
            a.len() == b.len() && a_last != b_last && a_parent == b_parent
        }
        _ => false,
    }
}

/// `a` sits before `b` (or before an ancestor of `b`) among the same
/// siblings.
pub fn ends_before(a: &[usize], b: &[usize]) -> bool {
    let Some((&a_last, a_parent)) = a.split_last() else {
        return false;
    };
    if b.len() < a.len() {
        return false;
    }
    let depth = a.len() - 1;
    a_parent == &b[..depth] && a_last < b[depth]
}

/// Path of the immediately preceding sibling.
pub fn previous(path: &[usize]) -> OtResult<Path> {
    match path.split_last() {
        Some((&last, parent)) if last > 0 => {
            let mut prev = parent.to_vec();
            prev.push(last - 1);
            Ok(prev)
        }
        _ => Err(OtError::NoPreviousSibling {
            path: path.to_vec(),
        }),
    }
}

/// Path of the containing node; the root for top-level paths.
pub fn parent(path: &[usize]) -> &[usize] {
    match path.split_last() {
        Some((_, parent)) => parent,
        None => path,
    }
}

pub(crate) fn increment_at(path: &mut [usize], depth: usize, by: usize) {
    if let Some(index) = path.get_mut(depth) {
        *index += by;
    }
}

pub(crate) fn decrement_at(path: &mut [usize], depth: usize, by: usize) {
    if let Some(index) = path.get_mut(depth) {
        *index = index.saturating_sub(by);
    }
}
