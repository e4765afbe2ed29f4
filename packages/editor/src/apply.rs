//! # Operation Applier
//!
//! Mutates a tree in place for one [`Operation`]. Callers that need
//! all-or-nothing batches go through [`Document::apply_all`], which runs
//! against a scratch copy of the root.
//!
//! Text offsets and split positions on leaves count characters, not bytes.
//!
//! [`Document::apply_all`]: crate::Document::apply_all

use crate::document::{resolve_mut, sibling_list_mut};
use crate::errors::{ApplyFailure, OtError, OtResult};
use crate::node::{is_reserved, Attributes, Node};
use crate::operation::Operation;
use crate::path;
use crate::transform::{transform_path, Affinity};

impl Operation {
    /// Apply this operation to the tree rooted at `root`.
    ///
    /// On error the tree may be partially modified; use
    /// [`Document::apply_all`](crate::Document::apply_all) for atomicity.
    pub fn apply(&self, root: &mut Node) -> OtResult<()> {
        tracing::trace!(operation = %self, "apply");

        match self {
            Operation::InsertNode { path, node } => Self::apply_insert_node(root, path, node),
            Operation::InsertText { path, offset, text } => {
                Self::apply_insert_text(root, path, *offset, text)
            }
            Operation::RemoveText { path, offset, text } => {
                Self::apply_remove_text(root, path, *offset, text)
            }
            Operation::RemoveNode { path, .. } => Self::apply_remove_node(root, path),
            Operation::SetNode {
                path,
                properties,
                new_properties,
            } => Self::apply_set_node(root, path, properties, new_properties),
            Operation::SplitNode {
                path,
                position,
                properties,
            } => Self::apply_split(root, path, *position, properties),
            Operation::MergeNode { path, .. } => Self::apply_merge(root, path),
            Operation::MoveNode { .. } => self.apply_move(root),
        }
    }

    fn apply_insert_node(root: &mut Node, path: &[usize], node: &Node) -> OtResult<()> {
        let index = target_index(path)?;
        let siblings = sibling_list_mut(root, path)?;

        if index > siblings.len() {
            return Err(out_of_range("insert_node", index, siblings.len()));
        }
        siblings.insert(index, node.clone());
        Ok(())
    }

    fn apply_insert_text(root: &mut Node, path: &[usize], offset: usize, inserted: &str) -> OtResult<()> {
        let text = text_mut(root, path, "insert_text")?;
        let at = byte_offset(text, offset)
            .ok_or_else(|| out_of_range("insert_text", offset, text.chars().count()))?;

        text.insert_str(at, inserted);
        Ok(())
    }

    fn apply_remove_text(root: &mut Node, path: &[usize], offset: usize, removed: &str) -> OtResult<()> {
        if removed.is_empty() {
            return Ok(());
        }

        let text = text_mut(root, path, "remove_text")?;
        let len = text.chars().count();
        let start = byte_offset(text, offset).ok_or_else(|| out_of_range("remove_text", offset, len))?;
        let count = (len - offset).min(removed.chars().count());
        let end = byte_offset(text, offset + count).unwrap_or(text.len());

        text.replace_range(start..end, "");
        Ok(())
    }

    fn apply_remove_node(root: &mut Node, path: &[usize]) -> OtResult<()> {
        let index = target_index(path)?;
        let siblings = sibling_list_mut(root, path)?;

        if index >= siblings.len() {
            return Err(OtError::not_found(path));
        }
        siblings.remove(index);
        Ok(())
    }

    fn apply_set_node(
        root: &mut Node,
        path: &[usize],
        properties: &Attributes,
        new_properties: &Attributes,
    ) -> OtResult<()> {
        if path.is_empty() {
            return Err(OtError::apply("set_node", ApplyFailure::CannotSetRoot));
        }
        if let Some(key) = new_properties.keys().find(|key| is_reserved(key)) {
            return Err(OtError::apply(
                "set_node",
                ApplyFailure::ReservedPropertyName(key.clone()),
            ));
        }

        let attributes = resolve_mut(root, path)?.attributes_mut();
        for (key, value) in new_properties {
            // null clears the attribute
            if value.is_null() {
                attributes.remove(key);
            } else {
                attributes.insert(key.clone(), value.clone());
            }
        }
        for key in properties.keys() {
            if !new_properties.contains_key(key) {
                attributes.remove(key);
            }
        }
        Ok(())
    }

    fn apply_split(root: &mut Node, path: &[usize], position: usize, properties: &Attributes) -> OtResult<()> {
        // the root has no parent to receive the right-hand half
        if path.is_empty() {
            return Err(OtError::apply("split_node", ApplyFailure::UnsplittableNode));
        }

        let index = target_index(path)?;
        let siblings = sibling_list_mut(root, path)?;
        let node = siblings.get_mut(index).ok_or_else(|| OtError::not_found(path))?;

        let attributes: Attributes = properties
            .iter()
            .filter(|(key, _)| !is_reserved(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let sibling = match node {
            Node::Text { text, .. } => {
                let at = byte_offset(text, position)
                    .ok_or_else(|| out_of_range("split_node", position, text.chars().count()))?;
                Node::Text {
                    text: text.split_off(at),
                    attributes,
                }
            }
            Node::Element { children, .. } => {
                if position > children.len() {
                    return Err(out_of_range("split_node", position, children.len()));
                }
                Node::Element {
                    children: children.split_off(position),
                    attributes,
                }
            }
        };

        siblings.insert(index + 1, sibling);
        Ok(())
    }

    fn apply_merge(root: &mut Node, path: &[usize]) -> OtResult<()> {
        let prev_index = *path::previous(path)?.last().unwrap_or(&0);
        let index = prev_index + 1;
        let siblings = sibling_list_mut(root, path)?;

        match (siblings.get(prev_index), siblings.get(index)) {
            (Some(prev), Some(node)) if prev.is_text() != node.is_text() => {
                return Err(OtError::apply("merge_node", ApplyFailure::IncompatibleMerge));
            }
            (Some(_), Some(_)) => {}
            _ => return Err(OtError::not_found(path)),
        }

        let node = siblings.remove(index);
        match (&mut siblings[prev_index], node) {
            (Node::Text { text: prev, .. }, Node::Text { text, .. }) => prev.push_str(&text),
            (Node::Element { children: prev, .. }, Node::Element { children, .. }) => {
                prev.extend(children)
            }
            _ => return Err(OtError::apply("merge_node", ApplyFailure::IncompatibleMerge)),
        }
        Ok(())
    }

    fn apply_move(&self, root: &mut Node) -> OtResult<()> {
        let Operation::MoveNode { path, new_path } = self else {
            return Ok(());
        };
        target_index(new_path)?;
        if path::is_ancestor(path, new_path) {
            return Err(OtError::apply("move_node", ApplyFailure::CyclicMove));
        }

        let index = target_index(path)?;
        let siblings = sibling_list_mut(root, path)?;
        if index >= siblings.len() {
            return Err(OtError::not_found(path));
        }
        let node = siblings.remove(index);

        // removing the source shifts indices along the destination
        let destination =
            transform_path(path, self, Affinity::Forward).ok_or_else(|| OtError::not_found(new_path))?;
        let new_index = target_index(&destination)?;
        let siblings = sibling_list_mut(root, &destination)?;

        if new_index > siblings.len() {
            return Err(out_of_range("move_node", new_index, siblings.len()));
        }
        siblings.insert(new_index, node);
        Ok(())
    }
}

/// Last index of a node-targeting path; the root is never a target.
fn target_index(path: &[usize]) -> OtResult<usize> {
    path.last().copied().ok_or_else(|| OtError::not_found(path))
}

fn text_mut<'a>(root: &'a mut Node, path: &[usize], variant: &'static str) -> OtResult<&'a mut String> {
    match resolve_mut(root, path)? {
        Node::Text { text, .. } => Ok(text),
        Node::Element { .. } => Err(OtError::apply(variant, ApplyFailure::NotText)),
    }
}

fn out_of_range(variant: &'static str, index: usize, len: usize) -> OtError {
    OtError::apply(variant, ApplyFailure::IndexOutOfRange { index, len })
}

/// Byte index of the `offset`th character; `offset == len` maps to the end.
fn byte_offset(text: &str, offset: usize) -> Option<usize> {
    text.char_indices()
        .map(|(at, _)| at)
        .chain(std::iter::once(text.len()))
        .nth(offset)
}
