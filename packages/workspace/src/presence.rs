//! Connected users of one document and their selections.
//!
//! Selections are kept in document coordinates, so every applied batch
//! moves them through the same point transform the engine uses.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use coedit_editor::{transform_point, Affinity, Operation, Point};
use serde::{Deserialize, Serialize};

/// Selection between two points; `anchor == focus` is a caret
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub anchor: Point,
    pub focus: Point,
}

impl Range {
    pub fn caret(point: Point) -> Self {
        Self {
            anchor: point.clone(),
            focus: point,
        }
    }

    /// Move both ends past `operations`; `None` once either end is deleted.
    pub fn transform(&self, operations: &[Operation]) -> Option<Range> {
        Some(Range {
            anchor: transform_all(&self.anchor, operations)?,
            focus: transform_all(&self.focus, operations)?,
        })
    }
}

fn transform_all(point: &Point, operations: &[Operation]) -> Option<Point> {
    operations
        .iter()
        .try_fold(point.clone(), |current, operation| {
            transform_point(&current, operation, Affinity::Forward)
        })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserContext {
    pub user_id: String,

    #[serde(default)]
    pub user_name: String,

    #[serde(default)]
    pub document_selection: Option<Range>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connected_at: Option<DateTime<Utc>>,
}

impl UserContext {
    pub fn new(user_id: impl Into<String>, user_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            user_name: user_name.into(),
            document_selection: None,
            connected_at: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct Presence {
    users: BTreeMap<String, UserContext>,
}

impl Presence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user, replacing any earlier entry with the same id.
    pub fn join(&mut self, mut user: UserContext) -> UserContext {
        user.connected_at.get_or_insert_with(Utc::now);
        self.users.insert(user.user_id.clone(), user.clone());
        user
    }

    pub fn leave(&mut self, user_id: &str) -> Option<UserContext> {
        self.users.remove(user_id)
    }

    /// Returns the updated user, or `None` if the id is unknown.
    pub fn update_selection(&mut self, user_id: &str, selection: Option<Range>) -> Option<UserContext> {
        let user = self.users.get_mut(user_id)?;
        user.document_selection = selection;
        Some(user.clone())
    }

    /// Carry every stored selection past an applied batch.
    pub fn transform(&mut self, operations: &[Operation]) {
        if operations.is_empty() {
            return;
        }
        for user in self.users.values_mut() {
            if let Some(range) = &user.document_selection {
                user.document_selection = range.transform(operations);
            }
        }
    }

    pub fn get(&self, user_id: &str) -> Option<&UserContext> {
        self.users.get(user_id)
    }

    /// Every user except `viewer`, ordered by id
    pub fn others(&self, viewer: Option<&str>) -> Vec<UserContext> {
        self.users
            .values()
            .filter(|user| Some(user.user_id.as_str()) != viewer)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
