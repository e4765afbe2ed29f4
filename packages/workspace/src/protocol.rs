//! Wire types exchanged with clients.

use coedit_editor::{Node, OperationBatch};
use serde::{Deserialize, Serialize};

use crate::presence::{Range, UserContext};

/// `{revision, content, users}` served on connect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotResponse {
    pub revision: u64,
    pub content: Vec<Node>,
    pub users: Vec<UserContext>,
}

/// Reply to the submitting client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Acknowledgement {
    /// Revision produced by the submitted batch
    pub revision: u64,

    /// Operations dropped because their targets were deleted concurrently
    pub dropped: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionUpdate {
    #[serde(default)]
    pub document_selection: Option<Range>,
}

/// Sent as the last event of a stream whose subscriber fell behind; the
/// client must re-fetch a snapshot before applying anything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResyncNotice {
    /// Events the subscriber never received
    pub skipped: u64,
}

/// Broadcast to everyone subscribed to a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum SessionEvent {
    /// An applied batch stamped with the revision it produced
    #[serde(rename_all = "camelCase")]
    Operations {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        origin: Option<String>,
        batch: OperationBatch,
    },

    UserConnected { user: UserContext },

    UserUpdated { user: UserContext },

    #[serde(rename_all = "camelCase")]
    UserDisconnected { user_id: String },
}

impl SessionEvent {
    /// SSE event name
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::Operations { .. } => "operations",
            SessionEvent::UserConnected { .. } => "userConnected",
            SessionEvent::UserUpdated { .. } => "userUpdated",
            SessionEvent::UserDisconnected { .. } => "userDisconnected",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coedit_editor::Operation;
    use serde_json::json;

    #[test]
    fn test_operations_event_shape() {
        let event = SessionEvent::Operations {
            origin: Some("u1".into()),
            batch: OperationBatch::new(
                4,
                vec![Operation::RemoveNode {
                    path: vec![0],
                    node: None,
                }],
            ),
        };

        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "event": "operations",
                "origin": "u1",
                "batch": {
                    "documentRevision": 4,
                    "operations": [{ "type": "remove_node", "path": [0] }]
                }
            })
        );
        assert_eq!(event.name(), "operations");
    }

    #[test]
    fn test_disconnect_event_shape() {
        let event = SessionEvent::UserDisconnected {
            user_id: "u2".into(),
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({ "event": "userDisconnected", "userId": "u2" })
        );
    }
}
