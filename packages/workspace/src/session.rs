//! One collaborative document: its tree, revision log and presence,
//! guarded by a single lock so submissions are serialized.

use coedit_editor::{commit, Document, OperationBatch, RevisionLog};
use serde_json::Value;
use tokio::sync::{broadcast, Mutex, MutexGuard};

use crate::error::{WorkspaceError, WorkspaceResult};
use crate::presence::{Presence, Range, UserContext};
use crate::protocol::{Acknowledgement, SessionEvent, SnapshotResponse};

/// Everything the reconciliation loop reads and writes
#[derive(Debug)]
pub struct SessionState {
    pub document: Document,
    pub log: RevisionLog,
    pub presence: Presence,
}

pub struct DocumentSession {
    key: String,
    state: Mutex<SessionState>,
    events: broadcast::Sender<SessionEvent>,
}

impl DocumentSession {
    pub fn new(key: impl Into<String>, document: Document, history_limit: usize, broadcast_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(broadcast_capacity.max(1));
        Self {
            key: key.into(),
            state: Mutex::new(SessionState {
                document,
                log: RevisionLog::with_retention(history_limit),
                presence: Presence::new(),
            }),
            events,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Exclusive access for callers that need to inspect several parts at
    /// once.
    pub async fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().await
    }

    pub async fn revision(&self) -> u64 {
        self.state.lock().await.document.revision
    }

    /// Current content plus everyone connected except `viewer`.
    pub async fn snapshot(&self, viewer: Option<&str>) -> SnapshotResponse {
        let state = self.state.lock().await;
        let snapshot = state.document.snapshot();
        SnapshotResponse {
            revision: snapshot.revision,
            content: snapshot.content,
            users: state.presence.others(viewer),
        }
    }

    /// Decode an inbound `{documentRevision, operations, userId?}` record
    /// and submit it.
    pub async fn submit(&self, inbound: Value) -> WorkspaceResult<Acknowledgement> {
        let origin = inbound.get("userId").and_then(Value::as_str).map(str::to_string);
        let batch = OperationBatch::decode(inbound)?;
        self.submit_batch(batch, origin).await
    }

    /// Reconcile, apply and record a batch, then broadcast what was
    /// actually applied.
    pub async fn submit_batch(&self, batch: OperationBatch, origin: Option<String>) -> WorkspaceResult<Acknowledgement> {
        let mut state = self.state.lock().await;
        let SessionState {
            document,
            log,
            presence,
        } = &mut *state;

        let submitted_revision = batch.document_revision;
        let submitted_len = batch.len();

        let applied = commit(document, batch, log).map_err(|e| {
            tracing::warn!(
                document = %self.key,
                origin = origin.as_deref().unwrap_or("-"),
                submitted_revision,
                revision = document.revision,
                error = %e,
                "rejected batch"
            );
            WorkspaceError::from(e)
        })?;

        presence.transform(&applied.operations);

        let revision = document.revision;
        let dropped = submitted_len - applied.len();
        tracing::info!(
            document = %self.key,
            origin = origin.as_deref().unwrap_or("-"),
            submitted_revision,
            revision,
            operations = applied.len(),
            dropped,
            "accepted batch"
        );

        // sent under the lock so subscribers see revisions in order
        self.publish(SessionEvent::Operations {
            origin,
            batch: OperationBatch::new(revision, applied.operations),
        });

        Ok(Acknowledgement { revision, dropped })
    }

    /// Register a user and return the snapshot they should start from.
    pub async fn join(&self, user: UserContext) -> SnapshotResponse {
        let mut state = self.state.lock().await;
        let user = state.presence.join(user);
        tracing::info!(document = %self.key, user = %user.user_id, "user connected");

        let snapshot = state.document.snapshot();
        let response = SnapshotResponse {
            revision: snapshot.revision,
            content: snapshot.content,
            users: state.presence.others(Some(&user.user_id)),
        };
        self.publish(SessionEvent::UserConnected { user });
        response
    }

    pub async fn leave(&self, user_id: &str) -> WorkspaceResult<()> {
        let mut state = self.state.lock().await;
        state.presence.leave(user_id).ok_or_else(|| self.unknown_user(user_id))?;

        tracing::info!(document = %self.key, user = %user_id, "user disconnected");
        self.publish(SessionEvent::UserDisconnected {
            user_id: user_id.to_string(),
        });
        Ok(())
    }

    pub async fn update_selection(&self, user_id: &str, selection: Option<Range>) -> WorkspaceResult<UserContext> {
        let mut state = self.state.lock().await;
        let user = state
            .presence
            .update_selection(user_id, selection)
            .ok_or_else(|| self.unknown_user(user_id))?;

        self.publish(SessionEvent::UserUpdated { user: user.clone() });
        Ok(user)
    }

    fn publish(&self, event: SessionEvent) {
        // no subscribers is not an error
        if self.events.send(event).is_err() {
            tracing::trace!(document = %self.key, "no subscribers");
        }
    }

    fn unknown_user(&self, user_id: &str) -> WorkspaceError {
        WorkspaceError::UnknownUser {
            user_id: user_id.to_string(),
            document: self.key.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coedit_editor::{OtError, Point};
    use serde_json::json;

    fn session() -> DocumentSession {
        let document = Document::from_content(json!([{ "text": "ab" }])).unwrap();
        DocumentSession::new("doc", document, 0, 16)
    }

    fn typing(revision: u64, offset: usize, text: &str) -> Value {
        json!({
            "documentRevision": revision,
            "operations": [{ "type": "insert_text", "path": [0], "offset": offset, "text": text }]
        })
    }

    #[tokio::test]
    async fn test_submit_acknowledges_and_broadcasts() {
        let session = session();
        let mut events = session.subscribe();

        let mut inbound = typing(0, 1, "X");
        inbound["userId"] = json!("u1");
        let ack = session.submit(inbound).await.unwrap();
        assert_eq!(ack, Acknowledgement { revision: 1, dropped: 0 });

        match events.recv().await.unwrap() {
            SessionEvent::Operations { origin, batch } => {
                assert_eq!(origin.as_deref(), Some("u1"));
                assert_eq!(batch.document_revision, 1);
                assert_eq!(batch.len(), 1);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stale_submit_is_transformed() {
        let session = session();
        session.submit(typing(0, 0, "1")).await.unwrap();
        let ack = session.submit(typing(0, 2, "2")).await.unwrap();

        assert_eq!(ack.revision, 2);
        let snapshot = session.snapshot(None).await;
        assert_eq!(snapshot.content[0].text_content(), Some("1ab2"));
    }

    #[tokio::test]
    async fn test_rejected_submit_changes_nothing() {
        let session = session();
        let result = session
            .submit(json!({ "documentRevision": 0, "operations": [{ "type": "bogus", "path": [0] }] }))
            .await;
        assert!(matches!(
            result,
            Err(WorkspaceError::Ot(OtError::UnsupportedOperationType(_)))
        ));

        let result = session.submit(typing(5, 0, "x")).await;
        assert!(result.as_ref().is_err_and(WorkspaceError::requires_resync));
        assert_eq!(session.revision().await, 0);
        assert!(session.lock().await.log.is_empty());
    }

    #[tokio::test]
    async fn test_presence_lifecycle() {
        let session = session();
        session.join(UserContext::new("u1", "Ada")).await;
        let snapshot = session.join(UserContext::new("u2", "Bo")).await;
        assert_eq!(snapshot.users.len(), 1);
        assert_eq!(snapshot.users[0].user_id, "u1");

        let caret = Range::caret(Point::new(vec![0], 2));
        session.update_selection("u1", Some(caret)).await.unwrap();
        session.submit(typing(0, 0, "zz")).await.unwrap();

        let snapshot = session.snapshot(Some("u2")).await;
        assert_eq!(
            snapshot.users[0].document_selection,
            Some(Range::caret(Point::new(vec![0], 4)))
        );

        session.leave("u1").await.unwrap();
        assert!(matches!(
            session.leave("u1").await,
            Err(WorkspaceError::UnknownUser { .. })
        ));
    }
}
