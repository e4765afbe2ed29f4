//! Lazily created document sessions, one per key.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use coedit_editor::Document;

use crate::config::{default_seed, ServerConfig};
use crate::error::WorkspaceResult;
use crate::session::DocumentSession;

/// Manager for all document sessions.
pub struct DocumentRegistry {
    sessions: RwLock<HashMap<String, Arc<DocumentSession>>>,
    seed: Document,
    history_limit: usize,
    broadcast_capacity: usize,
}

impl DocumentRegistry {
    pub fn new(seed: Document, history_limit: usize, broadcast_capacity: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            seed,
            history_limit,
            broadcast_capacity,
        }
    }

    pub fn from_config(config: &ServerConfig) -> WorkspaceResult<Self> {
        Ok(Self::new(
            config.seed_document()?,
            config.history_limit,
            config.broadcast_capacity,
        ))
    }

    /// Get or create the session for `key`.
    ///
    /// The session owns both the document and its revision log, so every
    /// caller asking for either gets the same shared instance.
    pub fn get_or_create_session(&self, key: &str) -> Arc<DocumentSession> {
        // Try read lock first
        if let Some(session) = self.get_session(key) {
            return session;
        }

        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);

        // Double-check (another thread may have created it)
        if let Some(session) = sessions.get(key) {
            return session.clone();
        }

        tracing::info!(document = %key, "created document session");
        let session = Arc::new(DocumentSession::new(
            key,
            self.seed.clone(),
            self.history_limit,
            self.broadcast_capacity,
        ));
        sessions.insert(key.to_string(), session.clone());
        session
    }

    /// Get session if it exists.
    pub fn get_session(&self, key: &str) -> Option<Arc<DocumentSession>> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        sessions.get(key).cloned()
    }

    pub fn remove_session(&self, key: &str) -> bool {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions.remove(key).is_some()
    }

    pub fn keys(&self) -> Vec<String> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        let mut keys: Vec<String> = sessions.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl Default for DocumentRegistry {
    fn default() -> Self {
        let config = ServerConfig::default();
        Self::new(default_seed(), config.history_limit, config.broadcast_capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_or_create_is_idempotent() {
        let registry = DocumentRegistry::default();

        let first = registry.get_or_create_session("notes");
        let second = registry.get_or_create_session("notes");
        let other = registry.get_or_create_session("todo");

        assert!(Arc::ptr_eq(&first, &second));
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(registry.keys(), vec!["notes", "todo"]);
    }

    #[test]
    fn test_remove_session() {
        let registry = DocumentRegistry::default();
        registry.get_or_create_session("notes");

        assert!(registry.remove_session("notes"));
        assert!(!registry.remove_session("notes"));
        assert!(registry.get_session("notes").is_none());
    }

    #[tokio::test]
    async fn test_sessions_start_from_seed() {
        let seed = Document::from_content(json!([{ "text": "seed" }])).unwrap();
        let registry = DocumentRegistry::new(seed, 10, 8);

        let session = registry.get_or_create_session("a");
        session
            .submit(json!({
                "documentRevision": 0,
                "operations": [{ "type": "insert_text", "path": [0], "offset": 4, "text": "!" }]
            }))
            .await
            .unwrap();

        let fresh = registry.get_or_create_session("b").snapshot(None).await;
        assert_eq!(fresh.revision, 0);
        assert_eq!(fresh.content[0].text_content(), Some("seed"));
        assert_eq!(session.lock().await.log.retention(), 10);
    }

    #[tokio::test]
    async fn test_concurrent_submissions_are_serialized() {
        let registry = Arc::new(DocumentRegistry::new(
            Document::from_content(json!([{ "text": "" }])).unwrap(),
            0,
            64,
        ));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                tokio::spawn(async move {
                    registry
                        .get_or_create_session("shared")
                        .submit(json!({
                            "documentRevision": 0,
                            "operations": [{ "type": "insert_text", "path": [0], "offset": 0, "text": "x" }]
                        }))
                        .await
                })
            })
            .collect();

        let mut revisions = Vec::new();
        for task in tasks {
            revisions.push(task.await.unwrap().unwrap().revision);
        }
        revisions.sort();
        assert_eq!(revisions, (1..=8).collect::<Vec<u64>>());

        let snapshot = registry.get_or_create_session("shared").snapshot(None).await;
        assert_eq!(snapshot.revision, 8);
        assert_eq!(snapshot.content[0].text_content(), Some("xxxxxxxx"));
    }
}
