//! HTTP + Server-Sent Events surface over the document registry.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{delete, get, post, put},
    Json, Router,
};
use futures::stream::{self, Stream};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tokio_stream::StreamExt;
use tower_http::cors::CorsLayer;

use crate::error::WorkspaceError;
use crate::presence::UserContext;
use crate::protocol::{Acknowledgement, ResyncNotice, SelectionUpdate, SessionEvent, SnapshotResponse};
use crate::registry::DocumentRegistry;

pub type AppState = Arc<DocumentRegistry>;

pub fn router(registry: AppState) -> Router {
    Router::new()
        .route("/documents/:key", get(get_snapshot))
        .route("/documents/:key/operations", post(submit_operations))
        .route("/documents/:key/users", post(join))
        .route("/documents/:key/users/:user_id", delete(leave))
        .route("/documents/:key/users/:user_id/selection", put(update_selection))
        .route("/documents/:key/events", get(events))
        .with_state(registry)
        .layer(CorsLayer::permissive())
}

impl WorkspaceError {
    pub fn status(&self) -> StatusCode {
        match self {
            e if e.requires_resync() => StatusCode::CONFLICT,
            WorkspaceError::Ot(_) | WorkspaceError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            WorkspaceError::UnknownUser { .. } => StatusCode::NOT_FOUND,
            WorkspaceError::InvalidContent(_) | WorkspaceError::Io { .. } | WorkspaceError::Config { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for WorkspaceError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.to_string(),
            "resync": self.requires_resync(),
        });
        (self.status(), Json(body)).into_response()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ViewerQuery {
    user_id: Option<String>,
}

async fn get_snapshot(
    State(registry): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<ViewerQuery>,
) -> Json<SnapshotResponse> {
    let session = registry.get_or_create_session(&key);
    Json(session.snapshot(query.user_id.as_deref()).await)
}

async fn submit_operations(
    State(registry): State<AppState>,
    Path(key): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Acknowledgement>, WorkspaceError> {
    let session = registry.get_or_create_session(&key);
    Ok(Json(session.submit(body).await?))
}

async fn join(
    State(registry): State<AppState>,
    Path(key): Path<String>,
    Json(user): Json<UserContext>,
) -> (StatusCode, Json<SnapshotResponse>) {
    let session = registry.get_or_create_session(&key);
    (StatusCode::CREATED, Json(session.join(user).await))
}

async fn update_selection(
    State(registry): State<AppState>,
    Path((key, user_id)): Path<(String, String)>,
    Json(update): Json<SelectionUpdate>,
) -> Result<Json<UserContext>, WorkspaceError> {
    let session = registry.get_or_create_session(&key);
    Ok(Json(session.update_selection(&user_id, update.document_selection).await?))
}

async fn leave(
    State(registry): State<AppState>,
    Path((key, user_id)): Path<(String, String)>,
) -> Result<StatusCode, WorkspaceError> {
    let session = registry.get_or_create_session(&key);
    session.leave(&user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Snapshot first, then every session event as it happens
async fn events(
    State(registry): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<ViewerQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let session = registry.get_or_create_session(&key);

    // subscribe before the snapshot so nothing falls in between
    let receiver = session.subscribe();
    let snapshot = session.snapshot(query.user_id.as_deref()).await;
    tracing::info!(document = %key, revision = snapshot.revision, "starting event stream");

    let initial = stream::iter(sse_event("snapshot", &snapshot).map(Ok));

    let updates = session_updates(receiver, key).filter_map(|update| match update {
        Update::Event(event) => sse_event(event.name(), &event).map(Ok),
        Update::Resync(notice) => sse_event("resync", &notice).map(Ok),
    });

    Sse::new(initial.chain(updates)).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)).text("ping"))
}

#[derive(Debug, PartialEq)]
enum Update {
    Event(SessionEvent),
    Resync(ResyncNotice),
}

/// Session events in order. A lagged subscriber has missed applied
/// batches, so it gets one resync notice and the stream ends.
fn session_updates(receiver: broadcast::Receiver<SessionEvent>, document: String) -> impl Stream<Item = Update> {
    stream::unfold(Some(BroadcastStream::new(receiver)), move |updates| {
        let document = document.clone();
        async move {
            let mut updates = updates?;
            match updates.next().await? {
                Ok(event) => Some((Update::Event(event), Some(updates))),
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    tracing::warn!(document = %document, skipped, "subscriber lagged, requesting resync");
                    Some((Update::Resync(ResyncNotice { skipped }), None))
                }
            }
        }
    })
}

fn sse_event<T: serde::Serialize>(name: &str, payload: &T) -> Option<Event> {
    match Event::default().event(name).json_data(payload) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::error!(event = name, error = %e, "failed to encode event");
            None
        }
    }
}
