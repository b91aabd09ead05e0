//! Live submission status over websocket
//!
//! A client opens one connection per submission and receives the "now
//! judging" update followed by the terminal verdict. Client frames are
//! ignored apart from close.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use uuid::Uuid;

use crate::{constants::LISTENER_BUFFER, notify::NotificationHub, state::AppState};

/// Upgrade and attach the connection to the submission's listeners
async fn submission_updates(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(submission_id): Path<Uuid>,
) -> impl IntoResponse {
    let hub = state.hub().clone();
    ws.on_upgrade(move |socket| serve_listener(socket, hub, submission_id))
}

async fn serve_listener(socket: WebSocket, hub: Arc<NotificationHub>, submission_id: Uuid) {
    let (listener, mut updates) = hub.subscribe(submission_id, LISTENER_BUFFER);
    let (mut sink, mut stream) = socket.split();

    tracing::debug!(submission_id = %submission_id, "Listener connected");

    let writer = tokio::spawn(async move {
        while let Some(payload) = updates.recv().await {
            if sink.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(frame)) = stream.next().await {
        if let Message::Close(_) = frame {
            break;
        }
    }

    hub.unregister(submission_id, listener);
    writer.abort();

    tracing::debug!(submission_id = %submission_id, "Listener disconnected");
}

/// Websocket routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/ws/submissions/{id}", get(submission_updates))
}
