use std::sync::Arc;

use axum::{
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use tracing::{debug, info, warn};

use crate::api::events::{EventFrame, ServerEvent};
use crate::common::SessionId;
use crate::transport::http_server::AppState;

/// GET /sessions/{session_id}/ws — the real-time channel.
pub async fn websocket_handler(
    Path(session_id): Path<String>,
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, SessionId(session_id)))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>, session_id: SessionId) {
    let session = match state.registry.session(&session_id) {
        Ok(session) => session,
        Err(_) => {
            // one error frame, then the channel is closed
            let frame = EventFrame::new(ServerEvent::Error {
                message: format!("session {session_id} not found"),
            });
            if let Ok(json) = serde_json::to_string(&frame) {
                let _ = socket.send(Message::Text(json.into())).await;
            }
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };

    let (tx, rx) = flume::unbounded();
    let connection_id = state.registry.attach_connection(&session, tx);
    info!(
        "Connection {} attached to session {}",
        connection_id, session_id
    );

    loop {
        tokio::select! {
            outgoing = rx.recv_async() => {
                match outgoing {
                    Ok(msg) => {
                        if socket.send(msg).await.is_err() {
                            break;
                        }
                    }
                    // hub dropped us (or the session was destroyed)
                    Err(_) => break,
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(Message::Text(_))) => {
                        warn!("Ignoring client message; state changes go through the REST api");
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("WebSocket error: session={} err={}", session_id, e);
                        break;
                    }
                }
            }
        }
    }

    session.hub.detach(connection_id);
    debug!(
        "Connection {} detached from session {}",
        connection_id, session_id
    );
}
