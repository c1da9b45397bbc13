use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::configs::Config;
use crate::session::SessionRegistry;
use crate::transport::{routes, websocket_server};

/// Shared state handed to every handler.
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub config: Config,
}

pub fn router(state: Arc<AppState>) -> Router {
    let session_routes = Router::new()
        .route("/", post(routes::create_session))
        .route("/{session_id}", get(routes::current_track))
        .route("/{session_id}/queue", post(routes::queue_track))
        .route("/{session_id}/join", post(routes::join))
        .route("/{session_id}/leave", post(routes::leave))
        .route("/{session_id}/heartbeat", post(routes::heartbeat))
        .route("/{session_id}/listeners", get(routes::list_listeners))
        .route("/{session_id}/vote-skip", post(routes::toggle_skip_vote))
        .route("/{session_id}/react", post(routes::react))
        .route("/{session_id}/pause", post(routes::pause))
        .route("/{session_id}/resume", post(routes::resume))
        .route("/{session_id}/seek", post(routes::seek))
        .route("/{session_id}/skip", post(routes::skip))
        .route("/{session_id}/ws", get(websocket_server::websocket_handler));

    Router::new()
        .nest("/sessions", session_routes)
        .nest_service(
            "/songs",
            ServeDir::new(&state.config.storage.songs_dir),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
