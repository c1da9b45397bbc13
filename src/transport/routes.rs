use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::Uri,
};

use crate::api::events::SessionSnapshot;
use crate::api::models::*;
use crate::api::tracks::Track;
use crate::common::{ApiError, ListenerId, SessionError, SessionId, TrackId};
use crate::session::ReactionTally;
use crate::transport::http_server::AppState;

type Result<T> = std::result::Result<T, ApiError>;

fn reject(e: SessionError, uri: &Uri) -> ApiError {
    ApiError::new(&e, uri.path())
}

/// A required string field, rejecting both absent and empty values.
fn required(
    value: Option<String>,
    name: &'static str,
    uri: &Uri,
) -> Result<String> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| reject(SessionError::MissingField(name), uri))
}

/// POST /sessions
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    Json(req): Json<CreateSessionRequest>,
) -> Result<Json<CreateSessionResponse>> {
    let query = required(req.query, "query", &uri)?;
    let owner_id = required(req.owner_id, "ownerId", &uri)?;
    let session = state
        .registry
        .create_session(ListenerId(owner_id), &query)
        .await
        .map_err(|e| reject(e, &uri))?;
    Ok(Json(CreateSessionResponse {
        session_id: session.id.clone(),
        share_path: format!("/sessions/{}", session.id),
    }))
}

/// GET /sessions/{session_id} — polling fallback, same shape as the
/// `update` event.
pub async fn current_track(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    uri: Uri,
) -> Result<Json<SessionSnapshot>> {
    let snapshot = state
        .registry
        .snapshot(&SessionId(session_id))
        .map_err(|e| reject(e, &uri))?;
    Ok(Json(snapshot))
}

/// POST /sessions/{session_id}/queue
pub async fn queue_track(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    uri: Uri,
    Json(req): Json<QueueRequest>,
) -> Result<Json<Track>> {
    let query = required(req.query, "query", &uri)?;
    let track = state
        .registry
        .queue_track(&SessionId(session_id), &query)
        .await
        .map_err(|e| reject(e, &uri))?;
    Ok(Json(track))
}

/// POST /sessions/{session_id}/join
pub async fn join(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    uri: Uri,
    Json(req): Json<JoinRequest>,
) -> Result<Json<RosterResponse>> {
    let listener_id = required(req.listener_id, "listenerId", &uri)?;
    let display_name = required(req.display_name, "displayName", &uri)?;
    let listener_count = state
        .registry
        .join(&SessionId(session_id), ListenerId(listener_id), display_name)
        .map_err(|e| reject(e, &uri))?;
    Ok(Json(RosterResponse { listener_count }))
}

/// POST /sessions/{session_id}/leave
pub async fn leave(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    uri: Uri,
    Json(req): Json<ListenerRequest>,
) -> Result<Json<RosterResponse>> {
    let listener_id = required(req.listener_id, "listenerId", &uri)?;
    let listener_count = state
        .registry
        .leave(&SessionId(session_id), &ListenerId(listener_id))
        .map_err(|e| reject(e, &uri))?;
    Ok(Json(RosterResponse { listener_count }))
}

/// POST /sessions/{session_id}/heartbeat
pub async fn heartbeat(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    uri: Uri,
    Json(req): Json<ListenerRequest>,
) -> Result<Json<AckResponse>> {
    let listener_id = required(req.listener_id, "listenerId", &uri)?;
    state
        .registry
        .heartbeat(&SessionId(session_id), &ListenerId(listener_id))
        .map_err(|e| reject(e, &uri))?;
    Ok(Json(AckResponse { ok: true }))
}

/// GET /sessions/{session_id}/listeners
pub async fn list_listeners(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    uri: Uri,
) -> Result<Json<ListenersResponse>> {
    let roster = state
        .registry
        .list_listeners(&SessionId(session_id))
        .map_err(|e| reject(e, &uri))?;
    Ok(Json(roster))
}

/// POST /sessions/{session_id}/vote-skip
pub async fn toggle_skip_vote(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    uri: Uri,
    Json(req): Json<ListenerRequest>,
) -> Result<Json<VoteResponse>> {
    let listener_id = required(req.listener_id, "listenerId", &uri)?;
    let outcome = state
        .registry
        .toggle_skip_vote(&SessionId(session_id), &ListenerId(listener_id))
        .map_err(|e| reject(e, &uri))?;
    Ok(Json(VoteResponse {
        skipped: outcome.skipped,
        votes: outcome.votes,
        needed: outcome.needed,
    }))
}

/// POST /sessions/{session_id}/react
pub async fn react(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    uri: Uri,
    Json(req): Json<ReactRequest>,
) -> Result<Json<ReactionTally>> {
    let listener_id = required(req.listener_id, "listenerId", &uri)?;
    let emoji = required(req.emoji, "emoji", &uri)?;
    let track_id = required(req.track_id, "trackId", &uri)?;
    let tally = state
        .registry
        .react(
            &SessionId(session_id),
            &ListenerId(listener_id),
            &emoji,
            &TrackId(track_id),
        )
        .map_err(|e| reject(e, &uri))?;
    Ok(Json(tally))
}

/// POST /sessions/{session_id}/pause
pub async fn pause(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    uri: Uri,
    Json(req): Json<ListenerRequest>,
) -> Result<Json<SessionSnapshot>> {
    let listener_id = required(req.listener_id, "listenerId", &uri)?;
    let snapshot = state
        .registry
        .pause(&SessionId(session_id), &ListenerId(listener_id))
        .map_err(|e| reject(e, &uri))?;
    Ok(Json(snapshot))
}

/// POST /sessions/{session_id}/resume
pub async fn resume(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    uri: Uri,
    Json(req): Json<ListenerRequest>,
) -> Result<Json<SessionSnapshot>> {
    let listener_id = required(req.listener_id, "listenerId", &uri)?;
    let snapshot = state
        .registry
        .resume(&SessionId(session_id), &ListenerId(listener_id))
        .map_err(|e| reject(e, &uri))?;
    Ok(Json(snapshot))
}

/// POST /sessions/{session_id}/seek
pub async fn seek(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    uri: Uri,
    Json(req): Json<SeekRequest>,
) -> Result<Json<SessionSnapshot>> {
    let listener_id = required(req.listener_id, "listenerId", &uri)?;
    let position_secs = req
        .position_secs
        .ok_or_else(|| reject(SessionError::MissingField("positionSecs"), &uri))?;
    let snapshot = state
        .registry
        .seek(
            &SessionId(session_id),
            &ListenerId(listener_id),
            position_secs,
        )
        .map_err(|e| reject(e, &uri))?;
    Ok(Json(snapshot))
}

/// POST /sessions/{session_id}/skip — owner's unilateral skip.
pub async fn skip(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    uri: Uri,
    Json(req): Json<ListenerRequest>,
) -> Result<Json<SessionSnapshot>> {
    let listener_id = required(req.listener_id, "listenerId", &uri)?;
    let snapshot = state
        .registry
        .skip(&SessionId(session_id), &ListenerId(listener_id))
        .map_err(|e| reject(e, &uri))?;
    Ok(Json(snapshot))
}
