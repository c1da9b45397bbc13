use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::common::now_ms;

/// Structured error taxonomy for every session-facing operation.
///
/// Request-surface errors are returned synchronously with a structured
/// code, never thrown as fatal; callers own the user-facing phrasing.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    #[error("session not found")]
    SessionNotFound,

    #[error("listener not found")]
    ListenerNotFound,

    #[error("caller is not a listener in this session")]
    ListenerNotMember,

    #[error("caller is not the session owner")]
    NotOwner,

    #[error("emoji '{0}' is not in the allowed set")]
    InvalidEmoji(String),

    #[error("queue needs at least two tracks before a skip has a target")]
    QueueTooShortToSkip,

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("acquisition failed: {0}")]
    AcquisitionFailed(String),

    #[error("track is too large: {size} bytes (limit {limit})")]
    TrackTooLarge { size: u64, limit: u64 },

    #[error("track is too long: {duration}s (limit {limit})")]
    TrackTooLong { duration: u64, limit: u64 },
}

impl SessionError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::SessionNotFound | Self::ListenerNotFound => StatusCode::NOT_FOUND,
            Self::ListenerNotMember | Self::NotOwner => StatusCode::FORBIDDEN,
            Self::InvalidEmoji(_)
            | Self::QueueTooShortToSkip
            | Self::MissingField(_)
            | Self::TrackTooLarge { .. }
            | Self::TrackTooLong { .. } => StatusCode::BAD_REQUEST,
            Self::AcquisitionFailed(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

/// JSON error response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Unix timestamp in milliseconds.
    pub timestamp: u64,
    /// HTTP status code.
    pub status: u16,
    /// HTTP status reason phrase (e.g. "Bad Request").
    pub error: String,
    /// Human-readable error message.
    pub message: String,
    /// The request path that caused the error.
    pub path: String,
}

impl ApiError {
    pub fn new(err: &SessionError, path: impl Into<String>) -> Self {
        let status = err.status();
        Self {
            timestamp: now_ms(),
            status: status.as_u16(),
            error: status.canonical_reason().unwrap_or("Unknown").to_string(),
            message: err.to_string(),
            path: path.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(SessionError::SessionNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(SessionError::ListenerNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            SessionError::ListenerNotMember.status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            SessionError::QueueTooShortToSkip.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            SessionError::InvalidEmoji("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            SessionError::MissingField("listenerId").status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_api_error_body() {
        let body = ApiError::new(&SessionError::SessionNotFound, "/sessions/abc/join");
        assert_eq!(body.status, 404);
        assert_eq!(body.error, "Not Found");
        assert_eq!(body.path, "/sessions/abc/join");
    }
}
