use crate::common::{ListenerId, SessionId, TrackId};

/// Receiver for aggregate-statistics events.
///
/// Recording is fire-and-forget: implementations must never block or
/// fail the core operation that triggered them, so the methods are
/// infallible by construction.
pub trait StatsSink: Send + Sync {
    /// Listening time credited when a listener is removed, already
    /// capped at the current track's duration by the caller.
    fn listening_credit(&self, session_id: &SessionId, listener_id: &ListenerId, seconds: u64);

    fn vote_cast(&self, session_id: &SessionId, listener_id: &ListenerId, active: bool);

    fn reaction(&self, track_id: &TrackId, listener_id: &ListenerId, emoji: &str);
}

/// Sink that only logs, for deployments without a stats backend.
pub struct LogStatsSink;

impl StatsSink for LogStatsSink {
    fn listening_credit(&self, session_id: &SessionId, listener_id: &ListenerId, seconds: u64) {
        tracing::debug!(
            "Listening credit: session={} listener={} seconds={}",
            session_id,
            listener_id,
            seconds
        );
    }

    fn vote_cast(&self, session_id: &SessionId, listener_id: &ListenerId, active: bool) {
        tracing::debug!(
            "Skip vote: session={} listener={} active={}",
            session_id,
            listener_id,
            active
        );
    }

    fn reaction(&self, track_id: &TrackId, listener_id: &ListenerId, emoji: &str) {
        tracing::debug!(
            "Reaction: track={} listener={} emoji={}",
            track_id,
            listener_id,
            emoji
        );
    }
}
