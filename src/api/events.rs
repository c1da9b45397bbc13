use serde::Serialize;

use crate::api::tracks::Track;
use crate::common::{ListenerId, SessionId, TrackId, now_ms};
use crate::session::reactions::ReactionTally;

/// Events sent from server to clients over the real-time channel.
///
/// One closed variant per event kind, each carrying only the fields
/// that event needs. `Update` is the full snapshot; `SongQueued` is the
/// lightweight delta used when a track is appended mid-playback so an
/// actively playing client is never disturbed.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    Update(SessionSnapshot),

    #[serde(rename_all = "camelCase")]
    SongQueued {
        track: Track,
        queue_len: usize,
        position: usize,
    },

    /// Queue exhausted; playback stops rather than looping.
    PlaybackStopped {},

    #[serde(rename_all = "camelCase")]
    UserJoined {
        listener_id: ListenerId,
        display_name: String,
        listener_count: usize,
    },

    #[serde(rename_all = "camelCase")]
    UserLeft {
        listener_id: ListenerId,
        listener_count: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<LeaveReason>,
    },

    #[serde(rename_all = "camelCase")]
    ReactionUpdate {
        track_id: TrackId,
        tally: ReactionTally,
    },

    VoteUpdate {
        votes: usize,
        needed: usize,
    },

    /// Terminal for the connection; the server closes the channel after
    /// sending this.
    Error {
        message: String,
    },
}

/// Why a listener was removed from the roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaveReason {
    Timeout,
    Left,
    Blocked,
}

/// Wire frame for one event: `{ type, data, timestamp }`.
#[derive(Debug, Clone, Serialize)]
pub struct EventFrame {
    #[serde(flatten)]
    pub event: ServerEvent,
    pub timestamp: u64,
}

impl EventFrame {
    pub fn new(event: ServerEvent) -> Self {
        Self {
            event,
            timestamp: now_ms(),
        }
    }
}

/// Full current-state payload: sent on attach, on advance, on explicit
/// skip, and as the polling fallback response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub playing: bool,
    pub stalled: bool,
    /// Elapsed position of the current track, capped at its duration.
    pub elapsed_secs: f64,
    pub current_index: usize,
    pub current_track: Option<Track>,
    pub current_reactions: Option<ReactionTally>,
    pub next_track: Option<Track>,
    pub queue: Vec<Track>,
    pub listener_count: usize,
    pub votes: usize,
    pub votes_needed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_tags() {
        let frame = EventFrame::new(ServerEvent::PlaybackStopped {});
        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&frame).unwrap()).unwrap();
        assert_eq!(json["type"], "playback_stopped");
        assert!(json["timestamp"].is_u64());

        let frame = EventFrame::new(ServerEvent::UserLeft {
            listener_id: ListenerId("l1".into()),
            listener_count: 2,
            reason: Some(LeaveReason::Timeout),
        });
        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&frame).unwrap()).unwrap();
        assert_eq!(json["type"], "user_left");
        assert_eq!(json["data"]["reason"], "timeout");
        assert_eq!(json["data"]["listenerCount"], 2);
    }

    #[test]
    fn test_song_queued_delta_shape() {
        let track = crate::api::tracks::test_track("a", 30);
        let frame = EventFrame::new(ServerEvent::SongQueued {
            track,
            queue_len: 3,
            position: 2,
        });
        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&frame).unwrap()).unwrap();
        assert_eq!(json["type"], "song_queued");
        assert_eq!(json["data"]["queueLen"], 3);
        assert_eq!(json["data"]["position"], 2);
        assert_eq!(json["data"]["track"]["info"]["durationSecs"], 30);
    }
}
