use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;

use crate::api::tracks::Track;
use crate::common::{ListenerId, SessionId};
use crate::session::broadcast::BroadcastHub;
use crate::session::clock::PlaybackClock;

/// A participant in a session. Ephemeral: exists only while present in
/// the roster.
#[derive(Debug, Clone)]
pub struct Listener {
    pub id: ListenerId,
    pub display_name: String,
    pub joined_at_ms: u64,
    pub last_heartbeat_ms: u64,
}

/// Playback phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No track yet. Transient; sessions are created with a first track.
    Empty,
    Playing,
    /// Explicitly paused; elapsed position is frozen.
    Paused,
    /// Queue exhausted. Terminal until an append or explicit control.
    Stalled,
}

/// All mutable per-session fields. Guarded by the session's mutex; every
/// collection is initialized at construction.
#[derive(Debug)]
pub struct SessionState {
    pub queue: Vec<Track>,
    /// Playback position in the queue. In-bounds whenever the queue is
    /// non-empty; never wraps.
    pub current_index: usize,
    pub clock: PlaybackClock,
    pub stalled: bool,
    pub listeners: HashMap<ListenerId, Listener>,
    /// Always a subset of the roster keys; cleared on every advance.
    pub pending_skip_votes: HashSet<ListenerId>,
    /// Updated by any listener-facing mutation; drives idle GC.
    pub last_activity_ms: u64,
}

impl SessionState {
    pub fn new(first_track: Track, now_ms: u64) -> Self {
        Self {
            queue: vec![first_track],
            current_index: 0,
            clock: PlaybackClock::start(now_ms),
            stalled: false,
            listeners: HashMap::new(),
            pending_skip_votes: HashSet::new(),
            last_activity_ms: now_ms,
        }
    }

    pub fn phase(&self) -> Phase {
        if self.queue.is_empty() {
            Phase::Empty
        } else if self.clock.playing {
            Phase::Playing
        } else if self.stalled {
            Phase::Stalled
        } else {
            Phase::Paused
        }
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.queue.get(self.current_index)
    }

    pub fn next_track(&self) -> Option<&Track> {
        self.queue.get(self.current_index + 1)
    }

    /// Elapsed position of the current track, capped at its duration.
    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        let elapsed = self.clock.elapsed_ms(now_ms);
        match self.current_track() {
            Some(track) => elapsed.min(track.info.duration_secs * 1_000),
            None => 0,
        }
    }

    /// Minimum vote count required to force a skip: ceil(listeners / 2).
    pub fn votes_needed(&self) -> usize {
        self.listeners.len().div_ceil(2)
    }

    pub fn touch(&mut self, now_ms: u64) {
        self.last_activity_ms = now_ms;
    }
}

/// One listening room: queue, clock, roster, votes, and the fan-out hub
/// for its live connections.
#[derive(Debug)]
pub struct Session {
    pub id: SessionId,
    /// Identity of the creator; authorizes unilateral playback control.
    pub owner_id: ListenerId,
    pub state: Mutex<SessionState>,
    pub hub: BroadcastHub,
}

impl Session {
    pub fn new(id: SessionId, owner_id: ListenerId, first_track: Track, now_ms: u64) -> Self {
        Self {
            id,
            owner_id,
            state: Mutex::new(SessionState::new(first_track, now_ms)),
            hub: BroadcastHub::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tracks::test_track;

    #[test]
    fn test_new_session_is_playing_at_zero() {
        let state = SessionState::new(test_track("a", 30), 5_000);
        assert_eq!(state.phase(), Phase::Playing);
        assert_eq!(state.current_index, 0);
        assert_eq!(state.elapsed_ms(5_000), 0);
        assert!(state.listeners.is_empty());
        assert!(state.pending_skip_votes.is_empty());
    }

    #[test]
    fn test_elapsed_capped_at_duration() {
        let state = SessionState::new(test_track("a", 30), 0);
        assert_eq!(state.elapsed_ms(29_000), 29_000);
        assert_eq!(state.elapsed_ms(95_000), 30_000);
    }

    #[test]
    fn test_votes_needed_quorum() {
        let mut state = SessionState::new(test_track("a", 30), 0);
        for (count, needed) in [(1, 1), (2, 1), (3, 2), (4, 2), (5, 3)] {
            state.listeners.clear();
            for i in 0..count {
                let id = ListenerId(format!("l{i}"));
                state.listeners.insert(
                    id.clone(),
                    Listener {
                        id,
                        display_name: format!("L{i}"),
                        joined_at_ms: 0,
                        last_heartbeat_ms: 0,
                    },
                );
            }
            assert_eq!(state.votes_needed(), needed, "quorum for {count} listeners");
        }
    }
}
