use crate::common::{ListenerId, SessionError};
use crate::session::queue::Advance;
use crate::session::session::SessionState;

/// Result of a skip-vote toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteOutcome {
    /// Quorum was reached and the track was skipped.
    pub skipped: bool,
    pub votes: usize,
    pub needed: usize,
    /// The skip exhausted the queue.
    pub stalled: bool,
}

impl SessionState {
    /// Adds or removes the caller's skip vote and performs the skip
    /// inline when quorum (`ceil(listeners / 2)`) is reached.
    ///
    /// Only current listeners may vote. A queue with fewer than two
    /// tracks has no skip target and is rejected distinctly from "not
    /// enough votes" so callers can render an accurate message.
    pub fn toggle_skip_vote(
        &mut self,
        listener_id: &ListenerId,
        now_ms: u64,
        loop_queue: bool,
    ) -> Result<VoteOutcome, SessionError> {
        if !self.listeners.contains_key(listener_id) {
            return Err(SessionError::ListenerNotMember);
        }
        if self.queue.len() < 2 {
            return Err(SessionError::QueueTooShortToSkip);
        }

        if !self.pending_skip_votes.remove(listener_id) {
            self.pending_skip_votes.insert(listener_id.clone());
        }
        self.touch(now_ms);

        let votes = self.pending_skip_votes.len();
        let needed = self.votes_needed();
        if votes >= needed && votes > 0 {
            let outcome = self.advance(now_ms, loop_queue);
            Ok(VoteOutcome {
                skipped: true,
                votes: 0,
                needed,
                stalled: outcome == Advance::Stalled,
            })
        } else {
            Ok(VoteOutcome {
                skipped: false,
                votes,
                needed,
                stalled: false,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tracks::test_track;
    use crate::session::session::Listener;

    fn state_with_listeners(count: usize, tracks: usize) -> SessionState {
        let mut state = SessionState::new(test_track("t0", 30), 0);
        for i in 1..tracks {
            state.append(test_track(&format!("t{i}"), 30), 0);
        }
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
        state
    }

    #[test]
    fn test_non_member_vote_rejected() {
        let mut state = state_with_listeners(2, 2);
        let err = state
            .toggle_skip_vote(&ListenerId("stranger".into()), 1_000, false)
            .unwrap_err();
        assert!(matches!(err, SessionError::ListenerNotMember));
        assert!(state.pending_skip_votes.is_empty());
    }

    #[test]
    fn test_single_track_queue_rejected_distinctly() {
        let mut state = state_with_listeners(4, 1);
        let err = state
            .toggle_skip_vote(&ListenerId("l0".into()), 1_000, false)
            .unwrap_err();
        assert!(matches!(err, SessionError::QueueTooShortToSkip));
    }

    #[test]
    fn test_toggle_off_removes_vote() {
        let mut state = state_with_listeners(4, 2);
        let l0 = ListenerId("l0".into());
        let outcome = state.toggle_skip_vote(&l0, 1_000, false).unwrap();
        assert!(!outcome.skipped);
        assert_eq!(outcome.votes, 1);
        assert_eq!(outcome.needed, 2);

        let outcome = state.toggle_skip_vote(&l0, 2_000, false).unwrap();
        assert!(!outcome.skipped);
        assert_eq!(outcome.votes, 0);
        assert!(state.pending_skip_votes.is_empty());
    }

    #[test]
    fn test_quorum_with_four_listeners_is_two() {
        let mut state = state_with_listeners(4, 2);
        state
            .toggle_skip_vote(&ListenerId("l0".into()), 1_000, false)
            .unwrap();
        let outcome = state
            .toggle_skip_vote(&ListenerId("l1".into()), 2_000, false)
            .unwrap();
        assert!(outcome.skipped);
        assert_eq!(outcome.needed, 2);
        assert_eq!(state.current_index, 1);
        // votes never carry over to the next track
        assert!(state.pending_skip_votes.is_empty());
    }

    #[test]
    fn test_quorum_with_five_listeners_is_three() {
        let mut state = state_with_listeners(5, 2);
        for i in 0..2 {
            let outcome = state
                .toggle_skip_vote(&ListenerId(format!("l{i}")), 1_000, false)
                .unwrap();
            assert!(!outcome.skipped);
            assert_eq!(outcome.needed, 3);
        }
        let outcome = state
            .toggle_skip_vote(&ListenerId("l2".into()), 2_000, false)
            .unwrap();
        assert!(outcome.skipped);
    }

    #[test]
    fn test_voted_skip_of_last_track_stalls() {
        let mut state = state_with_listeners(1, 2);
        state.advance(1_000, false);
        let outcome = state
            .toggle_skip_vote(&ListenerId("l0".into()), 2_000, false)
            .unwrap();
        assert!(outcome.skipped);
        assert!(outcome.stalled);
        assert_eq!(state.current_index, 1);
    }
}
