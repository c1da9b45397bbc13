use crate::common::{ListenerId, SessionError};
use crate::session::session::{Listener, SessionState};

/// A listener removed from the roster, with the listening time to credit
/// to the stats collaborator (capped at the current track's duration;
/// absent when presence was under the minimum threshold).
#[derive(Debug, Clone)]
pub struct Removed {
    pub listener: Listener,
    pub credit_secs: Option<u64>,
}

impl SessionState {
    /// Inserts (or overwrites) a roster entry with a fresh heartbeat.
    /// Returns the new roster size.
    pub fn join(&mut self, id: ListenerId, display_name: String, now_ms: u64) -> usize {
        self.listeners.insert(
            id.clone(),
            Listener {
                id,
                display_name,
                joined_at_ms: now_ms,
                last_heartbeat_ms: now_ms,
            },
        );
        self.touch(now_ms);
        self.listeners.len()
    }

    pub fn heartbeat(&mut self, id: &ListenerId, now_ms: u64) -> Result<(), SessionError> {
        let listener = self
            .listeners
            .get_mut(id)
            .ok_or(SessionError::ListenerNotFound)?;
        listener.last_heartbeat_ms = now_ms;
        self.touch(now_ms);
        Ok(())
    }

    /// Removes a listener and any pending vote they held. Shared by
    /// explicit leave and timeout eviction.
    pub fn remove_listener(
        &mut self,
        id: &ListenerId,
        now_ms: u64,
        min_credit_secs: u64,
    ) -> Result<Removed, SessionError> {
        let listener = self
            .listeners
            .remove(id)
            .ok_or(SessionError::ListenerNotFound)?;
        self.pending_skip_votes.remove(id);

        let present_secs = now_ms.saturating_sub(listener.joined_at_ms) / 1_000;
        let credit_secs = if present_secs > min_credit_secs {
            let cap = self
                .current_track()
                .map(|t| t.info.duration_secs)
                .unwrap_or(0);
            Some(present_secs.min(cap))
        } else {
            None
        };

        Ok(Removed {
            listener,
            credit_secs,
        })
    }

    /// Evicts every listener whose heartbeat is older than `timeout_ms`.
    pub fn sweep_stale(
        &mut self,
        now_ms: u64,
        timeout_ms: u64,
        min_credit_secs: u64,
    ) -> Vec<Removed> {
        let stale: Vec<ListenerId> = self
            .listeners
            .values()
            .filter(|l| now_ms.saturating_sub(l.last_heartbeat_ms) > timeout_ms)
            .map(|l| l.id.clone())
            .collect();

        stale
            .iter()
            .filter_map(|id| self.remove_listener(id, now_ms, min_credit_secs).ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tracks::test_track;

    fn listener(n: u32) -> ListenerId {
        ListenerId(format!("l{n}"))
    }

    #[test]
    fn test_join_overwrites_existing_entry() {
        let mut state = SessionState::new(test_track("a", 30), 0);
        assert_eq!(state.join(listener(1), "Ann".into(), 1_000), 1);
        assert_eq!(state.join(listener(1), "Ann again".into(), 2_000), 1);
        assert_eq!(state.listeners[&listener(1)].display_name, "Ann again");
    }

    #[test]
    fn test_heartbeat_unknown_listener_errors() {
        let mut state = SessionState::new(test_track("a", 30), 0);
        let err = state.heartbeat(&listener(9), 1_000).unwrap_err();
        assert!(matches!(err, SessionError::ListenerNotFound));
    }

    #[test]
    fn test_leave_removes_pending_vote() {
        // three listeners so one vote stays below the ceil(3/2) quorum
        let mut state = SessionState::new(test_track("a", 30), 0);
        state.append(test_track("b", 30), 0);
        state.join(listener(1), "Ann".into(), 0);
        state.join(listener(2), "Ben".into(), 0);
        state.join(listener(3), "Cal".into(), 0);
        let outcome = state.toggle_skip_vote(&listener(1), 1_000, false).unwrap();
        assert!(!outcome.skipped);
        assert_eq!(state.pending_skip_votes.len(), 1);

        state.remove_listener(&listener(1), 2_000, 10).unwrap();
        assert!(state.pending_skip_votes.is_empty());
        assert_eq!(state.listeners.len(), 2);
    }

    #[test]
    fn test_sweep_evicts_only_stale_listeners() {
        // L joins at t=0 and never heartbeats; M keeps beating
        let mut state = SessionState::new(test_track("a", 30), 0);
        state.join(listener(1), "L".into(), 0);
        state.join(listener(2), "M".into(), 0);
        state.heartbeat(&listener(2), 25_000).unwrap();
        state.pending_skip_votes.insert(listener(1));

        let removed = state.sweep_stale(31_000, 30_000, 10);
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].listener.id, listener(1));
        assert!(state.pending_skip_votes.is_empty());
        assert!(state.listeners.contains_key(&listener(2)));
    }

    #[test]
    fn test_no_credit_below_minimum_presence() {
        let mut state = SessionState::new(test_track("a", 300), 0);
        state.join(listener(1), "L".into(), 0);
        let removed = state.remove_listener(&listener(1), 9_000, 10).unwrap();
        assert_eq!(removed.credit_secs, None);
    }

    #[test]
    fn test_credit_capped_at_track_duration() {
        let mut state = SessionState::new(test_track("a", 30), 0);
        state.join(listener(1), "L".into(), 0);
        let removed = state.remove_listener(&listener(1), 120_000, 10).unwrap();
        assert_eq!(removed.credit_secs, Some(30));
    }

    #[test]
    fn test_credit_below_cap_is_presence_time() {
        let mut state = SessionState::new(test_track("a", 300), 0);
        state.join(listener(1), "L".into(), 0);
        let removed = state.remove_listener(&listener(1), 45_000, 10).unwrap();
        assert_eq!(removed.credit_secs, Some(45));
    }
}
