use crate::api::tracks::Track;
use crate::session::session::SessionState;

/// Outcome of appending a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Appended {
    /// The session was stalled; playback restarted immediately at the
    /// new track. Callers must broadcast a full snapshot.
    Restarted,
    /// Appended behind the current track. Callers broadcast only a
    /// delta so playing clients are not disturbed.
    Queued { position: usize },
}

/// Outcome of an advance or skip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Advanced,
    /// No next track; playback stopped with the index unchanged.
    Stalled,
}

impl SessionState {
    /// Pushes a track onto the queue. If the queue had run out, this
    /// restarts playback at the appended track right away rather than
    /// waiting for the next tick.
    pub fn append(&mut self, track: Track, now_ms: u64) -> Appended {
        self.queue.push(track);
        self.touch(now_ms);
        if self.stalled {
            // the restart is an advance: votes against the stalled
            // track must not survive onto the new one
            self.pending_skip_votes.clear();
            self.current_index = self.queue.len() - 1;
            self.stalled = false;
            self.clock.reset(now_ms);
            Appended::Restarted
        } else {
            Appended::Queued {
                position: self.queue.len() - 1,
            }
        }
    }

    /// Moves to the next track, re-anchoring the clock at `now`. At the
    /// end of the queue playback stops (no wraparound) unless
    /// `loop_queue` policy is enabled. Pending skip votes are cleared
    /// on every call: a skip happened, whatever the path.
    pub fn advance(&mut self, now_ms: u64, loop_queue: bool) -> Advance {
        self.pending_skip_votes.clear();
        if self.current_index + 1 < self.queue.len() {
            self.current_index += 1;
            self.clock.reset(now_ms);
            Advance::Advanced
        } else if loop_queue && !self.queue.is_empty() {
            self.current_index = 0;
            self.clock.reset(now_ms);
            Advance::Advanced
        } else {
            self.clock.pause(now_ms);
            self.stalled = true;
            Advance::Stalled
        }
    }

    /// True when the current track has played out to its full duration.
    pub fn current_finished(&self, now_ms: u64) -> bool {
        match self.current_track() {
            Some(track) => self.clock.elapsed_ms(now_ms) >= track.info.duration_secs * 1_000,
            None => false,
        }
    }
}
