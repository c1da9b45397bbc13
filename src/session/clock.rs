/// Wall-clock playback position for one session.
///
/// Derives "how far into the current track" purely from timestamps: the
/// anchor marks when position zero would have started. Every operation
/// takes `now` in unix milliseconds from the caller, so the math is
/// deterministic under test with injected clocks. O(1), no I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackClock {
    /// When the current track's position zero would have started.
    /// Signed: a seek past `now` puts the anchor in the future.
    pub anchor_ms: i64,
    /// Freeze point while paused.
    pub paused_at_ms: u64,
    pub playing: bool,
}

impl PlaybackClock {
    /// A clock anchored at `now`, playing.
    pub fn start(now_ms: u64) -> Self {
        Self {
            anchor_ms: now_ms as i64,
            paused_at_ms: now_ms,
            playing: true,
        }
    }

    /// Elapsed position in milliseconds. Frozen at the pause point while
    /// not playing.
    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        let reference = if self.playing {
            now_ms
        } else {
            self.paused_at_ms
        };
        (reference as i64 - self.anchor_ms).max(0) as u64
    }

    pub fn pause(&mut self, now_ms: u64) {
        if self.playing {
            self.paused_at_ms = now_ms;
            self.playing = false;
        }
    }

    /// Shifts the anchor forward by the pause duration so elapsed time
    /// continues seamlessly.
    pub fn resume(&mut self, now_ms: u64) {
        if !self.playing {
            self.anchor_ms += now_ms.saturating_sub(self.paused_at_ms) as i64;
            self.playing = true;
        }
    }

    /// Repositions to `target_ms`, preserving pause state. While paused
    /// the freeze point is pinned to `now` so the frozen elapsed equals
    /// the seek target.
    pub fn seek(&mut self, now_ms: u64, target_ms: u64) {
        self.anchor_ms = now_ms as i64 - target_ms as i64;
        if !self.playing {
            self.paused_at_ms = now_ms;
        }
    }

    /// Re-anchors at position zero for a new track and unpauses.
    pub fn reset(&mut self, now_ms: u64) {
        *self = Self::start(now_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_while_playing() {
        let clock = PlaybackClock::start(1_000);
        assert_eq!(clock.elapsed_ms(1_000), 0);
        assert_eq!(clock.elapsed_ms(31_000), 30_000);
    }

    #[test]
    fn test_pause_freezes_elapsed() {
        let mut clock = PlaybackClock::start(0);
        clock.pause(10_000);
        assert!(!clock.playing);
        assert_eq!(clock.elapsed_ms(10_000), 10_000);
        assert_eq!(clock.elapsed_ms(99_000), 10_000);
    }

    #[test]
    fn test_resume_continues_seamlessly() {
        let mut clock = PlaybackClock::start(0);
        clock.pause(10_000);
        clock.resume(25_000);
        assert!(clock.playing);
        // 15s of pause never happened as far as elapsed is concerned
        assert_eq!(clock.elapsed_ms(25_000), 10_000);
        assert_eq!(clock.elapsed_ms(30_000), 15_000);
    }

    #[test]
    fn test_pause_resume_idempotent() {
        let mut clock = PlaybackClock::start(0);
        clock.resume(5_000);
        assert_eq!(clock.elapsed_ms(5_000), 5_000);
        clock.pause(6_000);
        clock.pause(9_000);
        assert_eq!(clock.elapsed_ms(9_000), 6_000);
    }

    #[test]
    fn test_seek_while_playing() {
        let mut clock = PlaybackClock::start(0);
        clock.seek(10_000, 60_000);
        assert!(clock.playing);
        assert_eq!(clock.elapsed_ms(10_000), 60_000);
        assert_eq!(clock.elapsed_ms(12_000), 62_000);
    }

    #[test]
    fn test_seek_past_now_is_exact() {
        // target beyond the wall clock puts the anchor in the future
        let mut clock = PlaybackClock::start(0);
        clock.seek(1_000, 90_000);
        assert_eq!(clock.elapsed_ms(1_000), 90_000);

        clock.pause(2_000);
        clock.seek(3_000, 120_000);
        assert_eq!(clock.elapsed_ms(3_000), 120_000);
        assert_eq!(clock.elapsed_ms(50_000), 120_000);
    }

    #[test]
    fn test_seek_while_paused_stays_frozen() {
        let mut clock = PlaybackClock::start(0);
        clock.pause(10_000);
        clock.seek(20_000, 5_000);
        assert!(!clock.playing);
        assert_eq!(clock.elapsed_ms(20_000), 5_000);
        assert_eq!(clock.elapsed_ms(50_000), 5_000);
        clock.resume(30_000);
        assert_eq!(clock.elapsed_ms(31_000), 6_000);
    }

    #[test]
    fn test_reset_reanchors_at_zero() {
        let mut clock = PlaybackClock::start(0);
        clock.pause(10_000);
        clock.reset(40_000);
        assert!(clock.playing);
        assert_eq!(clock.elapsed_ms(40_000), 0);
        assert_eq!(clock.elapsed_ms(41_000), 1_000);
    }
}
