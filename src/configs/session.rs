use serde::{Deserialize, Serialize};

/// Timing knobs for the session engine's periodic ticks and lifecycle.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SessionConfig {
    /// Auto-advance evaluation interval.
    pub advance_tick_secs: u64,
    /// Presence sweep interval.
    pub presence_sweep_secs: u64,
    /// A listener silent longer than this is evicted by the sweep.
    pub heartbeat_timeout_secs: u64,
    /// Garbage collection interval.
    pub gc_interval_secs: u64,
    /// An empty session idle longer than this is destroyed by GC.
    pub idle_retention_secs: u64,
    /// Minimum presence before listening time is credited on removal.
    pub min_credit_secs: u64,
    /// Wrap back to the first track when the queue is exhausted instead
    /// of stalling.
    pub loop_queue: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            advance_tick_secs: 1,
            presence_sweep_secs: 15,
            heartbeat_timeout_secs: 30,
            gc_interval_secs: 600,
            idle_retention_secs: 1800,
            min_credit_secs: 10,
            loop_queue: false,
        }
    }
}

/// Admission limits applied to resolved tracks before they enter a queue.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_track_bytes: u64,
    pub max_track_duration_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_track_bytes: 50 * 1024 * 1024,
            max_track_duration_secs: 3600,
        }
    }
}
