use std::collections::HashMap;

use dashmap::DashMap;
use serde::Serialize;

use crate::common::{ListenerId, SessionError, TrackId};

/// The fixed set of emoji a listener may react with.
pub const ALLOWED_EMOJIS: &[&str] = &["🔥", "❤️", "🎉", "😂", "😮", "👍"];

/// Reaction counts for one track.
///
/// Reactions are exclusive: a listener's new reaction replaces their
/// previous one, so `total` equals the number of distinct listeners who
/// have ever reacted, and equals the sum of `breakdown` values.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionTally {
    pub total: u64,
    pub breakdown: HashMap<String, u64>,
    /// Most recent emoji per listener. Not part of the wire payload.
    #[serde(skip)]
    by_listener: HashMap<ListenerId, String>,
}

/// Per-track reaction tallies, keyed by track identity rather than any
/// single session so history survives track removal.
#[derive(Default)]
pub struct ReactionAggregator {
    tallies: DashMap<TrackId, ReactionTally>,
}

impl ReactionAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `listener_id`'s reaction to `track_id`, replacing any
    /// prior one, and returns the updated tally.
    pub fn react(
        &self,
        track_id: &TrackId,
        listener_id: &ListenerId,
        emoji: &str,
    ) -> Result<ReactionTally, SessionError> {
        if !ALLOWED_EMOJIS.contains(&emoji) {
            return Err(SessionError::InvalidEmoji(emoji.to_string()));
        }

        let mut tally = self.tallies.entry(track_id.clone()).or_default();
        if let Some(prev) = tally
            .by_listener
            .insert(listener_id.clone(), emoji.to_string())
        {
            if let Some(count) = tally.breakdown.get_mut(&prev) {
                *count = count.saturating_sub(1);
            }
            tally.total = tally.total.saturating_sub(1);
        }
        *tally.breakdown.entry(emoji.to_string()).or_insert(0) += 1;
        tally.total += 1;

        Ok(tally.clone())
    }

    pub fn tally_for(&self, track_id: &TrackId) -> Option<ReactionTally> {
        self.tallies.get(track_id).map(|t| t.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fire() -> &'static str {
        ALLOWED_EMOJIS[0]
    }

    fn heart() -> &'static str {
        ALLOWED_EMOJIS[1]
    }

    #[test]
    fn test_unknown_emoji_rejected() {
        let agg = ReactionAggregator::new();
        let err = agg
            .react(&TrackId("t1".into()), &ListenerId("l1".into()), "🤖")
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidEmoji(_)));
        assert!(agg.tally_for(&TrackId("t1".into())).is_none());
    }

    #[test]
    fn test_react_is_idempotent_per_listener() {
        let agg = ReactionAggregator::new();
        let track = TrackId("t1".into());
        let listener = ListenerId("l1".into());
        agg.react(&track, &listener, fire()).unwrap();
        let tally = agg.react(&track, &listener, fire()).unwrap();
        assert_eq!(tally.total, 1);
        assert_eq!(tally.breakdown[fire()], 1);
    }

    #[test]
    fn test_new_reaction_replaces_previous() {
        let agg = ReactionAggregator::new();
        let track = TrackId("t1".into());
        let listener = ListenerId("l1".into());
        agg.react(&track, &listener, fire()).unwrap();
        let tally = agg.react(&track, &listener, heart()).unwrap();
        // one swap, not a net increase
        assert_eq!(tally.total, 1);
        assert_eq!(tally.breakdown[fire()], 0);
        assert_eq!(tally.breakdown[heart()], 1);
    }

    #[test]
    fn test_total_counts_distinct_listeners() {
        let agg = ReactionAggregator::new();
        let track = TrackId("t1".into());
        for i in 0..3 {
            agg.react(&track, &ListenerId(format!("l{i}")), fire())
                .unwrap();
        }
        // l0 toggles around; the count must not inflate
        agg.react(&track, &ListenerId("l0".into()), heart()).unwrap();
        let tally = agg.react(&track, &ListenerId("l0".into()), fire()).unwrap();
        assert_eq!(tally.total, 3);
        assert_eq!(tally.breakdown.values().sum::<u64>(), tally.total);
    }

    #[test]
    fn test_tallies_are_per_track() {
        let agg = ReactionAggregator::new();
        let listener = ListenerId("l1".into());
        agg.react(&TrackId("t1".into()), &listener, fire()).unwrap();
        agg.react(&TrackId("t2".into()), &listener, heart()).unwrap();
        assert_eq!(agg.tally_for(&TrackId("t1".into())).unwrap().total, 1);
        assert_eq!(agg.tally_for(&TrackId("t2".into())).unwrap().total, 1);
    }
}
