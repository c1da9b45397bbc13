pub mod broadcast;
pub mod clock;
pub mod presence;
pub mod queue;
pub mod reactions;
pub mod registry;
pub mod session;
pub mod votes;

pub use broadcast::BroadcastHub;
pub use clock::PlaybackClock;
pub use queue::{Advance, Appended};
pub use reactions::{ALLOWED_EMOJIS, ReactionAggregator, ReactionTally};
pub use registry::SessionRegistry;
pub use session::{Listener, Phase, Session, SessionState};
pub use votes::VoteOutcome;
