use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::events::{EventFrame, LeaveReason, ServerEvent, SessionSnapshot};
use crate::api::models::{ListenerInfo, ListenersResponse};
use crate::api::tracks::{Track, TrackInfo};
use crate::common::{ListenerId, SessionError, SessionId, TrackId, now_ms};
use crate::configs::{LimitsConfig, SessionConfig};
use crate::monitoring::StatsSink;
use crate::session::broadcast::ConnectionId;
use crate::session::presence::Removed;
use crate::session::queue::{Advance, Appended};
use crate::session::reactions::ReactionAggregator;
use crate::session::session::{Phase, Session, SessionState};
use crate::session::votes::VoteOutcome;
use crate::sources::{AudioAcquisition, ResolvedTrack};
use crate::storage::FileStore;

/// Owns every live session and drives the periodic ticks.
///
/// All external requests enter here, get delegated to the session's
/// state under its own mutex, and fan out through its BroadcastHub.
/// Sessions are independent: no operation takes more than one session
/// lock. Anything that awaits (acquisition, storage) completes before a
/// lock is taken.
pub struct SessionRegistry {
    sessions: DashMap<SessionId, Arc<Session>>,
    reactions: ReactionAggregator,
    acquisition: Arc<dyn AudioAcquisition>,
    store: Arc<dyn FileStore>,
    stats: Arc<dyn StatsSink>,
    config: SessionConfig,
    limits: LimitsConfig,
    /// Handles of the periodic tick tasks; aborted on shutdown.
    ticks: Mutex<Vec<JoinHandle<()>>>,
}

impl SessionRegistry {
    pub fn new(
        acquisition: Arc<dyn AudioAcquisition>,
        store: Arc<dyn FileStore>,
        stats: Arc<dyn StatsSink>,
        config: SessionConfig,
        limits: LimitsConfig,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            reactions: ReactionAggregator::new(),
            acquisition,
            store,
            stats,
            config,
            limits,
            ticks: Mutex::new(Vec::new()),
        }
    }

    pub fn session(&self, id: &SessionId) -> Result<Arc<Session>, SessionError> {
        self.sessions
            .get(id)
            .map(|s| s.clone())
            .ok_or(SessionError::SessionNotFound)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    // -----------------------------------------------------------------
    // Session lifecycle
    // -----------------------------------------------------------------

    /// Resolves the first track and creates a session playing it.
    pub async fn create_session(
        &self,
        owner_id: ListenerId,
        query: &str,
    ) -> Result<Arc<Session>, SessionError> {
        let track = self.resolve_admitted(query).await?;
        let id = SessionId::generate();
        let session = Arc::new(Session::new(id.clone(), owner_id, track, now_ms()));
        self.sessions.insert(id.clone(), session.clone());
        info!("Session started: {}", id);
        Ok(session)
    }

    /// Resolves a track and appends it. A stalled session restarts at
    /// the new track and gets a full snapshot; otherwise only the
    /// lightweight delta is broadcast.
    pub async fn queue_track(
        &self,
        session_id: &SessionId,
        query: &str,
    ) -> Result<Track, SessionError> {
        let session = self.session(session_id)?;
        // resolve before locking; the critical section never blocks
        let track = self.resolve_admitted(query).await?;

        let state = &mut *session.state.lock();
        match state.append(track.clone(), now_ms()) {
            Appended::Restarted => {
                self.broadcast_snapshot(&session, state);
            }
            Appended::Queued { position } => {
                session.hub.broadcast(&EventFrame::new(ServerEvent::SongQueued {
                    track: track.clone(),
                    queue_len: state.queue.len(),
                    position,
                }));
            }
        }
        Ok(track)
    }

    /// Applies admission limits to a resolved track, deleting the blob
    /// before the caller is told no track was added.
    async fn resolve_admitted(&self, query: &str) -> Result<Track, SessionError> {
        let resolved = self.acquisition.resolve(query).await?;

        let rejection = if resolved.size_bytes > self.limits.max_track_bytes {
            Some(SessionError::TrackTooLarge {
                size: resolved.size_bytes,
                limit: self.limits.max_track_bytes,
            })
        } else if resolved.duration_secs > self.limits.max_track_duration_secs {
            Some(SessionError::TrackTooLong {
                duration: resolved.duration_secs,
                limit: self.limits.max_track_duration_secs,
            })
        } else {
            None
        };

        if let Some(err) = rejection {
            if let Err(e) = self.store.delete(&resolved.storage_ref).await {
                warn!("Failed to delete rejected blob {}: {}", resolved.storage_ref, e);
            }
            return Err(err);
        }

        Ok(track_from(resolved))
    }

    // -----------------------------------------------------------------
    // Presence
    // -----------------------------------------------------------------

    pub fn join(
        &self,
        session_id: &SessionId,
        listener_id: ListenerId,
        display_name: String,
    ) -> Result<usize, SessionError> {
        let session = self.session(session_id)?;
        let state = &mut *session.state.lock();
        let count = state.join(listener_id.clone(), display_name.clone(), now_ms());
        session.hub.broadcast(&EventFrame::new(ServerEvent::UserJoined {
            listener_id,
            display_name,
            listener_count: count,
        }));
        Ok(count)
    }

    pub fn leave(
        &self,
        session_id: &SessionId,
        listener_id: &ListenerId,
    ) -> Result<usize, SessionError> {
        let session = self.session(session_id)?;
        let state = &mut *session.state.lock();
        let now = now_ms();
        let removed = state.remove_listener(listener_id, now, self.config.min_credit_secs)?;
        state.touch(now);
        let count = state.listeners.len();
        self.finish_removal(&session, removed, Some(LeaveReason::Left), count);
        Ok(count)
    }

    pub fn heartbeat(
        &self,
        session_id: &SessionId,
        listener_id: &ListenerId,
    ) -> Result<(), SessionError> {
        let session = self.session(session_id)?;
        session.state.lock().heartbeat(listener_id, now_ms())
    }

    pub fn list_listeners(
        &self,
        session_id: &SessionId,
    ) -> Result<ListenersResponse, SessionError> {
        let session = self.session(session_id)?;
        let state = session.state.lock();
        let mut listeners: Vec<ListenerInfo> = state
            .listeners
            .values()
            .map(|l| ListenerInfo {
                id: l.id.clone(),
                display_name: l.display_name.clone(),
                joined_at: l.joined_at_ms,
            })
            .collect();
        listeners.sort_by_key(|l| l.joined_at);
        Ok(ListenersResponse {
            listeners,
            votes: state.pending_skip_votes.len(),
            votes_needed: state.votes_needed(),
        })
    }

    /// Broadcasts the departure and forwards any listening credit.
    fn finish_removal(
        &self,
        session: &Session,
        removed: Removed,
        reason: Option<LeaveReason>,
        listener_count: usize,
    ) {
        if let Some(seconds) = removed.credit_secs {
            self.stats
                .listening_credit(&session.id, &removed.listener.id, seconds);
        }
        session.hub.broadcast(&EventFrame::new(ServerEvent::UserLeft {
            listener_id: removed.listener.id,
            listener_count,
            reason,
        }));
    }

    // -----------------------------------------------------------------
    // Votes & reactions
    // -----------------------------------------------------------------

    pub fn toggle_skip_vote(
        &self,
        session_id: &SessionId,
        listener_id: &ListenerId,
    ) -> Result<VoteOutcome, SessionError> {
        let session = self.session(session_id)?;
        let state = &mut *session.state.lock();
        let outcome = state.toggle_skip_vote(listener_id, now_ms(), self.config.loop_queue)?;

        let vote_active = state.pending_skip_votes.contains(listener_id);
        self.stats.vote_cast(&session.id, listener_id, vote_active);

        if outcome.skipped {
            if outcome.stalled {
                session
                    .hub
                    .broadcast(&EventFrame::new(ServerEvent::PlaybackStopped {}));
            }
            self.broadcast_snapshot(&session, state);
        } else {
            session.hub.broadcast(&EventFrame::new(ServerEvent::VoteUpdate {
                votes: outcome.votes,
                needed: outcome.needed,
            }));
        }
        Ok(outcome)
    }

    pub fn react(
        &self,
        session_id: &SessionId,
        listener_id: &ListenerId,
        emoji: &str,
        track_id: &TrackId,
    ) -> Result<crate::session::reactions::ReactionTally, SessionError> {
        let session = self.session(session_id)?;
        {
            let state = &mut *session.state.lock();
            if !state.listeners.contains_key(listener_id) {
                return Err(SessionError::ListenerNotMember);
            }
            state.touch(now_ms());
        }

        let tally = self.reactions.react(track_id, listener_id, emoji)?;
        self.stats.reaction(track_id, listener_id, emoji);
        session.hub.broadcast(&EventFrame::new(ServerEvent::ReactionUpdate {
            track_id: track_id.clone(),
            tally: tally.clone(),
        }));
        Ok(tally)
    }

    // -----------------------------------------------------------------
    // Owner playback controls
    // -----------------------------------------------------------------

    fn ensure_owner(session: &Session, listener_id: &ListenerId) -> Result<(), SessionError> {
        if &session.owner_id != listener_id {
            return Err(SessionError::NotOwner);
        }
        Ok(())
    }

    pub fn pause(
        &self,
        session_id: &SessionId,
        listener_id: &ListenerId,
    ) -> Result<SessionSnapshot, SessionError> {
        let session = self.session(session_id)?;
        Self::ensure_owner(&session, listener_id)?;
        let state = &mut *session.state.lock();
        let now = now_ms();
        state.clock.pause(now);
        state.touch(now);
        Ok(self.broadcast_snapshot(&session, state))
    }

    pub fn resume(
        &self,
        session_id: &SessionId,
        listener_id: &ListenerId,
    ) -> Result<SessionSnapshot, SessionError> {
        let session = self.session(session_id)?;
        Self::ensure_owner(&session, listener_id)?;
        let state = &mut *session.state.lock();
        let now = now_ms();
        // resuming is also the explicit way out of a stall
        state.stalled = false;
        state.clock.resume(now);
        state.touch(now);
        Ok(self.broadcast_snapshot(&session, state))
    }

    pub fn seek(
        &self,
        session_id: &SessionId,
        listener_id: &ListenerId,
        position_secs: u64,
    ) -> Result<SessionSnapshot, SessionError> {
        let session = self.session(session_id)?;
        Self::ensure_owner(&session, listener_id)?;
        let state = &mut *session.state.lock();
        let now = now_ms();
        state.clock.seek(now, position_secs * 1_000);
        state.touch(now);
        Ok(self.broadcast_snapshot(&session, state))
    }

    /// Unilateral owner skip; same semantics as a quorum skip.
    pub fn skip(
        &self,
        session_id: &SessionId,
        listener_id: &ListenerId,
    ) -> Result<SessionSnapshot, SessionError> {
        let session = self.session(session_id)?;
        Self::ensure_owner(&session, listener_id)?;
        let state = &mut *session.state.lock();
        let now = now_ms();
        if state.advance(now, self.config.loop_queue) == Advance::Stalled {
            session
                .hub
                .broadcast(&EventFrame::new(ServerEvent::PlaybackStopped {}));
        }
        state.touch(now);
        Ok(self.broadcast_snapshot(&session, state))
    }

    // -----------------------------------------------------------------
    // Connections & snapshots
    // -----------------------------------------------------------------

    /// Registers a connection and immediately sends it a full snapshot.
    /// The attach happens under the state lock, which serializes every
    /// broadcast, so the snapshot is always the connection's first frame.
    pub fn attach_connection(
        &self,
        session: &Session,
        tx: flume::Sender<axum::extract::ws::Message>,
    ) -> ConnectionId {
        let state = session.state.lock();
        let id = session.hub.attach(tx);
        let snapshot = self.build_snapshot(session, &state);
        session
            .hub
            .send_to(id, &EventFrame::new(ServerEvent::Update(snapshot)));
        id
    }

    /// Polling fallback: same shape as the `update` event.
    pub fn snapshot(&self, session_id: &SessionId) -> Result<SessionSnapshot, SessionError> {
        let session = self.session(session_id)?;
        let state = session.state.lock();
        Ok(self.build_snapshot(&session, &state))
    }

    fn build_snapshot(&self, session: &Session, state: &SessionState) -> SessionSnapshot {
        let current_track = state.current_track().cloned();
        let current_reactions = current_track
            .as_ref()
            .and_then(|t| self.reactions.tally_for(&t.id));
        SessionSnapshot {
            session_id: session.id.clone(),
            playing: state.phase() == Phase::Playing,
            stalled: state.phase() == Phase::Stalled,
            elapsed_secs: state.elapsed_ms(now_ms()) as f64 / 1_000.0,
            current_index: state.current_index,
            current_track,
            current_reactions,
            next_track: state.next_track().cloned(),
            queue: state.queue.clone(),
            listener_count: state.listeners.len(),
            votes: state.pending_skip_votes.len(),
            votes_needed: state.votes_needed(),
        }
    }

    fn broadcast_snapshot(&self, session: &Session, state: &SessionState) -> SessionSnapshot {
        let snapshot = self.build_snapshot(session, state);
        session
            .hub
            .broadcast(&EventFrame::new(ServerEvent::Update(snapshot.clone())));
        snapshot
    }

    // -----------------------------------------------------------------
    // Periodic ticks
    // -----------------------------------------------------------------

    /// Spawns the three independent periodic tasks. Each holds a handle
    /// in `ticks` so `shutdown` can revoke it.
    pub fn spawn_ticks(self: &Arc<Self>) {
        let mut ticks = self.ticks.lock();

        let registry = Arc::clone(self);
        ticks.push(tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(registry.config.advance_tick_secs));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                registry.advance_tick(now_ms());
            }
        }));

        let registry = Arc::clone(self);
        ticks.push(tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(registry.config.presence_sweep_secs));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                registry.presence_tick(now_ms());
            }
        }));

        let registry = Arc::clone(self);
        ticks.push(tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(registry.config.gc_interval_secs));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                registry.gc_tick(now_ms()).await;
            }
        }));
    }

    /// Revokes the tick tasks. Sessions are left in place for the
    /// process to drop.
    pub fn shutdown(&self) {
        info!("Shutting down session registry");
        for handle in self.ticks.lock().drain(..) {
            handle.abort();
        }
    }

    /// Auto-advance: any playing session whose current track has played
    /// out moves on (full snapshot) or stalls (`playback_stopped`).
    pub fn advance_tick(&self, now: u64) {
        for entry in self.sessions.iter() {
            let session = entry.value();
            let state = &mut *session.state.lock();
            if state.phase() != Phase::Playing || !state.current_finished(now) {
                continue;
            }
            match state.advance(now, self.config.loop_queue) {
                Advance::Advanced => {
                    debug!(
                        "Session {} advanced to index {}",
                        session.id, state.current_index
                    );
                    self.broadcast_snapshot(session, state);
                }
                Advance::Stalled => {
                    debug!("Session {} stalled: queue exhausted", session.id);
                    session
                        .hub
                        .broadcast(&EventFrame::new(ServerEvent::PlaybackStopped {}));
                }
            }
        }
    }

    /// Timeout eviction across all sessions, with the same side effects
    /// as an explicit leave.
    pub fn presence_tick(&self, now: u64) {
        let timeout_ms = self.config.heartbeat_timeout_secs * 1_000;
        for entry in self.sessions.iter() {
            let session = entry.value();
            let state = &mut *session.state.lock();
            for removed in state.sweep_stale(now, timeout_ms, self.config.min_credit_secs) {
                info!(
                    "Evicting silent listener {} from session {}",
                    removed.listener.id, session.id
                );
                self.finish_removal(
                    session,
                    removed,
                    Some(LeaveReason::Timeout),
                    state.listeners.len(),
                );
            }
        }
    }

    /// Destroys sessions with no listeners that have been idle past the
    /// retention window, then releases their stored blobs. Deletion
    /// happens only after the session is out of the map, so it can
    /// never race an active reference.
    pub async fn gc_tick(&self, now: u64) {
        let retention_ms = self.config.idle_retention_secs * 1_000;
        let expired: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|entry| {
                let state = entry.value().state.lock();
                state.listeners.is_empty()
                    && now.saturating_sub(state.last_activity_ms) > retention_ms
            })
            .map(|entry| entry.key().clone())
            .collect();

        for id in expired {
            let Some((_, session)) = self.sessions.remove(&id) else {
                continue;
            };
            info!("Destroying idle session: {}", id);
            let refs: Vec<String> = {
                let state = session.state.lock();
                state.queue.iter().map(|t| t.storage_ref.clone()).collect()
            };
            for storage_ref in refs {
                if let Err(e) = self.store.delete(&storage_ref).await {
                    warn!("Failed to delete blob {}: {}", storage_ref, e);
                }
            }
        }
    }
}

fn track_from(resolved: ResolvedTrack) -> Track {
    Track::new(
        resolved.storage_ref,
        TrackInfo {
            title: resolved.title,
            duration_secs: resolved.duration_secs,
            size_bytes: resolved.size_bytes,
            thumbnail: resolved.thumbnail,
            source_url: resolved.source_url,
            uploader: resolved.uploader,
            published: resolved.published,
        },
    )
}
