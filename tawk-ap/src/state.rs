//! Shared playback state
//!
//! Thread-safe container for the session state plus the event bus. The
//! engine is the single writer; API handlers and observers only read
//! snapshots or subscribe to events.

use crate::playback::race::{RaceToken, Token};
use crate::playback::session::{SessionSnapshot, SessionState};
use tawk_common::events::{EventBus, PlayerEvent};
use tokio::sync::{broadcast, RwLock};
use tracing::trace;

/// Events buffered per subscriber before the oldest are dropped
const EVENT_CAPACITY: usize = 100;

/// Shared state accessible by all components
///
/// Uses RwLock for concurrent read access with rare writes. Never hold the
/// lock across transport calls.
pub struct SharedState {
    session: RwLock<SessionState>,
    events: EventBus,
}

impl SharedState {
    /// Create new shared state with default session toggles
    pub fn new() -> Self {
        Self::with_session(SessionState::default())
    }

    pub fn with_session(session: SessionState) -> Self {
        Self {
            session: RwLock::new(session),
            events: EventBus::new(EVENT_CAPACITY),
        }
    }

    /// Broadcast an event to all listeners (no receivers is OK)
    pub fn broadcast_event(&self, event: PlayerEvent) {
        self.events.emit_lossy(event);
    }

    /// Subscribe to the event stream
    pub fn subscribe_events(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.session.read().await.snapshot()
    }

    /// Run a read-only closure against the session
    pub async fn read<R>(&self, f: impl FnOnce(&SessionState) -> R) -> R {
        f(&*self.session.read().await)
    }

    /// Mutate the session.
    ///
    /// Emits `PlaybackStateChanged` when the play flag flips.
    pub async fn update<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let (result, old_playing, new_playing) = {
            let mut session = self.session.write().await;
            let old_playing = session.is_playing();
            let result = f(&mut session);
            (result, old_playing, session.is_playing())
        };
        self.notify_play_flag(old_playing, new_playing);
        result
    }

    /// Mutate the session only if `token` is still the latest.
    ///
    /// The check happens under the write lock, so a newer intent that has
    /// already been issued can never be overwritten by this continuation.
    pub async fn update_if_current<R>(
        &self,
        race: &RaceToken,
        token: Token,
        f: impl FnOnce(&mut SessionState) -> R,
    ) -> Option<R> {
        let (result, old_playing, new_playing) = {
            let mut session = self.session.write().await;
            if !race.is_current(token) {
                trace!(token, latest = race.current(), "Stale intent, state untouched");
                return None;
            }
            let old_playing = session.is_playing();
            let result = f(&mut session);
            (result, old_playing, session.is_playing())
        };
        self.notify_play_flag(old_playing, new_playing);
        Some(result)
    }

    fn notify_play_flag(&self, old_playing: bool, new_playing: bool) {
        if old_playing != new_playing {
            self.broadcast_event(PlayerEvent::PlaybackStateChanged {
                old_state: tawk_common::events::PlaybackState::from_playing(old_playing),
                new_state: tawk_common::events::PlaybackState::from_playing(new_playing),
                timestamp: chrono::Utc::now(),
            });
        }
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}
