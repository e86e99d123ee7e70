//! Core playback engine - lifecycle and shared orchestration steps
//!
//! **Responsibilities:**
//! - PlaybackEngine struct definition and initialization
//! - Lifecycle (start the finish watcher, shutdown)
//! - Main playback start and the stop helpers every command builds on
//! - Progress relay from the main channel into session state

use crate::error::{Error, Result};
use crate::playback::finish_watcher::FinishWatcher;
use crate::playback::race::{RaceToken, Token};
use crate::playback::session::{SessionSnapshot, SessionState};
use crate::playback::transport::{AudioBackend, Channel, ChannelStatus, Transport};
use crate::state::SharedState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tawk_common::events::{PlayerEvent, QueueChangeTrigger, SessionEndReason};
use tawk_common::human_time::format_clock;
use tawk_common::PlayableSource;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, trace, warn};

/// Engine tuning, built from the `[playback]` config section
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Longest wait for an intro jingle; expiry counts as completion
    pub jingle_timeout: Duration,
    /// Finish watcher period
    pub finish_poll_interval: Duration,
    pub include_replies: bool,
    pub include_autoplay: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            jingle_timeout: Duration::from_secs(10),
            finish_poll_interval: Duration::from_millis(200),
            include_replies: true,
            include_autoplay: false,
        }
    }
}

/// Queue item to start once a cancelled jingle is resumed
#[derive(Debug, Clone)]
pub(super) struct PendingParent {
    pub(super) source: PlayableSource,
    pub(super) queue_index: usize,
}

/// Orchestrator-private bookkeeping
///
/// Guarded by a std mutex; never held across an await.
#[derive(Debug, Default)]
pub(super) struct ControlState {
    /// Captured when a jingle is cancelled by pause; resume starts it
    pub(super) pending_parent: Option<PendingParent>,
    /// What the in-flight jingle is introducing
    pub(super) jingle_target: Option<PendingParent>,
    /// Only the immediately preceding jingle is deduplicated
    pub(super) last_jingled_id: Option<String>,
    pub(super) jingle_playing: bool,
}

impl ControlState {
    /// Forget jingle and pending-parent bookkeeping
    pub(super) fn clear_jingle(&mut self) {
        self.pending_parent = None;
        self.jingle_target = None;
        self.jingle_playing = false;
    }
}

/// Global audio playback orchestrator
///
/// Sole writer of the session state and sole owner of the two transport
/// channels.
pub struct PlaybackEngine {
    pub(super) state: Arc<SharedState>,

    /// Serializes every channel operation
    pub(super) transport: tokio::sync::Mutex<Transport>,

    pub(super) race: RaceToken,

    pub(super) control: Mutex<ControlState>,

    pub(super) settings: EngineSettings,

    shut_down: AtomicBool,

    watcher: Mutex<Option<FinishWatcher>>,
}

impl PlaybackEngine {
    /// Create an engine over `backend` with a fresh session
    pub fn new(backend: Arc<dyn AudioBackend>, settings: EngineSettings) -> Self {
        let session = SessionState::new(settings.include_replies, settings.include_autoplay);
        Self {
            state: Arc::new(SharedState::with_session(session)),
            transport: tokio::sync::Mutex::new(Transport::new(backend)),
            race: RaceToken::new(),
            control: Mutex::new(ControlState::default()),
            settings,
            shut_down: AtomicBool::new(false),
            watcher: Mutex::new(None),
        }
    }

    /// Start the finish watcher
    ///
    /// Calling twice replaces the running watcher.
    pub fn start(self: &Arc<Self>) {
        let watcher = FinishWatcher::spawn(Arc::downgrade(self), self.settings.finish_poll_interval);
        if let Some(previous) = lock(&self.watcher).replace(watcher) {
            previous.stop();
        }
        info!(
            "Playback engine started (finish poll every {}ms)",
            self.settings.finish_poll_interval.as_millis()
        );
    }

    /// Teardown: stop the watcher, invalidate in-flight work and release
    /// both channels. Later commands fail with `EngineShutDown`.
    pub async fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }
        info!("Shutting down playback engine");

        if let Some(watcher) = lock(&self.watcher).take() {
            watcher.stop();
        }

        self.race.issue();
        self.control().clear_jingle();
        self.transport.lock().await.release_all().await;

        self.state
            .update(|s| {
                s.end_session();
                s.reset_playback_ui();
            })
            .await;
        self.emit_session_ended(SessionEndReason::Shutdown);
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    pub(super) fn ensure_running(&self) -> Result<()> {
        if self.is_shut_down() {
            Err(Error::EngineShutDown)
        } else {
            Ok(())
        }
    }

    pub fn state(&self) -> Arc<SharedState> {
        Arc::clone(&self.state)
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.state.snapshot().await
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<PlayerEvent> {
        self.state.subscribe_events()
    }

    pub(super) fn control(&self) -> MutexGuard<'_, ControlState> {
        lock(&self.control)
    }

    /// Hand out a main-channel completion at most once (finish watcher entry).
    ///
    /// Returns the token of the intent that owns the finished handle; the
    /// advance runs under that token and nothing newer.
    pub(crate) async fn take_main_finish(&self) -> Option<Token> {
        let (status, owner) = self.transport.lock().await.take_finished(Channel::Main)?;
        trace!(owner, "Main finished at {}", format_clock(status.position_seconds));
        Some(owner)
    }

    /// Pause both channels and drop jingle bookkeeping; session state is untouched.
    ///
    /// Returns `false` (and does nothing) once `token` has been superseded, so
    /// a late continuation cannot pause audio a newer intent started.
    pub(super) async fn stop_audio_elements_only(&self, reason: &str, token: Token) -> bool {
        let transport = self.transport.lock().await;
        if !self.race.is_current(token) {
            trace!(token, "Stop ({}) skipped: superseded", reason);
            return false;
        }
        debug!("Stopping audio elements: {}", reason);
        self.control().clear_jingle();
        transport.pause(Channel::Jingle).await;
        transport.pause(Channel::Main).await;
        true
    }

    /// `stop_audio_elements_only` plus a paused, zeroed play state
    pub(super) async fn stop_all_audio(&self, reason: &str, token: Token) -> bool {
        if !self.stop_audio_elements_only(reason, token).await {
            return false;
        }
        self.state
            .update_if_current(&self.race, token, |s| s.reset_playback_ui())
            .await
            .is_some()
    }

    /// Open and start the main channel on `source`, queued at `index`.
    ///
    /// Token is re-checked under the transport lock before the jingle is
    /// stopped and the main channel opened, and again (under the session lock)
    /// before state is applied. A continuation that lost the race releases
    /// only the handle it opened itself. The live queue is kept, so items
    /// enqueued while an intro played survive. Failure to open or play leaves
    /// the item current with `is_playing = false`.
    pub(super) async fn start_main_playback(
        &self,
        source: PlayableSource,
        index: usize,
        token: Token,
        trigger: QueueChangeTrigger,
    ) {
        let mut transport = self.transport.lock().await;
        if !self.race.is_current(token) {
            trace!(token, source_id = %source.id, "Main start abandoned: superseded");
            return;
        }

        transport.release(Channel::Jingle).await;
        {
            let mut control = self.control();
            control.jingle_playing = false;
            control.jingle_target = None;
        }

        let opened = transport.open(Channel::Main, &source.audio_url, token).await;
        let started = match &opened {
            Some(_) => {
                transport.seek_to(Channel::Main, 0.0).await;
                transport.play(Channel::Main).await
            }
            None => false,
        };

        let applied = self
            .state
            .update_if_current(&self.race, token, |s| {
                s.focus_queue_item(source.clone(), index, started);
                let ids: Vec<String> = s.queue().iter().map(|q| q.id.clone()).collect();
                (ids, s.queue_index())
            })
            .await;

        let Some((queue_ids, queue_index)) = applied else {
            if let Some(opened) = &opened {
                transport.release_if(Channel::Main, opened.handle).await;
            }
            trace!(token, source_id = %source.id, "Main start abandoned after open");
            return;
        };
        drop(transport);

        if let Some(opened) = opened {
            self.spawn_progress_relay(source.id.clone(), opened.status);
        }

        if started {
            info!(
                source_id = %source.id,
                queue_index,
                queue_len = queue_ids.len(),
                "Main playback started"
            );
            self.state.broadcast_event(PlayerEvent::SourceStarted {
                source_id: source.id.clone(),
                queue_index,
                timestamp: chrono::Utc::now(),
            });
        } else {
            warn!(source_id = %source.id, "Main playback did not start");
        }

        self.state.broadcast_event(PlayerEvent::QueueChanged {
            queue: queue_ids,
            queue_index,
            trigger,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Copy main-channel status into session progress while `source_id` is current
    ///
    /// Ends by itself once the handle is released (its status sender drops).
    fn spawn_progress_relay(&self, source_id: String, mut status: watch::Receiver<ChannelStatus>) {
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let mut last = ChannelStatus::default();
            while status.changed().await.is_ok() {
                let current = *status.borrow_and_update();
                if !current.is_loaded || current.duration_seconds <= 0.0 || current == last {
                    continue;
                }
                last = current;

                let percent = current.position_seconds / current.duration_seconds * 100.0;
                let applied = state
                    .update(|s| {
                        if s.current_id() == Some(source_id.as_str()) {
                            s.set_progress(percent, current.position_seconds, current.duration_seconds);
                            true
                        } else {
                            false
                        }
                    })
                    .await;
                if !applied {
                    continue;
                }

                trace!(
                    source_id = %source_id,
                    "Progress {} / {}",
                    format_clock(current.position_seconds),
                    format_clock(current.duration_seconds)
                );
                state.broadcast_event(PlayerEvent::PlaybackProgress {
                    source_id: source_id.clone(),
                    progress_percent: percent.clamp(0.0, 100.0),
                    position_seconds: current.position_seconds,
                    duration_seconds: current.duration_seconds,
                    timestamp: chrono::Utc::now(),
                });
            }
        });
    }

    pub(super) fn emit_session_ended(&self, reason: SessionEndReason) {
        info!("Session ended: {}", reason);
        self.state.broadcast_event(PlayerEvent::SessionEnded {
            reason,
            timestamp: chrono::Utc::now(),
        });
    }

    pub(super) fn emit_queue_cleared(&self) {
        self.state.broadcast_event(PlayerEvent::QueueChanged {
            queue: Vec::new(),
            queue_index: 0,
            trigger: QueueChangeTrigger::Cleared,
            timestamp: chrono::Utc::now(),
        });
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::simulated::SimulatedBackend;

    fn engine() -> (Arc<PlaybackEngine>, Arc<SimulatedBackend>) {
        let backend = Arc::new(SimulatedBackend::new(Duration::from_millis(250), 30.0));
        let engine = Arc::new(PlaybackEngine::new(backend.clone(), EngineSettings::default()));
        (engine, backend)
    }

    #[tokio::test]
    async fn test_settings_seed_session_toggles() {
        let backend = Arc::new(SimulatedBackend::new(Duration::from_millis(250), 30.0));
        let settings = EngineSettings {
            include_autoplay: true,
            include_replies: false,
            ..EngineSettings::default()
        };
        let engine = PlaybackEngine::new(backend, settings);

        let snapshot = engine.snapshot().await;
        assert!(snapshot.include_autoplay);
        assert!(!snapshot.include_replies);
    }

    #[tokio::test]
    async fn test_start_main_playback_applies_queue() {
        let (engine, backend) = engine();
        let token = engine.race.issue();
        let queue = vec![
            PlayableSource::new("a", "https://cdn/a.m4a"),
            PlayableSource::new("b", "https://cdn/b.m4a"),
        ];
        let second = queue[1].clone();
        engine
            .state
            .update(|s| s.set_queue_and_current(queue, 0, false))
            .await;

        engine
            .start_main_playback(second, 1, token, QueueChangeTrigger::UserJump)
            .await;

        let snapshot = engine.snapshot().await;
        assert_eq!(snapshot.current.unwrap().id, "b");
        assert_eq!(snapshot.queue_index, 1);
        assert!(snapshot.is_playing);
        assert_eq!(backend.open_urls(), vec!["https://cdn/b.m4a".to_string()]);
    }

    #[tokio::test]
    async fn test_stale_token_does_not_open_main() {
        let (engine, backend) = engine();
        let stale = engine.race.issue();
        engine.race.issue();

        engine
            .start_main_playback(
                PlayableSource::new("a", "https://cdn/a.m4a"),
                0,
                stale,
                QueueChangeTrigger::NewSession,
            )
            .await;

        assert!(backend.open_handles().is_empty());
        assert!(engine.snapshot().await.current.is_none());
    }

    #[tokio::test]
    async fn test_unloadable_source_stays_current_but_paused() {
        let (engine, backend) = engine();
        backend.fail_create("https://cdn/broken.m4a");
        let token = engine.race.issue();

        engine
            .start_main_playback(
                PlayableSource::new("a", "https://cdn/broken.m4a"),
                0,
                token,
                QueueChangeTrigger::NewSession,
            )
            .await;

        let snapshot = engine.snapshot().await;
        assert_eq!(snapshot.current.unwrap().id, "a");
        assert!(!snapshot.is_playing);
    }

    #[tokio::test]
    async fn test_commands_fail_after_shutdown() {
        let (engine, backend) = engine();
        engine.start();

        let token = engine.race.issue();
        engine
            .start_main_playback(
                PlayableSource::new("a", "https://cdn/a.m4a"),
                0,
                token,
                QueueChangeTrigger::NewSession,
            )
            .await;

        engine.shutdown().await;
        assert!(backend.open_handles().is_empty());
        assert!(matches!(engine.toggle_play_pause().await, Err(Error::EngineShutDown)));

        // Second shutdown is a no-op
        engine.shutdown().await;
    }
}
