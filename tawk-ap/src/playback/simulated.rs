//! Clock-driven audio backend
//!
//! Plays nothing audible: each handle advances a virtual position on the
//! tokio clock and reports status at a fixed interval, reaching
//! `did_just_finish` at its configured duration. Serves headless runs and
//! tests (with a paused clock it is fully deterministic).

use super::transport::{AudioBackend, ChannelStatus, HandleId, StatusListener, StatusSubscription};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::trace;

struct SimHandle {
    url: String,
    duration: f64,
    position: f64,
    playing: bool,
    finished: bool,
    listeners: HashMap<u64, Arc<StatusListener>>,
    ticker: Option<JoinHandle<()>>,
}

impl SimHandle {
    fn status(&self) -> ChannelStatus {
        ChannelStatus {
            is_loaded: true,
            duration_seconds: self.duration,
            position_seconds: self.position,
            did_just_finish: self.finished,
        }
    }
}

#[derive(Default)]
struct SimInner {
    next_handle: HandleId,
    next_listener: u64,
    handles: HashMap<HandleId, SimHandle>,
    durations: HashMap<String, f64>,
    failing_create: HashSet<String>,
    failing_play: HashSet<String>,
    /// URL of every accepted play call, in order
    started: Vec<String>,
}

/// In-process backend driven by the tokio clock
pub struct SimulatedBackend {
    inner: Arc<Mutex<SimInner>>,
    status_interval: Duration,
    default_duration: f64,
}

impl SimulatedBackend {
    /// `default_duration` (seconds) applies to URLs without a registered duration
    pub fn new(status_interval: Duration, default_duration: f64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SimInner::default())),
            status_interval,
            default_duration,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SimInner> {
        lock_inner(&self.inner)
    }

    /// Register the clip length for `url`
    pub fn set_duration(&self, url: impl Into<String>, seconds: f64) {
        self.lock().durations.insert(url.into(), seconds);
    }

    /// Make `create` fail for `url`
    pub fn fail_create(&self, url: impl Into<String>) {
        self.lock().failing_create.insert(url.into());
    }

    /// Make `play` fail for handles bound to `url`
    pub fn fail_play(&self, url: impl Into<String>) {
        self.lock().failing_play.insert(url.into());
    }

    /// Handles not yet released, ascending
    pub fn open_handles(&self) -> Vec<HandleId> {
        let mut handles: Vec<HandleId> = self.lock().handles.keys().copied().collect();
        handles.sort_unstable();
        handles
    }

    /// URLs of open handles in handle order
    pub fn open_urls(&self) -> Vec<String> {
        let inner = self.lock();
        let mut entries: Vec<(&HandleId, &SimHandle)> = inner.handles.iter().collect();
        entries.sort_by_key(|(id, _)| **id);
        entries.into_iter().map(|(_, h)| h.url.clone()).collect()
    }

    /// URLs that were successfully started, in order
    pub fn started_urls(&self) -> Vec<String> {
        self.lock().started.clone()
    }

    /// Whether an open handle bound to `url` is currently advancing
    pub fn is_playing_url(&self, url: &str) -> bool {
        self.lock()
            .handles
            .values()
            .any(|h| h.url == url && h.playing)
    }

    /// Virtual position of an open handle
    pub fn position(&self, handle: HandleId) -> Option<f64> {
        self.lock().handles.get(&handle).map(|h| h.position)
    }

    fn spawn_ticker(&self, handle: HandleId) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.inner);
        let period = self.status_interval;
        tokio::spawn(run_ticker(weak, handle, period))
    }
}

fn lock_inner(inner: &Mutex<SimInner>) -> MutexGuard<'_, SimInner> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn run_ticker(weak: Weak<Mutex<SimInner>>, handle: HandleId, period: Duration) {
    // First report one period after creation, like a real player's first update
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let step = period.as_secs_f64();

    loop {
        ticker.tick().await;

        let (status, listeners) = {
            let Some(inner) = weak.upgrade() else { break };
            let mut inner = lock_inner(&inner);
            let Some(h) = inner.handles.get_mut(&handle) else { break };

            if h.playing && !h.finished {
                h.position = (h.position + step).min(h.duration);
                if h.position >= h.duration {
                    h.playing = false;
                    h.finished = true;
                    trace!(handle, url = %h.url, "Simulated clip finished");
                }
            }
            (h.status(), h.listeners.values().cloned().collect::<Vec<_>>())
        };

        for listener in listeners {
            listener(status);
        }
    }
}

#[async_trait]
impl AudioBackend for SimulatedBackend {
    async fn create(&self, url: &str) -> Result<HandleId> {
        let handle = {
            let mut inner = self.lock();
            if inner.failing_create.contains(url) {
                return Err(Error::Transport(format!("cannot load {}", url)));
            }
            inner.next_handle += 1;
            let handle = inner.next_handle;
            let duration = inner.durations.get(url).copied().unwrap_or(self.default_duration);
            inner.handles.insert(
                handle,
                SimHandle {
                    url: url.to_string(),
                    duration,
                    position: 0.0,
                    playing: false,
                    finished: false,
                    listeners: HashMap::new(),
                    ticker: None,
                },
            );
            handle
        };

        let ticker = self.spawn_ticker(handle);
        if let Some(h) = self.lock().handles.get_mut(&handle) {
            h.ticker = Some(ticker);
        }
        Ok(handle)
    }

    fn subscribe(&self, handle: HandleId, listener: StatusListener) -> Result<StatusSubscription> {
        let mut inner = self.lock();
        inner.next_listener += 1;
        let listener_id = inner.next_listener;
        let h = inner
            .handles
            .get_mut(&handle)
            .ok_or_else(|| Error::Transport(format!("unknown handle {}", handle)))?;
        h.listeners.insert(listener_id, Arc::new(listener));

        let weak = Arc::downgrade(&self.inner);
        Ok(StatusSubscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                if let Some(h) = lock_inner(&inner).handles.get_mut(&handle) {
                    h.listeners.remove(&listener_id);
                }
            }
        }))
    }

    async fn play(&self, handle: HandleId) -> Result<()> {
        let mut inner = self.lock();
        let SimInner {
            handles,
            failing_play,
            started,
            ..
        } = &mut *inner;
        let h = handles
            .get_mut(&handle)
            .ok_or_else(|| Error::Transport(format!("unknown handle {}", handle)))?;
        if failing_play.contains(&h.url) {
            return Err(Error::Transport(format!("cannot play {}", h.url)));
        }
        // A finished clip stays at its end until sought
        if !h.finished {
            h.playing = true;
        }
        started.push(h.url.clone());
        Ok(())
    }

    async fn pause(&self, handle: HandleId) -> Result<()> {
        let mut inner = self.lock();
        let h = inner
            .handles
            .get_mut(&handle)
            .ok_or_else(|| Error::Transport(format!("unknown handle {}", handle)))?;
        h.playing = false;
        Ok(())
    }

    async fn seek_to(&self, handle: HandleId, seconds: f64) -> Result<()> {
        let mut inner = self.lock();
        let h = inner
            .handles
            .get_mut(&handle)
            .ok_or_else(|| Error::Transport(format!("unknown handle {}", handle)))?;
        h.position = seconds.clamp(0.0, h.duration.max(0.0));
        if h.position < h.duration {
            h.finished = false;
        }
        Ok(())
    }

    async fn release(&self, handle: HandleId) -> Result<()> {
        let removed = self.lock().handles.remove(&handle);
        match removed {
            Some(h) => {
                if let Some(ticker) = h.ticker {
                    ticker.abort();
                }
                Ok(())
            }
            None => Err(Error::Transport(format!("unknown handle {}", handle))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_clip_runs_to_completion() {
        let backend = SimulatedBackend::new(Duration::from_millis(250), 30.0);
        backend.set_duration("https://cdn/a.m4a", 1.0);

        let handle = backend.create("https://cdn/a.m4a").await.unwrap();
        let last = Arc::new(Mutex::new(ChannelStatus::default()));
        let sink = Arc::clone(&last);
        let _subscription = backend
            .subscribe(handle, Box::new(move |s| *sink.lock().unwrap() = s))
            .unwrap();

        backend.play(handle).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;

        let status = *last.lock().unwrap();
        assert!(status.did_just_finish);
        assert_eq!(status.position_seconds, 1.0);
        assert!(!backend.is_playing_url("https://cdn/a.m4a"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_removed_listener_is_not_called() {
        let backend = SimulatedBackend::new(Duration::from_millis(100), 30.0);
        let handle = backend.create("https://cdn/a.m4a").await.unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let subscription = backend
            .subscribe(handle, Box::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();

        tokio::time::sleep(Duration::from_millis(350)).await;
        subscription.remove();
        let seen = calls.load(Ordering::SeqCst);
        assert!(seen > 0);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(calls.load(Ordering::SeqCst), seen);
    }

    #[tokio::test]
    async fn test_seek_rewinds_finished_clip() {
        let backend = SimulatedBackend::new(Duration::from_millis(250), 10.0);
        let handle = backend.create("https://cdn/a.m4a").await.unwrap();

        backend.seek_to(handle, 50.0).await.unwrap();
        assert_eq!(backend.position(handle), Some(10.0));

        backend.seek_to(handle, 0.0).await.unwrap();
        assert_eq!(backend.position(handle), Some(0.0));
    }

    #[tokio::test]
    async fn test_release_unknown_handle_errors() {
        let backend = SimulatedBackend::new(Duration::from_millis(250), 10.0);
        assert!(backend.release(42).await.is_err());

        let handle = backend.create("https://cdn/a.m4a").await.unwrap();
        backend.release(handle).await.unwrap();
        assert!(backend.play(handle).await.is_err());
        assert!(backend.open_handles().is_empty());
    }

    #[tokio::test]
    async fn test_play_failure_injection() {
        let backend = SimulatedBackend::new(Duration::from_millis(250), 10.0);
        backend.fail_play("https://cdn/mute.m4a");

        let handle = backend.create("https://cdn/mute.m4a").await.unwrap();
        assert!(backend.play(handle).await.is_err());
        assert!(backend.started_urls().is_empty());
    }
}
