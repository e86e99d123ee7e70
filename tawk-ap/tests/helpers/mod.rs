//! Shared test infrastructure for tawk-ap integration tests
//!
//! Builds an engine over the simulated backend. Tests run with a paused
//! tokio clock so clip lengths and jingle timeouts elapse instantly.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;
use tawk_ap::playback::session::SessionSnapshot;
use tawk_ap::playback::{EngineSettings, PlaybackEngine, SimulatedBackend};
use tawk_common::events::PlayerEvent;
use tawk_common::{Author, PlayableSource};
use tokio::sync::broadcast;

pub const STATUS_INTERVAL: Duration = Duration::from_millis(250);

pub struct Harness {
    pub engine: Arc<PlaybackEngine>,
    pub backend: Arc<SimulatedBackend>,
    pub events: broadcast::Receiver<PlayerEvent>,
}

impl Harness {
    pub fn new(settings: EngineSettings) -> Self {
        let backend = Arc::new(SimulatedBackend::new(STATUS_INTERVAL, 30.0));
        let engine = Arc::new(PlaybackEngine::new(backend.clone(), settings));
        let events = engine.subscribe_events();
        engine.start();
        Self {
            engine,
            backend,
            events,
        }
    }

    pub fn with_autoplay() -> Self {
        Self::new(EngineSettings {
            include_autoplay: true,
            ..EngineSettings::default()
        })
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.engine.snapshot().await
    }

    pub fn current_id(snapshot: &SessionSnapshot) -> Option<&str> {
        snapshot.current.as_ref().map(|s| s.id.as_str())
    }

    /// Poll the snapshot until `pred` holds or `limit` of (virtual) time passes
    pub async fn wait_until(
        &self,
        limit: Duration,
        pred: impl Fn(&SessionSnapshot) -> bool,
    ) -> bool {
        let deadline = tokio::time::Instant::now() + limit;
        loop {
            if pred(&self.engine.snapshot().await) {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    /// Events received so far
    pub fn drain_events(&mut self) -> Vec<PlayerEvent> {
        let mut events = Vec::new();
        loop {
            match self.events.try_recv() {
                Ok(event) => events.push(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return events,
            }
        }
    }

    /// Number of play calls the backend accepted for `url`
    pub fn started_count(&self, url: &str) -> usize {
        self.backend
            .started_urls()
            .iter()
            .filter(|u| u.as_str() == url)
            .count()
    }

    /// Open handles bound to main audio (anything that is not a signature clip)
    pub fn open_main_urls(&self) -> Vec<String> {
        self.backend
            .open_urls()
            .into_iter()
            .filter(|u| !u.contains("/sig-"))
            .collect()
    }

    pub fn open_jingle_urls(&self) -> Vec<String> {
        self.backend
            .open_urls()
            .into_iter()
            .filter(|u| u.contains("/sig-"))
            .collect()
    }
}

pub fn audio_url(id: &str) -> String {
    format!("https://cdn/{}.m4a", id)
}

pub fn signature_url(author: &str) -> String {
    format!("https://cdn/sig-{}.m4a", author)
}

/// Source with no intro
pub fn source(id: &str) -> PlayableSource {
    PlayableSource::new(id, audio_url(id))
}

/// Source whose author has a signature clip
pub fn signed(id: &str, author: &str) -> PlayableSource {
    source(id).with_author(Author {
        id: author.to_string(),
        display_name: author.to_string(),
        signature_url: Some(signature_url(author)),
    })
}

pub fn ids(sources: &[PlayableSource]) -> Vec<String> {
    sources.iter().map(|s| s.id.clone()).collect()
}
