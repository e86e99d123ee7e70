//! Two-channel audio transport
//!
//! Wraps an [`AudioBackend`] with exactly two single-occupancy channels:
//! `Main` for the clip itself and `Jingle` for the short intro overlay.
//! Opening a channel first releases whatever occupied it.
//!
//! Every operation other than `open` is best-effort: backend failures are
//! logged and reported as `false`/`None`, never propagated. Callers decide
//! what "did not start" means for their state.

use crate::error::Result;
use crate::playback::race::Token;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, trace, warn};

/// Backend-assigned audio handle
pub type HandleId = u64;

/// Status notification delivered by a backend handle
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ChannelStatus {
    pub is_loaded: bool,
    pub duration_seconds: f64,
    pub position_seconds: f64,
    /// Reached the end of the clip; stays set until the handle is replayed or sought
    pub did_just_finish: bool,
}

impl ChannelStatus {
    /// Position has reached the known duration
    pub fn at_end(&self) -> bool {
        self.is_loaded && self.duration_seconds > 0.0 && self.position_seconds >= self.duration_seconds
    }
}

/// Observer invoked for every status notification of one handle
pub type StatusListener = Box<dyn Fn(ChannelStatus) + Send + Sync>;

/// Dispose handle for a status listener
///
/// Call [`StatusSubscription::remove`] to detach. Dropping the subscription
/// detaches as well.
pub struct StatusSubscription {
    remove: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl StatusSubscription {
    pub fn new(remove: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            remove: Some(Box::new(remove)),
        }
    }

    /// Detach the listener
    pub fn remove(mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl Drop for StatusSubscription {
    fn drop(&mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl std::fmt::Debug for StatusSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusSubscription")
            .field("attached", &self.remove.is_some())
            .finish()
    }
}

/// Native audio player abstraction
///
/// One handle plays one URL. Implementations must tolerate calls on handles
/// that were already released by returning an error.
#[async_trait]
pub trait AudioBackend: Send + Sync {
    /// Allocate a handle bound to `url`
    async fn create(&self, url: &str) -> Result<HandleId>;

    /// Attach a status observer to a handle
    fn subscribe(&self, handle: HandleId, listener: StatusListener) -> Result<StatusSubscription>;

    async fn play(&self, handle: HandleId) -> Result<()>;

    async fn pause(&self, handle: HandleId) -> Result<()>;

    async fn seek_to(&self, handle: HandleId, seconds: f64) -> Result<()>;

    /// Free the handle's native resources
    async fn release(&self, handle: HandleId) -> Result<()>;
}

/// Transport channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Main,
    Jingle,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Main => write!(f, "main"),
            Channel::Jingle => write!(f, "jingle"),
        }
    }
}

/// Result of a successful `open`
#[derive(Debug)]
pub struct OpenedChannel {
    pub handle: HandleId,
    /// Latest status of the new handle; closes when the handle is released
    pub status: watch::Receiver<ChannelStatus>,
}

#[derive(Default)]
struct ChannelSlot {
    handle: Option<HandleId>,
    subscription: Option<StatusSubscription>,
    status: Option<watch::Receiver<ChannelStatus>>,
    /// Intent that opened (or last resumed) the handle
    owner: Option<Token>,
    /// Completion of the current status was already handed out
    finish_acknowledged: bool,
}

/// Owner of the main and jingle channels
pub struct Transport {
    backend: Arc<dyn AudioBackend>,
    main: ChannelSlot,
    jingle: ChannelSlot,
}

impl Transport {
    pub fn new(backend: Arc<dyn AudioBackend>) -> Self {
        Self {
            backend,
            main: ChannelSlot::default(),
            jingle: ChannelSlot::default(),
        }
    }

    fn slot(&self, channel: Channel) -> &ChannelSlot {
        match channel {
            Channel::Main => &self.main,
            Channel::Jingle => &self.jingle,
        }
    }

    fn slot_mut(&mut self, channel: Channel) -> &mut ChannelSlot {
        match channel {
            Channel::Main => &mut self.main,
            Channel::Jingle => &mut self.jingle,
        }
    }

    /// Open `url` on `channel` on behalf of `owner`, releasing the previous
    /// occupant first.
    ///
    /// Returns `None` for an empty URL (nothing to play) or when the backend
    /// cannot create a handle. A handle whose listener cannot be attached is
    /// still kept.
    pub async fn open(&mut self, channel: Channel, url: &str, owner: Token) -> Option<OpenedChannel> {
        self.release(channel).await;

        if url.is_empty() {
            debug!(%channel, "Empty URL, nothing to open");
            return None;
        }

        let handle = match self.backend.create(url).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!(%channel, url, "Failed to create audio handle: {}", e);
                return None;
            }
        };

        let (status_tx, status_rx) = watch::channel(ChannelStatus::default());
        let listener: StatusListener = Box::new(move |status| {
            let _ = status_tx.send(status);
        });
        let subscription = match self.backend.subscribe(handle, listener) {
            Ok(subscription) => Some(subscription),
            Err(e) => {
                warn!(%channel, handle, "Failed to attach status listener: {}", e);
                None
            }
        };

        let slot = self.slot_mut(channel);
        slot.handle = Some(handle);
        slot.subscription = subscription;
        slot.status = Some(status_rx.clone());
        slot.owner = Some(owner);
        slot.finish_acknowledged = false;

        debug!(%channel, handle, url, "Opened channel");
        Some(OpenedChannel {
            handle,
            status: status_rx,
        })
    }

    /// Detach, pause, rewind and free the channel's handle (if any)
    pub async fn release(&mut self, channel: Channel) {
        let backend = Arc::clone(&self.backend);
        let slot = self.slot_mut(channel);
        let Some(handle) = slot.handle.take() else {
            return;
        };

        if let Some(subscription) = slot.subscription.take() {
            subscription.remove();
        }
        slot.status = None;
        slot.owner = None;
        slot.finish_acknowledged = false;

        if let Err(e) = backend.pause(handle).await {
            trace!(%channel, handle, "Pause during release failed: {}", e);
        }
        if let Err(e) = backend.seek_to(handle, 0.0).await {
            trace!(%channel, handle, "Rewind during release failed: {}", e);
        }
        if let Err(e) = backend.release(handle).await {
            warn!(%channel, handle, "Failed to release audio handle: {}", e);
        }
        debug!(%channel, handle, "Released channel");
    }

    /// Release only if `handle` still occupies the channel
    pub async fn release_if(&mut self, channel: Channel, handle: HandleId) -> bool {
        if self.handle(channel) == Some(handle) {
            self.release(channel).await;
            true
        } else {
            false
        }
    }

    pub async fn release_all(&mut self) {
        self.release(Channel::Jingle).await;
        self.release(Channel::Main).await;
    }

    /// Start or resume the channel; `false` if nothing is open or the backend failed
    pub async fn play(&self, channel: Channel) -> bool {
        let Some(handle) = self.handle(channel) else {
            return false;
        };
        match self.backend.play(handle).await {
            Ok(()) => true,
            Err(e) => {
                warn!(%channel, handle, "Play failed: {}", e);
                false
            }
        }
    }

    /// Pause the channel if open
    pub async fn pause(&self, channel: Channel) {
        if let Some(handle) = self.handle(channel) {
            if let Err(e) = self.backend.pause(handle).await {
                warn!(%channel, handle, "Pause failed: {}", e);
            }
        }
    }

    pub async fn seek_to(&self, channel: Channel, seconds: f64) -> bool {
        let Some(handle) = self.handle(channel) else {
            return false;
        };
        match self.backend.seek_to(handle, seconds).await {
            Ok(()) => true,
            Err(e) => {
                warn!(%channel, handle, seconds, "Seek failed: {}", e);
                false
            }
        }
    }

    pub fn handle(&self, channel: Channel) -> Option<HandleId> {
        self.slot(channel).handle
    }

    /// Hand an open handle over to a newer intent (e.g. a user resume)
    pub fn adopt(&mut self, channel: Channel, owner: Token) {
        let slot = self.slot_mut(channel);
        if slot.handle.is_some() {
            slot.owner = Some(owner);
        }
    }

    pub fn owner(&self, channel: Channel) -> Option<Token> {
        self.slot(channel).owner
    }

    pub fn is_open(&self, channel: Channel) -> bool {
        self.handle(channel).is_some()
    }

    /// Last status reported by the channel's handle
    pub fn last_status(&self, channel: Channel) -> Option<ChannelStatus> {
        self.slot(channel).status.as_ref().map(|rx| *rx.borrow())
    }

    /// Hand out a completion of the channel at most once.
    ///
    /// Returns the finished status and the intent that owns the handle the
    /// first time it is observed; later calls return `None` until the handle
    /// reports an unfinished status again.
    pub fn take_finished(&mut self, channel: Channel) -> Option<(ChannelStatus, Token)> {
        let status = self.last_status(channel)?;
        let slot = self.slot_mut(channel);

        if !status.is_loaded || !status.did_just_finish {
            slot.finish_acknowledged = false;
            return None;
        }
        if slot.finish_acknowledged {
            return None;
        }
        let owner = slot.owner?;
        slot.finish_acknowledged = true;
        Some((status, owner))
    }
}
