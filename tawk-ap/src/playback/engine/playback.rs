//! User playback commands - play, reply, toggle, skip, seek, close, settings

use super::core::{PendingParent, PlaybackEngine};
use crate::error::Result;
use crate::playback::race::Token;
use crate::playback::transport::Channel;
use tawk_common::events::{
    PlayerEvent, QueueChangeTrigger, SessionEndReason, SourceContext, SourceContextType,
};
use tawk_common::PlayableSource;
use tracing::{debug, info, trace};

impl PlaybackEngine {
    /// Replace the autoplay feed; current playback is left alone
    pub async fn set_feed(
        &self,
        sources: Vec<PlayableSource>,
        context_type: SourceContextType,
        context_id: Option<String>,
    ) -> Result<()> {
        self.ensure_running()?;
        let context = SourceContext {
            context_type,
            id: context_id,
        };
        let len = sources.len();
        info!("Feed set: {} sources from {}", len, context.context_type);

        self.state.update(|s| s.set_feed(sources, context.clone())).await;
        self.state.broadcast_event(PlayerEvent::FeedChanged {
            context,
            len,
            timestamp: chrono::Utc::now(),
        });
        Ok(())
    }

    pub async fn set_include_replies(&self, value: bool) -> Result<()> {
        self.ensure_running()?;
        info!("Include replies: {}", value);
        self.state.update(|s| s.set_include_replies(value)).await;
        Ok(())
    }

    pub async fn set_include_autoplay(&self, value: bool) -> Result<()> {
        self.ensure_running()?;
        info!("Include autoplay: {}", value);
        self.state.update(|s| s.set_include_autoplay(value)).await;
        Ok(())
    }

    /// Reserved hook for syncing heard sources to a backend; does nothing yet
    pub async fn refresh_heard(&self) -> Result<()> {
        self.ensure_running()?;
        debug!("refresh_heard: no persistence backend configured");
        Ok(())
    }

    /// Play `source`, or toggle it if it is already current.
    ///
    /// A different source starts a new session: played ids reset to just this
    /// source, the feed index is taken from `feed_index_hint` or the source's
    /// position in the feed, the intro plays if due, then main playback starts
    /// with a one-item queue.
    pub async fn play(&self, source: PlayableSource, feed_index_hint: Option<usize>) -> Result<()> {
        self.ensure_running()?;

        let is_current = self
            .state
            .read(|s| s.current_id() == Some(source.id.as_str()))
            .await;
        if is_current {
            info!(source_id = %source.id, "Play on current source: toggling");
            return self.toggle_play_pause().await;
        }

        info!(source_id = %source.id, "Play command received");
        let token = self.race.issue();
        self.start_new_parent(source, feed_index_hint, token).await;
        Ok(())
    }

    pub(super) async fn start_new_parent(
        &self,
        source: PlayableSource,
        feed_index_hint: Option<usize>,
        token: Token,
    ) {
        if !self.stop_audio_elements_only("play: new parent", token).await {
            return;
        }

        let applied = self
            .state
            .update_if_current(&self.race, token, |s| {
                s.begin_session(&source.id, true);
                if let Some(index) = feed_index_hint.or_else(|| s.position_in_feed(&source.id)) {
                    s.set_feed_index(index);
                }
                // Installed before the intro so replies enqueued meanwhile land here
                s.set_queue_and_current(vec![source.clone()], 0, true);
            })
            .await;
        if applied.is_none() {
            return;
        }

        self.play_intro_if_needed(&source, 0, token).await;
        if !self.race.is_current(token) {
            trace!(token, "New parent abandoned after intro");
            return;
        }

        self.start_main_playback(source, 0, token, QueueChangeTrigger::NewSession)
            .await;
    }

    /// Jump straight into one item (typically a reply) outside feed order.
    ///
    /// Starts a fresh single-item session that never autoplays into the feed.
    pub async fn play_reply(&self, source: PlayableSource) -> Result<()> {
        self.ensure_running()?;
        info!(source_id = %source.id, "Play reply command received");

        let token = self.race.issue();
        if !self.stop_audio_elements_only("play reply", token).await {
            return Ok(());
        }

        let applied = self
            .state
            .update_if_current(&self.race, token, |s| {
                s.begin_session(&source.id, false);
                s.set_queue_and_current(vec![source.clone()], 0, true);
            })
            .await;
        if applied.is_none() {
            return Ok(());
        }

        self.play_intro_if_needed(&source, 0, token).await;
        if !self.race.is_current(token) {
            trace!(token, "Reply abandoned after intro");
            return Ok(());
        }

        self.start_main_playback(source, 0, token, QueueChangeTrigger::NewSession)
            .await;
        Ok(())
    }

    /// Toggle between playing and paused.
    ///
    /// - jingle in flight: cancel it and remember what it was introducing
    /// - paused with a remembered parent: start that parent's main audio
    /// - otherwise pause or resume the main channel, rewinding a finished clip
    pub async fn toggle_play_pause(&self) -> Result<()> {
        self.ensure_running()?;
        info!("Toggle play/pause command received");

        let mut transport = self.transport.lock().await;

        let jingle_playing = self.control().jingle_playing;
        if jingle_playing {
            // Invalidate the continuation waiting on this jingle
            self.race.issue();
            let fallback = self
                .state
                .read(|s| {
                    s.current().map(|current| PendingParent {
                        source: current.clone(),
                        queue_index: s.queue_index(),
                    })
                })
                .await;
            {
                let mut control = self.control();
                control.jingle_playing = false;
                control.pending_parent = control.jingle_target.take().or(fallback);
            }
            transport.release(Channel::Jingle).await;
            self.state.update(|s| s.set_playing(false)).await;
            debug!("Jingle cancelled, parent pending");
            return Ok(());
        }

        let is_playing = self.state.read(|s| s.is_playing()).await;
        let pending = if is_playing {
            None
        } else {
            self.control().pending_parent.take()
        };

        if let Some(pending) = pending {
            let token = self.race.issue();
            drop(transport);
            debug!("Resuming pending parent");
            self.start_main_playback(
                pending.source,
                pending.queue_index,
                token,
                QueueChangeTrigger::UserJump,
            )
            .await;
            return Ok(());
        }

        if is_playing {
            transport.pause(Channel::Main).await;
            self.state.update(|s| s.set_playing(false)).await;
        } else {
            if transport
                .last_status(Channel::Main)
                .is_some_and(|status| status.at_end())
            {
                transport.seek_to(Channel::Main, 0.0).await;
            }
            // Resume is a new intent: its completion advances under this token
            let token = self.race.issue();
            transport.adopt(Channel::Main, token);
            let started = transport.play(Channel::Main).await;
            self.state
                .update(|s| {
                    if started {
                        s.resume_session();
                    }
                    s.set_playing(started);
                })
                .await;
        }
        Ok(())
    }

    /// Advance to the next queue item, or to the next feed item as a new parent
    pub async fn skip(&self) -> Result<()> {
        self.ensure_running()?;
        info!("Skip command received");

        let token = self.race.issue();
        if !self.stop_all_audio("skip", token).await {
            return Ok(());
        }

        let (next_in_queue, next_in_feed) = self
            .state
            .read(|s| {
                let in_queue = s
                    .next_queue_item()
                    .map(|(index, source)| (source.clone(), index));
                let feed_index = s.feed_index() + 1;
                let in_feed = s
                    .feed_list()
                    .get(feed_index)
                    .cloned()
                    .map(|source| (feed_index, source));
                (in_queue, in_feed)
            })
            .await;

        if let Some((source, index)) = next_in_queue {
            // Queue items after the first never get a jingle on skip
            self.start_main_playback(source, index, token, QueueChangeTrigger::UserJump)
                .await;
            return Ok(());
        }

        if let Some((feed_index, source)) = next_in_feed {
            let applied = self
                .state
                .update_if_current(&self.race, token, |s| s.set_feed_index(feed_index))
                .await;
            if applied.is_some() {
                self.start_new_parent(source, Some(feed_index), token).await;
            }
        } else {
            debug!("Skip: nothing after the current item");
        }
        Ok(())
    }

    /// Seek the main channel to `percent` (clamped to 0..=100) of its duration.
    ///
    /// No-op until the main channel has reported a duration. Progress is
    /// updated right away rather than waiting for the next status.
    pub async fn seek(&self, percent: f64) -> Result<()> {
        self.ensure_running()?;
        let percent = if percent.is_nan() {
            0.0
        } else {
            percent.clamp(0.0, 100.0)
        };
        info!("Seek command received: {:.1}%", percent);

        let transport = self.transport.lock().await;
        let Some(status) = transport.last_status(Channel::Main) else {
            debug!("Seek ignored: main channel not open");
            return Ok(());
        };
        if !status.is_loaded || status.duration_seconds <= 0.0 {
            debug!("Seek ignored: duration unknown");
            return Ok(());
        }

        let duration = status.duration_seconds;
        let seconds = (percent / 100.0 * duration).clamp(0.0, duration);
        if !transport.seek_to(Channel::Main, seconds).await {
            return Ok(());
        }
        drop(transport);

        self.state
            .update(|s| s.set_progress(percent, seconds, duration))
            .await;
        Ok(())
    }

    /// Stop everything and end the session; the mini player disappears
    pub async fn close(&self) -> Result<()> {
        self.ensure_running()?;
        info!("Close command received");

        let token = self.race.issue();
        {
            let mut transport = self.transport.lock().await;
            if !self.race.is_current(token) {
                trace!(token, "Close superseded by a newer command");
                return Ok(());
            }
            self.control().clear_jingle();
            transport.release_all().await;
        }

        let applied = self
            .state
            .update_if_current(&self.race, token, |s| {
                s.end_session();
                s.reset_playback_ui();
                s.clear_queue();
            })
            .await;

        if applied.is_some() {
            self.emit_session_ended(SessionEndReason::Closed);
            self.emit_queue_cleared();
        }
        Ok(())
    }
}
