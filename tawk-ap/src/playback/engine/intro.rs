//! Intro jingle policy
//!
//! A jingle precedes the main audio of a new parent unless the source
//! suppresses it (`include_intro = false` or merged container output), no
//! intro URL resolves, or the same parent was the last one jingled. The
//! caller is suspended until the jingle completes, the timeout elapses, or a
//! newer intent supersedes it.

use super::core::{PendingParent, PlaybackEngine};
use crate::playback::race::Token;
use crate::playback::transport::{Channel, ChannelStatus};
use tawk_common::events::{JingleOutcome, PlayerEvent};
use tawk_common::PlayableSource;
use tokio::sync::watch;
use tracing::{debug, trace};

impl PlaybackEngine {
    /// Play the intro for `source` (queued at `queue_index`) if policy calls
    /// for one.
    ///
    /// Returns `None` when no jingle was attempted. `TimedOut` is treated by
    /// callers exactly like `Completed`. On `Superseded` the caller must
    /// abandon without touching state.
    pub(super) async fn play_intro_if_needed(
        &self,
        source: &PlayableSource,
        queue_index: usize,
        token: Token,
    ) -> Option<JingleOutcome> {
        if source.intro_suppressed() {
            trace!(source_id = %source.id, "Intro suppressed for source");
            return None;
        }
        let url = source.resolve_intro_url()?.to_string();
        if self.control().last_jingled_id.as_deref() == Some(source.id.as_str()) {
            debug!(source_id = %source.id, "Intro already played for this parent");
            return None;
        }

        let opened = {
            let mut transport = self.transport.lock().await;
            if !self.race.is_current(token) {
                trace!(token, source_id = %source.id, "Intro abandoned: superseded");
                return None;
            }

            {
                let mut control = self.control();
                control.last_jingled_id = Some(source.id.clone());
                control.jingle_playing = true;
                control.jingle_target = Some(PendingParent {
                    source: source.clone(),
                    queue_index,
                });
            }

            match transport.open(Channel::Jingle, &url, token).await {
                Some(opened) => {
                    transport.seek_to(Channel::Jingle, 0.0).await;
                    if transport.play(Channel::Jingle).await {
                        Some(opened)
                    } else {
                        transport.release_if(Channel::Jingle, opened.handle).await;
                        None
                    }
                }
                None => None,
            }
        };

        let outcome = match opened {
            Some(opened) => {
                debug!(source_id = %source.id, url = %url, "Intro jingle started");
                self.state.broadcast_event(PlayerEvent::JingleStarted {
                    source_id: source.id.clone(),
                    url: url.clone(),
                    timestamp: chrono::Utc::now(),
                });

                tokio::select! {
                    finished = wait_for_finish(opened.status) => {
                        if finished { JingleOutcome::Completed } else { JingleOutcome::Cancelled }
                    }
                    _ = tokio::time::sleep(self.settings.jingle_timeout) => JingleOutcome::TimedOut,
                    _ = self.race.superseded(token) => JingleOutcome::Superseded,
                }
            }
            None => JingleOutcome::Cancelled,
        };

        if outcome != JingleOutcome::Superseded && self.race.is_current(token) {
            let mut control = self.control();
            control.jingle_playing = false;
            control.jingle_target = None;
        }

        debug!(source_id = %source.id, "Intro jingle finished: {}", outcome);
        self.state.broadcast_event(PlayerEvent::JingleFinished {
            source_id: source.id.clone(),
            outcome,
            timestamp: chrono::Utc::now(),
        });
        Some(outcome)
    }
}

/// `true` on natural completion, `false` if the channel was released first
async fn wait_for_finish(mut status: watch::Receiver<ChannelStatus>) -> bool {
    status
        .wait_for(|s| s.is_loaded && s.did_just_finish)
        .await
        .is_ok()
}
