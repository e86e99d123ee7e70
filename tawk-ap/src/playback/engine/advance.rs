//! Advance on finish
//!
//! Entered by the finish watcher once per main-channel completion. In order:
//! next queue item (with its intro if due), else end the session when
//! autoplay is off (or the session did not come from the feed), else the
//! next unplayed feed item, else end of feed.
//!
//! Runs under the token of the intent that owns the finished handle. If a
//! newer intent exists the completion is stale and nothing happens; one
//! issued later makes every remaining step a no-op.

use super::core::PlaybackEngine;
use crate::playback::race::Token;
use tawk_common::events::{PlayerEvent, QueueChangeTrigger, SessionEndReason};
use tawk_common::PlayableSource;
use tracing::{debug, info, trace};

/// Outcome of the feed scan, decided under the session lock
enum FeedStep {
    Next(usize, PlayableSource),
    EndOfFeed,
}

impl PlaybackEngine {
    pub(crate) async fn handle_finish(&self, token: Token) {
        if !self.race.is_current(token) {
            trace!(token, "Completion of a superseded intent, not advancing");
            return;
        }

        let (finished_id, next_in_queue, autoplay) = self
            .state
            .read(|s| {
                (
                    s.current_id().map(str::to_string),
                    s.next_queue_item().map(|(index, source)| (source.clone(), index)),
                    s.include_autoplay() && s.follows_feed(),
                )
            })
            .await;

        if let Some(source_id) = &finished_id {
            info!(source_id = %source_id, "Main playback finished");
            self.state.broadcast_event(PlayerEvent::SourceCompleted {
                source_id: source_id.clone(),
                timestamp: chrono::Utc::now(),
            });
        }

        if let Some((source, index)) = next_in_queue {
            debug!("Advancing to queue item {}", index);
            self.play_intro_if_needed(&source, index, token).await;
            if !self.race.is_current(token) {
                trace!(token, "Queue advance abandoned after intro");
                return;
            }
            self.start_main_playback(source, index, token, QueueChangeTrigger::SourceCompletion)
                .await;
            return;
        }

        if !autoplay {
            let applied = self
                .state
                .update_if_current(&self.race, token, |s| {
                    s.end_session();
                    s.reset_playback_ui();
                })
                .await;
            if applied.is_some() {
                self.emit_session_ended(SessionEndReason::AutoplayOff);
            }
            return;
        }

        let step = self
            .state
            .update_if_current(&self.race, token, |s| match s.next_unplayed_feed_index() {
                Some(index) => {
                    let source = s.feed_list()[index].clone();
                    s.set_feed_index(index);
                    s.mark_played(&source.id);
                    s.set_queue_and_current(vec![source.clone()], 0, true);
                    FeedStep::Next(index, source)
                }
                None => {
                    s.end_session();
                    s.reset_playback_ui();
                    s.clear_queue();
                    FeedStep::EndOfFeed
                }
            })
            .await;

        match step {
            None => trace!(token, "Autoplay abandoned: superseded"),
            Some(FeedStep::EndOfFeed) => {
                self.emit_session_ended(SessionEndReason::EndOfFeed);
                self.emit_queue_cleared();
            }
            Some(FeedStep::Next(feed_index, source)) => {
                info!(source_id = %source.id, feed_index, "Autoplay advancing to next feed item");
                self.play_intro_if_needed(&source, 0, token).await;
                if !self.race.is_current(token) {
                    trace!(token, "Autoplay abandoned after intro");
                    return;
                }
                self.start_main_playback(source, 0, token, QueueChangeTrigger::Autoplay)
                    .await;
            }
        }
    }
}
