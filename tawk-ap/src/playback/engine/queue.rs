//! Explicit queue operations - jump, remove, enqueue

use super::core::PlaybackEngine;
use crate::error::Result;
use tawk_common::events::{PlayerEvent, QueueChangeTrigger};
use tawk_common::PlayableSource;
use tracing::{debug, info};

impl PlaybackEngine {
    /// Start `queue[index]` directly (no jingle). Out of range is a no-op.
    pub async fn play_queue_item(&self, index: usize) -> Result<()> {
        self.ensure_running()?;
        info!("Play queue item command received: index={}", index);

        let source = self.state.read(|s| s.queue().get(index).cloned()).await;
        let Some(source) = source else {
            debug!("Queue index {} out of range, ignoring", index);
            return Ok(());
        };

        let token = self.race.issue();
        if !self.stop_all_audio("queue item", token).await {
            return Ok(());
        }
        self.start_main_playback(source, index, token, QueueChangeTrigger::UserJump)
            .await;
        Ok(())
    }

    /// Remove a queue entry other than the one playing.
    ///
    /// Returns whether anything was removed. Entries before the current one
    /// shift the current index down so it keeps pointing at the same item.
    pub async fn remove_from_queue(&self, index: usize) -> Result<bool> {
        self.ensure_running()?;

        let removed = self
            .state
            .update(|s| {
                s.remove_queue_item(index).then(|| {
                    let ids: Vec<String> = s.queue().iter().map(|q| q.id.clone()).collect();
                    (ids, s.queue_index())
                })
            })
            .await;

        match removed {
            Some((queue, queue_index)) => {
                info!("Removed queue item {} (current index now {})", index, queue_index);
                self.state.broadcast_event(PlayerEvent::QueueChanged {
                    queue,
                    queue_index,
                    trigger: QueueChangeTrigger::UserDequeue,
                    timestamp: chrono::Utc::now(),
                });
                Ok(true)
            }
            None => {
                debug!("Queue item {} not removed (current or out of range)", index);
                Ok(false)
            }
        }
    }

    /// Append sources to the explicit queue of the current episode.
    ///
    /// Replies are dropped while `include_replies` is off. Returns how many
    /// were added.
    pub async fn enqueue(&self, sources: Vec<PlayableSource>) -> Result<usize> {
        self.ensure_running()?;

        let (added, queue, queue_index) = self
            .state
            .update(|s| {
                let include_replies = s.include_replies();
                let added = s.append_queue(
                    sources
                        .into_iter()
                        .filter(|source| include_replies || !source.is_reply()),
                );
                let ids: Vec<String> = s.queue().iter().map(|q| q.id.clone()).collect();
                (added, ids, s.queue_index())
            })
            .await;

        info!("Enqueued {} sources (queue length {})", added, queue.len());
        if added > 0 {
            self.state.broadcast_event(PlayerEvent::QueueChanged {
                queue,
                queue_index,
                trigger: QueueChangeTrigger::UserEnqueue,
                timestamp: chrono::Utc::now(),
            });
        }
        Ok(added)
    }
}
