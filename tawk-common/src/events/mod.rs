//! Event types for the tawk event system
//!
//! Provides shared event definitions and the EventBus used by the player.

mod playback_types;
mod queue_types;

pub use playback_types::{JingleOutcome, PlaybackState, SessionEndReason};
pub use queue_types::{QueueChangeTrigger, SourceContext, SourceContextType};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Player event types
///
/// Events are broadcast via EventBus and can be serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlayerEvent {
    /// Playback state changed (Playing ↔ Paused)
    PlaybackStateChanged {
        old_state: PlaybackState,
        new_state: PlaybackState,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Main audio of a source started
    SourceStarted {
        source_id: String,
        /// Position in the explicit queue
        queue_index: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Main audio of a source reached its end
    SourceCompleted {
        source_id: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Intro jingle started for a source
    JingleStarted {
        source_id: String,
        url: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Intro jingle wait ended
    JingleFinished {
        source_id: String,
        outcome: JingleOutcome,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Progress update relayed from the main channel
    ///
    /// Emitted at the transport's status rate; not persisted.
    PlaybackProgress {
        source_id: String,
        /// 0-100
        progress_percent: f64,
        position_seconds: f64,
        duration_seconds: f64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Explicit queue changed
    QueueChanged {
        /// Source ids in queue order
        queue: Vec<String>,
        queue_index: usize,
        trigger: QueueChangeTrigger,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Feed list replaced
    FeedChanged {
        context: SourceContext,
        len: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playback session ended
    SessionEnded {
        reason: SessionEndReason,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl PlayerEvent {
    /// Event type string for the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            PlayerEvent::PlaybackStateChanged { .. } => "PlaybackStateChanged",
            PlayerEvent::SourceStarted { .. } => "SourceStarted",
            PlayerEvent::SourceCompleted { .. } => "SourceCompleted",
            PlayerEvent::JingleStarted { .. } => "JingleStarted",
            PlayerEvent::JingleFinished { .. } => "JingleFinished",
            PlayerEvent::PlaybackProgress { .. } => "PlaybackProgress",
            PlayerEvent::QueueChanged { .. } => "QueueChanged",
            PlayerEvent::FeedChanged { .. } => "FeedChanged",
            PlayerEvent::SessionEnded { .. } => "SessionEnded",
        }
    }
}

/// Broadcast bus for PlayerEvent
///
/// Subscribers only see events emitted after they subscribe. Slow subscribers
/// lose the oldest events once `capacity` is exceeded.
pub struct EventBus {
    tx: broadcast::Sender<PlayerEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Examples
    ///
    /// ```
    /// use tawk_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.capacity(), 100);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: PlayerEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = PlayerEvent::SessionEnded {
            reason: SessionEndReason::EndOfFeed,
            timestamp: chrono::Utc::now(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "SessionEnded");
        assert_eq!(json["reason"], "EndOfFeed");
        assert_eq!(event.event_type(), "SessionEnded");
    }

    #[test]
    fn test_source_context_serialization() {
        let context = SourceContext {
            context_type: SourceContextType::Room,
            id: Some("room-7".to_string()),
        };
        let json = serde_json::to_value(&context).unwrap();
        assert_eq!(json["type"], "room");
        assert_eq!(json["id"], "room-7");

        let feed = serde_json::to_value(SourceContext::default()).unwrap();
        assert_eq!(feed["type"], "feed");
        assert!(feed.get("id").is_none());
    }

    #[tokio::test]
    async fn test_event_bus_delivers_to_subscribers() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        bus.emit_lossy(PlayerEvent::SourceCompleted {
            source_id: "a".to_string(),
            timestamp: chrono::Utc::now(),
        });

        match rx.recv().await.unwrap() {
            PlayerEvent::SourceCompleted { source_id, .. } => assert_eq!(source_id, "a"),
            other => panic!("Unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_emit_without_subscribers_is_ok() {
        let bus = EventBus::new(4);
        bus.emit_lossy(PlayerEvent::SessionEnded {
            reason: SessionEndReason::Closed,
            timestamp: chrono::Utc::now(),
        });
        assert_eq!(bus.subscriber_count(), 0);
    }
}
