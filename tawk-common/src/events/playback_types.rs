//! Playback-related type definitions
//!
//! Supporting types for playback state and intro jingle lifecycle.

use serde::{Deserialize, Serialize};

/// Playback state enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Playing,
    Paused,
}

impl PlaybackState {
    pub fn from_playing(is_playing: bool) -> Self {
        if is_playing {
            PlaybackState::Playing
        } else {
            PlaybackState::Paused
        }
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
        }
    }
}

/// How an intro jingle wait ended
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum JingleOutcome {
    /// Jingle channel reported natural completion
    Completed,
    /// Fixed timeout elapsed; treated like completion
    TimedOut,
    /// Jingle was stopped by the user or failed to start
    Cancelled,
    /// A newer play intent superseded the waiting caller
    Superseded,
}

impl std::fmt::Display for JingleOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JingleOutcome::Completed => write!(f, "Completed"),
            JingleOutcome::TimedOut => write!(f, "TimedOut"),
            JingleOutcome::Cancelled => write!(f, "Cancelled"),
            JingleOutcome::Superseded => write!(f, "Superseded"),
        }
    }
}

/// Why a playback session ended
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum SessionEndReason {
    /// Queue exhausted with autoplay disabled
    AutoplayOff,
    /// No unplayed item left in the feed
    EndOfFeed,
    /// User closed the player
    Closed,
    /// Process teardown
    Shutdown,
}

impl std::fmt::Display for SessionEndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionEndReason::AutoplayOff => write!(f, "AutoplayOff"),
            SessionEndReason::EndOfFeed => write!(f, "EndOfFeed"),
            SessionEndReason::Closed => write!(f, "Closed"),
            SessionEndReason::Shutdown => write!(f, "Shutdown"),
        }
    }
}
