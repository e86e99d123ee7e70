//! Session state
//!
//! Single source of truth for what the player is doing. Fields are private;
//! every transition goes through a method here so the invariants hold after
//! each call:
//!
//! - `is_playing` implies `current.is_some()`
//! - `queue_index < queue.len()`, or `queue_index == 0` when the queue is empty
//!
//! The engine is the only writer (through `SharedState::update`). Everything
//! else reads a [`SessionSnapshot`].

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tawk_common::events::{PlaybackState, SourceContext};
use tawk_common::human_time::format_clock;
use tawk_common::PlayableSource;

#[derive(Debug, Clone)]
pub struct SessionState {
    current: Option<PlayableSource>,
    is_playing: bool,
    progress_percent: f64,
    current_time_seconds: f64,
    duration_seconds: f64,

    queue: Vec<PlayableSource>,
    queue_index: usize,

    feed_list: Vec<PlayableSource>,
    /// Last feed position consumed
    feed_index: usize,
    source_context: SourceContext,

    /// Parents played during the active session (ephemeral)
    played_ids: HashSet<String>,
    session_active: bool,
    /// Session was started from the feed; reply sessions never autoplay
    follows_feed: bool,

    include_replies: bool,
    include_autoplay: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl SessionState {
    pub fn new(include_replies: bool, include_autoplay: bool) -> Self {
        Self {
            current: None,
            is_playing: false,
            progress_percent: 0.0,
            current_time_seconds: 0.0,
            duration_seconds: 0.0,
            queue: Vec::new(),
            queue_index: 0,
            feed_list: Vec::new(),
            feed_index: 0,
            source_context: SourceContext::default(),
            played_ids: HashSet::new(),
            session_active: false,
            follows_feed: false,
            include_replies,
            include_autoplay,
        }
    }

    // ---- Reads ----

    pub fn current(&self) -> Option<&PlayableSource> {
        self.current.as_ref()
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current.as_ref().map(|s| s.id.as_str())
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn playback_state(&self) -> PlaybackState {
        PlaybackState::from_playing(self.is_playing)
    }

    pub fn progress_percent(&self) -> f64 {
        self.progress_percent
    }

    pub fn current_time_seconds(&self) -> f64 {
        self.current_time_seconds
    }

    pub fn queue(&self) -> &[PlayableSource] {
        &self.queue
    }

    pub fn queue_index(&self) -> usize {
        self.queue_index
    }

    /// Item after the current queue position, if any
    pub fn next_queue_item(&self) -> Option<(usize, &PlayableSource)> {
        let next = self.queue_index + 1;
        self.queue.get(next).map(|source| (next, source))
    }

    pub fn feed_list(&self) -> &[PlayableSource] {
        &self.feed_list
    }

    pub fn feed_index(&self) -> usize {
        self.feed_index
    }

    pub fn source_context(&self) -> &SourceContext {
        &self.source_context
    }

    pub fn position_in_feed(&self, id: &str) -> Option<usize> {
        self.feed_list.iter().position(|s| s.id == id)
    }

    pub fn has_played(&self, id: &str) -> bool {
        self.played_ids.contains(id)
    }

    pub fn session_active(&self) -> bool {
        self.session_active
    }

    pub fn follows_feed(&self) -> bool {
        self.follows_feed
    }

    pub fn include_replies(&self) -> bool {
        self.include_replies
    }

    pub fn include_autoplay(&self) -> bool {
        self.include_autoplay
    }

    /// First feed position after `feed_index` whose id has not been played
    /// this session
    pub fn next_unplayed_feed_index(&self) -> Option<usize> {
        let start = self.feed_index + 1;
        self.feed_list
            .iter()
            .enumerate()
            .skip(start)
            .find(|(_, s)| !self.played_ids.contains(&s.id))
            .map(|(i, _)| i)
    }

    // ---- Transitions ----

    pub fn set_include_replies(&mut self, value: bool) {
        self.include_replies = value;
    }

    pub fn set_include_autoplay(&mut self, value: bool) {
        self.include_autoplay = value;
    }

    /// Replace the feed list; current playback is left alone
    pub fn set_feed(&mut self, list: Vec<PlayableSource>, context: SourceContext) {
        self.feed_list = list;
        self.source_context = context;
    }

    pub fn set_feed_index(&mut self, index: usize) {
        self.feed_index = index;
    }

    /// Start a new session whose only played parent is `id`
    pub fn begin_session(&mut self, id: &str, follows_feed: bool) {
        self.played_ids.clear();
        self.played_ids.insert(id.to_string());
        self.session_active = true;
        self.follows_feed = follows_feed;
    }

    /// Forget played parents. `follows_feed` is kept so a resumed item still
    /// knows whether it came from the feed.
    pub fn end_session(&mut self) {
        self.played_ids.clear();
        self.session_active = false;
    }

    /// Reopen an ended session around the current item (user resume)
    pub fn resume_session(&mut self) -> bool {
        if self.session_active {
            return false;
        }
        let Some(id) = self.current.as_ref().map(|c| c.id.clone()) else {
            return false;
        };
        self.played_ids.clear();
        self.played_ids.insert(id);
        self.session_active = true;
        true
    }

    pub fn mark_played(&mut self, id: &str) {
        self.played_ids.insert(id.to_string());
    }

    /// Point at `source` with progress reset
    pub fn set_current(&mut self, source: PlayableSource, playing: bool) {
        self.duration_seconds = source.duration;
        self.current = Some(source);
        self.is_playing = playing;
        self.progress_percent = 0.0;
        self.current_time_seconds = 0.0;
    }

    /// Make `source` current at its position in the live queue.
    ///
    /// `index` is where the caller last saw it; if the queue changed since,
    /// the item is looked up by id, and a source no longer queued becomes a
    /// one-item queue. Items enqueued in the meantime are kept.
    pub fn focus_queue_item(&mut self, source: PlayableSource, index: usize, playing: bool) {
        let at_index = self.queue.get(index).is_some_and(|q| q.id == source.id);
        let position = if at_index {
            Some(index)
        } else {
            self.queue.iter().position(|q| q.id == source.id)
        };
        match position {
            Some(position) => {
                self.queue_index = position;
                self.set_current(source, playing);
            }
            None => self.set_queue_and_current(vec![source], 0, playing),
        }
    }

    /// Install a queue and its current item; progress resets to zero
    pub fn set_queue_and_current(&mut self, queue: Vec<PlayableSource>, index: usize, playing: bool) {
        let current = queue.get(index).cloned();
        self.queue_index = if queue.is_empty() {
            0
        } else {
            index.min(queue.len() - 1)
        };
        self.queue = queue;
        match current {
            Some(source) => self.set_current(source, playing),
            None => {
                self.current = None;
                self.is_playing = false;
            }
        }
    }

    /// Set the play flag; ignored (forced false) without a current item
    pub fn set_playing(&mut self, playing: bool) {
        self.is_playing = playing && self.current.is_some();
    }

    pub fn set_progress(&mut self, percent: f64, seconds: f64, duration: f64) {
        self.progress_percent = percent.clamp(0.0, 100.0);
        self.current_time_seconds = seconds.max(0.0);
        if duration > 0.0 {
            self.duration_seconds = duration;
        }
    }

    /// Paused at zero; `current` stays so the mini player remains visible
    pub fn reset_playback_ui(&mut self) {
        self.is_playing = false;
        self.progress_percent = 0.0;
        self.current_time_seconds = 0.0;
    }

    /// Empty queue and no current item
    pub fn clear_queue(&mut self) {
        self.queue.clear();
        self.queue_index = 0;
        self.current = None;
        self.is_playing = false;
    }

    /// Append to the explicit queue; returns how many were added
    pub fn append_queue(&mut self, sources: impl IntoIterator<Item = PlayableSource>) -> usize {
        let before = self.queue.len();
        self.queue.extend(sources);
        self.queue.len() - before
    }

    /// Remove a queue entry other than the current one.
    ///
    /// Removing before the current position shifts `queue_index` down so it
    /// keeps pointing at the same item. Returns `false` for the current index
    /// or an out-of-range index.
    pub fn remove_queue_item(&mut self, index: usize) -> bool {
        if index >= self.queue.len() || index == self.queue_index {
            return false;
        }
        self.queue.remove(index);
        if index < self.queue_index {
            self.queue_index -= 1;
        }
        self.queue_index = self.queue_index.min(self.queue.len().saturating_sub(1));
        true
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let mut played_ids: Vec<String> = self.played_ids.iter().cloned().collect();
        played_ids.sort();

        SessionSnapshot {
            current: self.current.clone(),
            is_playing: self.is_playing,
            playback_state: self.playback_state(),
            progress_percent: self.progress_percent,
            current_time_seconds: self.current_time_seconds,
            duration_seconds: self.duration_seconds,
            current_time_display: format_clock(self.current_time_seconds),
            queue: self.queue.clone(),
            queue_index: self.queue_index,
            feed_list: self.feed_list.clone(),
            feed_index: self.feed_index,
            source_context: self.source_context.clone(),
            played_ids,
            session_active: self.session_active,
            follows_feed: self.follows_feed,
            include_replies: self.include_replies,
            include_autoplay: self.include_autoplay,
        }
    }
}

/// Read-only copy of the session for the presentation layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub current: Option<PlayableSource>,
    pub is_playing: bool,
    pub playback_state: PlaybackState,
    pub progress_percent: f64,
    pub current_time_seconds: f64,
    pub duration_seconds: f64,
    /// `current_time_seconds` as `m:ss`
    pub current_time_display: String,
    pub queue: Vec<PlayableSource>,
    pub queue_index: usize,
    pub feed_list: Vec<PlayableSource>,
    pub feed_index: usize,
    pub source_context: SourceContext,
    /// Sorted
    pub played_ids: Vec<String>,
    pub session_active: bool,
    pub follows_feed: bool,
    pub include_replies: bool,
    pub include_autoplay: bool,
}
