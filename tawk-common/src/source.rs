//! Playable source model
//!
//! A `PlayableSource` is the immutable description of one playable unit as
//! supplied by the feed/query layer. The player never mutates a source; it
//! only tracks sources in its own session state.

use serde::{Deserialize, Serialize};

/// Author of a source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    /// Author's intro signature clip
    #[serde(default)]
    pub signature_url: Option<String>,
}

/// Room a source was posted into
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Room-wide intro signature clip, takes precedence over the author's
    #[serde(default)]
    pub signature_url: Option<String>,
}

fn default_include_intro() -> bool {
    true
}

/// One playable unit (a parent post or a reply)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayableSource {
    /// Stable unique key
    pub id: String,

    #[serde(default)]
    pub title: String,

    /// Main audio URL; empty means nothing to play
    pub audio_url: String,

    /// Duration in seconds (informational only)
    #[serde(default)]
    pub duration: f64,

    /// Explicit intro clip, overrides signature resolution when present
    #[serde(default)]
    pub intro_url: Option<String>,

    /// `false` suppresses the intro even when one resolves
    #[serde(default = "default_include_intro")]
    pub include_intro: bool,

    /// Aggregate output of a container (project); never gets an intro
    /// when `container_id` is also set
    #[serde(default)]
    pub is_merged_output: bool,

    #[serde(default)]
    pub container_id: Option<String>,

    /// Parent id when this source is a reply
    #[serde(default)]
    pub reply_to: Option<String>,

    #[serde(default)]
    pub author: Option<Author>,

    #[serde(default)]
    pub room_id: Option<String>,

    #[serde(default)]
    pub room: Option<Room>,
}

impl PlayableSource {
    /// Create a bare source with no intro and no author
    pub fn new(id: impl Into<String>, audio_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            audio_url: audio_url.into(),
            duration: 0.0,
            intro_url: None,
            include_intro: true,
            is_merged_output: false,
            container_id: None,
            reply_to: None,
            author: None,
            room_id: None,
            room: None,
        }
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration = seconds;
        self
    }

    pub fn with_intro_url(mut self, url: impl Into<String>) -> Self {
        self.intro_url = Some(url.into());
        self
    }

    pub fn with_author(mut self, author: Author) -> Self {
        self.author = Some(author);
        self
    }

    pub fn with_room(mut self, room: Room) -> Self {
        self.room_id = Some(room.id.clone());
        self.room = Some(room);
        self
    }

    pub fn reply_to(mut self, parent_id: impl Into<String>) -> Self {
        self.reply_to = Some(parent_id.into());
        self
    }

    pub fn merged_into(mut self, container_id: impl Into<String>) -> Self {
        self.is_merged_output = true;
        self.container_id = Some(container_id.into());
        self
    }

    pub fn without_intro(mut self) -> Self {
        self.include_intro = false;
        self
    }

    pub fn is_reply(&self) -> bool {
        self.reply_to.is_some()
    }

    /// Merged container output: both the flag and the container id are present
    pub fn is_merged_container_output(&self) -> bool {
        self.is_merged_output && self.container_id.is_some()
    }

    /// Whether policy forbids an intro for this source regardless of URL
    pub fn intro_suppressed(&self) -> bool {
        !self.include_intro || self.is_merged_container_output()
    }

    /// Resolve the intro clip URL.
    ///
    /// Order: explicit `intro_url`, then for replies the reply author's
    /// signature, then the room signature (when the source belongs to a room
    /// that has one), then the author's signature. Empty strings count as
    /// absent.
    pub fn resolve_intro_url(&self) -> Option<&str> {
        let author_signature = || {
            self.author
                .as_ref()
                .and_then(|a| non_empty(a.signature_url.as_deref()))
        };

        if let Some(url) = non_empty(self.intro_url.as_deref()) {
            return Some(url);
        }

        if self.is_reply() {
            return author_signature();
        }

        if self.room_id.is_some() {
            if let Some(url) = self
                .room
                .as_ref()
                .and_then(|r| non_empty(r.signature_url.as_deref()))
            {
                return Some(url);
            }
        }

        author_signature()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}
