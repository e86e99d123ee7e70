//! Queue and feed context type definitions

use serde::{Deserialize, Serialize};

/// Why the queue changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum QueueChangeTrigger {
    /// New parent started a fresh episode
    NewSession,
    UserEnqueue,
    UserDequeue,
    /// User jumped to a queue item or skipped within the queue
    UserJump,
    /// Finish watcher advanced to the next item
    SourceCompletion,
    /// Autoplay pulled the next item from the feed
    Autoplay,
    Cleared,
}

impl std::fmt::Display for QueueChangeTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueChangeTrigger::NewSession => write!(f, "NewSession"),
            QueueChangeTrigger::UserEnqueue => write!(f, "UserEnqueue"),
            QueueChangeTrigger::UserDequeue => write!(f, "UserDequeue"),
            QueueChangeTrigger::UserJump => write!(f, "UserJump"),
            QueueChangeTrigger::SourceCompletion => write!(f, "SourceCompletion"),
            QueueChangeTrigger::Autoplay => write!(f, "Autoplay"),
            QueueChangeTrigger::Cleared => write!(f, "Cleared"),
        }
    }
}

/// Kind of list the feed was taken from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceContextType {
    #[default]
    Feed,
    Room,
    Group,
    Project,
}

impl std::fmt::Display for SourceContextType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceContextType::Feed => write!(f, "feed"),
            SourceContextType::Room => write!(f, "room"),
            SourceContextType::Group => write!(f, "group"),
            SourceContextType::Project => write!(f, "project"),
        }
    }
}

/// Tag describing where the current feed list came from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceContext {
    #[serde(rename = "type")]
    pub context_type: SourceContextType,
    /// Room/group/project id when applicable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}
