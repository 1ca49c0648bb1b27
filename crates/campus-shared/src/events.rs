//! Event vocabulary emitted by the hub.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Announcement, Message, SystemStats, User};

pub const EVENT_USER_UPDATED: &str = "user_updated";
pub const EVENT_USER_REMOVED: &str = "user_removed";
pub const EVENT_MESSAGE_ADDED: &str = "message_added";
pub const EVENT_MESSAGE_UPDATED: &str = "message_updated";
pub const EVENT_TYPING_UPDATED: &str = "typing_updated";
pub const EVENT_ANNOUNCEMENT_ADDED: &str = "announcement_added";
pub const EVENT_SYSTEM_STATS_UPDATED: &str = "system_stats_updated";

/// Name of an event listeners can register for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    UserUpdated,
    UserRemoved,
    MessageAdded,
    MessageUpdated,
    TypingUpdated,
    AnnouncementAdded,
    SystemStatsUpdated,
}

impl EventKind {
    pub const ALL: [EventKind; 7] = [
        Self::UserUpdated,
        Self::UserRemoved,
        Self::MessageAdded,
        Self::MessageUpdated,
        Self::TypingUpdated,
        Self::AnnouncementAdded,
        Self::SystemStatsUpdated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserUpdated => EVENT_USER_UPDATED,
            Self::UserRemoved => EVENT_USER_REMOVED,
            Self::MessageAdded => EVENT_MESSAGE_ADDED,
            Self::MessageUpdated => EVENT_MESSAGE_UPDATED,
            Self::TypingUpdated => EVENT_TYPING_UPDATED,
            Self::AnnouncementAdded => EVENT_ANNOUNCEMENT_ADDED,
            Self::SystemStatsUpdated => EVENT_SYSTEM_STATS_UPDATED,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event together with its payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum HubEvent {
    UserUpdated(User),
    #[serde(rename_all = "camelCase")]
    UserRemoved { user_id: String },
    #[serde(rename_all = "camelCase")]
    MessageAdded { channel_id: String, message: Message },
    #[serde(rename_all = "camelCase")]
    MessageUpdated { channel_id: String, message: Message },
    /// Carries the whole typing map of the channel, not just the change.
    #[serde(rename_all = "camelCase")]
    TypingUpdated {
        channel_id: String,
        typing: BTreeMap<String, DateTime<Utc>>,
    },
    AnnouncementAdded(Announcement),
    SystemStatsUpdated(SystemStats),
}

impl HubEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::UserUpdated(_) => EventKind::UserUpdated,
            Self::UserRemoved { .. } => EventKind::UserRemoved,
            Self::MessageAdded { .. } => EventKind::MessageAdded,
            Self::MessageUpdated { .. } => EventKind::MessageUpdated,
            Self::TypingUpdated { .. } => EventKind::TypingUpdated,
            Self::AnnouncementAdded(_) => EventKind::AnnouncementAdded,
            Self::SystemStatsUpdated(_) => EventKind::SystemStatsUpdated,
        }
    }
}
