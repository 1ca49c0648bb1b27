//! Domain model structs held by the live hub.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to the UI layer as JSON.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::HubError;

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Student,
    Teacher,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Student => "student",
            Self::Teacher => "teacher",
        }
    }
}

impl FromStr for Role {
    type Err = HubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "student" => Ok(Self::Student),
            "teacher" => Ok(Self::Teacher),
            other => Err(HubError::InvalidRole(other.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Presence status of a user. Last write wins.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Online,
    Away,
    Busy,
    Offline,
}

impl PresenceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Away => "away",
            Self::Busy => "busy",
            Self::Offline => "offline",
        }
    }

    /// Whether the user counts as connected.
    pub fn is_connected(&self) -> bool {
        !matches!(self, Self::Offline)
    }
}

impl FromStr for PresenceStatus {
    type Err = HubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "online" => Ok(Self::Online),
            "away" => Ok(Self::Away),
            "busy" => Ok(Self::Busy),
            "offline" => Ok(Self::Offline),
            other => Err(HubError::InvalidStatus(other.to_string())),
        }
    }
}

impl fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user known to the presence registry. The primary key is `id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub avatar: Option<String>,
    pub role: Role,
    pub status: PresenceStatus,
    /// Time of the last status-affecting mutation. Stamped by the hub.
    #[serde(default = "Utc::now")]
    pub last_seen: DateTime<Utc>,
    /// Channel the user is currently viewing, if any.
    #[serde(default)]
    pub current_channel: Option<String>,
}

impl User {
    /// Build an online user with no avatar and no current channel.
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            avatar: None,
            role,
            status: PresenceStatus::Online,
            last_seen: Utc::now(),
            current_channel: None,
        }
    }

    pub fn with_status(mut self, status: PresenceStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// Emoji -> ids of the users who reacted with it.
pub type Reactions = BTreeMap<String, BTreeSet<String>>;

/// A single chat message.
///
/// `user_name` and `user_avatar` are a copy of the author's profile taken
/// when the message was sent. Later profile changes do not touch them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub channel_id: String,
    pub user_id: String,
    pub user_name: String,
    #[serde(default)]
    pub user_avatar: Option<String>,
    pub content: String,
    /// Assigned by the store when the message is appended.
    pub timestamp: DateTime<Utc>,
    /// Absent until the first reaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reactions: Option<Reactions>,
    #[serde(default)]
    pub edited: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<DateTime<Utc>>,
}

/// The caller-supplied part of a message. Id and timestamp come from the
/// store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MessageDraft {
    pub user_id: String,
    pub user_name: String,
    #[serde(default)]
    pub user_avatar: Option<String>,
    pub content: String,
}

impl MessageDraft {
    /// Snapshot the author fields of `user` for a new message.
    pub fn from_user(user: &User, content: impl Into<String>) -> Self {
        Self {
            user_id: user.id.clone(),
            user_name: user.name.clone(),
            user_avatar: user.avatar.clone(),
            content: content.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Announcement
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnnouncementKind {
    #[default]
    Info,
    Warning,
    Success,
    Urgent,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    #[default]
    All,
    Students,
    Teachers,
    Admins,
}

impl Audience {
    /// Whether a user with `role` is part of this audience.
    pub fn includes(&self, role: Role) -> bool {
        match self {
            Self::All => true,
            Self::Students => role == Role::Student,
            Self::Teachers => role == Role::Teacher,
            Self::Admins => role == Role::Admin,
        }
    }
}

/// A broadcast notice. Stored in creation order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: AnnouncementKind,
    pub audience: Audience,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Input for a new announcement. Missing `id` / `created_at` are stamped by
/// the broadcaster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementDraft {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    pub content: String,
    #[serde(rename = "type", default)]
    pub kind: AnnouncementKind,
    #[serde(default)]
    pub audience: Audience,
    pub created_by: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl AnnouncementDraft {
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            title: title.into(),
            content: content.into(),
            kind: AnnouncementKind::Info,
            audience: Audience::All,
            created_by: created_by.into(),
            created_at: None,
        }
    }
}

// ---------------------------------------------------------------------------
// System statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    #[default]
    Healthy,
    Degraded,
    Critical,
}

/// Snapshot of synthetic platform metrics. Always replaced as a whole.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SystemStats {
    pub connected_users: u32,
    pub active_chats: u32,
    pub messages_per_hour: u32,
    pub health: HealthStatus,
    pub uptime: String,
    /// Percentages in `0.0..=100.0`.
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub disk_usage: f64,
    pub network_latency_ms: u32,
}

impl Default for SystemStats {
    /// The zero record returned before the first update.
    fn default() -> Self {
        Self {
            connected_users: 0,
            active_chats: 0,
            messages_per_hour: 0,
            health: HealthStatus::Healthy,
            uptime: "0m".to_string(),
            cpu_usage: 0.0,
            memory_usage: 0.0,
            disk_usage: 0.0,
            network_latency_ms: 0,
        }
    }
}
