//! Append-only list of broadcast announcements.

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use campus_shared::{Announcement, AnnouncementDraft, HubError, Result};

#[derive(Debug, Clone, Default)]
pub struct AnnouncementLog {
    entries: Vec<Announcement>,
}

impl AnnouncementLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an announcement, stamping `id` and `created_at` when the
    /// draft leaves them out.
    pub fn append(&mut self, draft: AnnouncementDraft, now: DateTime<Utc>) -> Result<Announcement> {
        if draft.title.trim().is_empty() {
            return Err(HubError::MissingField("title"));
        }
        if draft.content.trim().is_empty() {
            return Err(HubError::MissingField("content"));
        }
        if draft.created_by.trim().is_empty() {
            return Err(HubError::MissingField("createdBy"));
        }

        let announcement = Announcement {
            id: draft
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            title: draft.title,
            content: draft.content,
            kind: draft.kind,
            audience: draft.audience,
            created_by: draft.created_by,
            created_at: draft.created_at.unwrap_or(now),
        };
        self.entries.push(announcement.clone());

        info!(
            id = %announcement.id,
            kind = ?announcement.kind,
            audience = ?announcement.audience,
            "Announcement broadcast"
        );
        Ok(announcement)
    }

    /// All announcements, oldest first.
    pub fn all(&self) -> Vec<Announcement> {
        self.entries.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
