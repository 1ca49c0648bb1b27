//! Append-only per-channel message logs.
//!
//! Channels exist implicitly: the first message written to a channel id
//! creates its log. Messages are never reordered or removed; edits and
//! reaction toggles change a message in place.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use campus_shared::constants::MAX_EMOJI_LEN;
use campus_shared::{HubError, Message, MessageDraft, Result};

#[derive(Debug, Clone, Default)]
pub struct MessageStore {
    channels: HashMap<String, Vec<Message>>,
    next_seq: u64,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message built from `draft`.
    ///
    /// The store assigns the id and the timestamp. Timestamps never go
    /// backwards within a channel even if the clock does.
    pub fn append(
        &mut self,
        channel_id: &str,
        draft: MessageDraft,
        now: DateTime<Utc>,
    ) -> Result<Message> {
        if channel_id.trim().is_empty() {
            return Err(HubError::MissingField("channelId"));
        }
        if draft.user_id.trim().is_empty() {
            return Err(HubError::MissingField("userId"));
        }
        if draft.user_name.trim().is_empty() {
            return Err(HubError::MissingField("userName"));
        }
        if draft.content.trim().is_empty() {
            return Err(HubError::EmptyContent);
        }

        let log = self.channels.entry(channel_id.to_string()).or_default();
        let timestamp = match log.last() {
            Some(last) if last.timestamp > now => last.timestamp,
            _ => now,
        };

        let seq = self.next_seq;
        self.next_seq += 1;

        let message = Message {
            id: format!("{}-{:020}", timestamp.timestamp_millis(), seq),
            channel_id: channel_id.to_string(),
            user_id: draft.user_id,
            user_name: draft.user_name,
            user_avatar: draft.user_avatar,
            content: draft.content,
            timestamp,
            reactions: None,
            edited: false,
            edited_at: None,
        };
        log.push(message.clone());

        debug!(
            channel = %channel_id,
            message = %message.id,
            sender = %message.user_id,
            "Appended message"
        );
        Ok(message)
    }

    /// Messages of `channel_id` in insertion order. Empty for unknown
    /// channels.
    pub fn list(&self, channel_id: &str) -> Vec<Message> {
        self.channels.get(channel_id).cloned().unwrap_or_default()
    }

    pub fn get(&self, channel_id: &str, message_id: &str) -> Option<Message> {
        self.channels
            .get(channel_id)?
            .iter()
            .find(|m| m.id == message_id)
            .cloned()
    }

    /// Replace the content of an existing message. `Ok(None)` if the
    /// message does not exist.
    pub fn edit(
        &mut self,
        channel_id: &str,
        message_id: &str,
        content: String,
        now: DateTime<Utc>,
    ) -> Result<Option<Message>> {
        if content.trim().is_empty() {
            return Err(HubError::EmptyContent);
        }
        let Some(message) = self.find_mut(channel_id, message_id) else {
            return Ok(None);
        };

        message.content = content;
        message.edited = true;
        message.edited_at = Some(now);

        debug!(channel = %channel_id, message = %message_id, "Edited message");
        Ok(Some(message.clone()))
    }

    /// Add `user_id` to the emoji's reaction set, or remove it if already
    /// present. Emptied sets and maps collapse back to absent, so toggling
    /// twice restores the original message exactly.
    pub fn toggle_reaction(
        &mut self,
        channel_id: &str,
        message_id: &str,
        emoji: &str,
        user_id: &str,
    ) -> Result<Option<Message>> {
        let emoji = emoji.trim();
        if emoji.is_empty() || emoji.len() > MAX_EMOJI_LEN {
            return Err(HubError::InvalidEmoji);
        }
        if user_id.trim().is_empty() {
            return Err(HubError::MissingField("userId"));
        }
        let Some(message) = self.find_mut(channel_id, message_id) else {
            return Ok(None);
        };

        let reactions = message.reactions.get_or_insert_with(Default::default);
        let users = reactions.entry(emoji.to_string()).or_default();
        let added = users.insert(user_id.to_string());
        if !added {
            users.remove(user_id);
        }
        if users.is_empty() {
            reactions.remove(emoji);
        }
        if reactions.is_empty() {
            message.reactions = None;
        }

        debug!(
            channel = %channel_id,
            message = %message_id,
            emoji,
            user = %user_id,
            added,
            "Toggled reaction"
        );
        Ok(Some(message.clone()))
    }

    /// Ids of channels holding at least one message, sorted.
    pub fn channels(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.channels.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of messages across all channels sent at or after `since`.
    pub fn count_since(&self, since: DateTime<Utc>) -> usize {
        self.channels
            .values()
            .map(|log| {
                // Logs are sorted by timestamp.
                let first = log.partition_point(|m| m.timestamp < since);
                log.len() - first
            })
            .sum()
    }

    fn find_mut(&mut self, channel_id: &str, message_id: &str) -> Option<&mut Message> {
        self.channels
            .get_mut(channel_id)?
            .iter_mut()
            .find(|m| m.id == message_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn draft(content: &str) -> MessageDraft {
        MessageDraft {
            user_id: "u1".into(),
            user_name: "Alice".into(),
            user_avatar: None,
            content: content.into(),
        }
    }

    #[test]
    fn test_append_preserves_call_order() {
        let mut store = MessageStore::new();
        let now = Utc::now();

        for i in 0..5 {
            store
                .append("general", draft(&format!("msg {i}")), now)
                .unwrap();
        }

        let messages = store.list("general");
        assert_eq!(messages.len(), 5);
        for (i, m) in messages.iter().enumerate() {
            assert_eq!(m.content, format!("msg {i}"));
        }
        for pair in messages.windows(2) {
            assert!(pair[0].timestamp <= pair[1].timestamp);
            assert_ne!(pair[0].id, pair[1].id);
        }
    }

    #[test]
    fn test_timestamps_never_go_backwards() {
        let mut store = MessageStore::new();
        let t0 = Utc::now();

        let first = store.append("general", draft("first"), t0).unwrap();
        let second = store
            .append("general", draft("second"), t0 - Duration::seconds(10))
            .unwrap();

        assert_eq!(second.timestamp, first.timestamp);
        assert_eq!(store.list("general")[1].content, "second");
    }

    #[test]
    fn test_append_rejects_blank_content() {
        let mut store = MessageStore::new();
        assert_eq!(
            store.append("general", draft("   \n"), Utc::now()),
            Err(HubError::EmptyContent)
        );
        assert!(store.list("general").is_empty());
        assert!(store.channels().is_empty());
    }

    #[test]
    fn test_append_rejects_missing_ids() {
        let mut store = MessageStore::new();
        assert_eq!(
            store.append("", draft("hi"), Utc::now()),
            Err(HubError::MissingField("channelId"))
        );
        let mut anonymous = draft("hi");
        anonymous.user_id.clear();
        assert_eq!(
            store.append("general", anonymous, Utc::now()),
            Err(HubError::MissingField("userId"))
        );
        let mut nameless = draft("hi");
        nameless.user_name = " ".into();
        assert_eq!(
            store.append("general", nameless, Utc::now()),
            Err(HubError::MissingField("userName"))
        );
        assert!(store.list("general").is_empty());
    }

    #[test]
    fn test_ids_sort_past_a_million_in_one_millisecond() {
        let mut store = MessageStore::new();
        store.next_seq = 999_999;
        let now = Utc::now();

        let before = store.append("general", draft("a"), now).unwrap();
        let after = store.append("general", draft("b"), now).unwrap();

        assert_eq!(before.timestamp, after.timestamp);
        assert!(before.id < after.id, "{} !< {}", before.id, after.id);
    }

    #[test]
    fn test_unknown_channel_is_empty() {
        let store = MessageStore::new();
        assert!(store.list("never-seen-channel").is_empty());
        assert!(store.get("never-seen-channel", "1").is_none());
    }

    #[test]
    fn test_reaction_toggle_is_its_own_inverse() {
        let mut store = MessageStore::new();
        let msg = store.append("general", draft("hi"), Utc::now()).unwrap();

        let once = store
            .toggle_reaction("general", &msg.id, "🔥", "user1")
            .unwrap()
            .unwrap();
        let users = &once.reactions.as_ref().unwrap()["🔥"];
        assert!(users.contains("user1"));

        let twice = store
            .toggle_reaction("general", &msg.id, "🔥", "user1")
            .unwrap()
            .unwrap();
        assert_eq!(twice, msg);
    }

    #[test]
    fn test_reactions_from_several_users() {
        let mut store = MessageStore::new();
        let msg = store.append("general", draft("hi"), Utc::now()).unwrap();

        store
            .toggle_reaction("general", &msg.id, "👍", "u1")
            .unwrap();
        store
            .toggle_reaction("general", &msg.id, "👍", "u2")
            .unwrap();
        let after = store
            .toggle_reaction("general", &msg.id, "👍", "u1")
            .unwrap()
            .unwrap();

        let users = &after.reactions.unwrap()["👍"];
        assert_eq!(users.len(), 1);
        assert!(users.contains("u2"));
    }

    #[test]
    fn test_reaction_validation_and_unknown_message() {
        let mut store = MessageStore::new();
        let msg = store.append("general", draft("hi"), Utc::now()).unwrap();

        assert_eq!(
            store.toggle_reaction("general", &msg.id, " ", "u1"),
            Err(HubError::InvalidEmoji)
        );
        assert_eq!(
            store.toggle_reaction("general", "missing", "👍", "u1"),
            Ok(None)
        );
    }

    #[test]
    fn test_edit_in_place() {
        let mut store = MessageStore::new();
        let t0 = Utc::now();
        store.append("general", draft("one"), t0).unwrap();
        let target = store.append("general", draft("two"), t0).unwrap();
        store.append("general", draft("three"), t0).unwrap();

        let t1 = t0 + Duration::seconds(9);
        let edited = store
            .edit("general", &target.id, "two (fixed)".into(), t1)
            .unwrap()
            .unwrap();
        assert!(edited.edited);
        assert_eq!(edited.edited_at, Some(t1));
        assert_eq!(edited.timestamp, target.timestamp);

        let contents: Vec<String> = store
            .list("general")
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["one", "two (fixed)", "three"]);

        assert_eq!(store.edit("general", "missing", "x".into(), t1), Ok(None));
        assert_eq!(
            store.edit("general", &target.id, "".into(), t1),
            Err(HubError::EmptyContent)
        );
    }

    #[test]
    fn test_count_since() {
        let mut store = MessageStore::new();
        let t0 = Utc::now();
        store.append("a", draft("old"), t0).unwrap();
        store
            .append("a", draft("new"), t0 + Duration::minutes(90))
            .unwrap();
        store
            .append("b", draft("new"), t0 + Duration::minutes(100))
            .unwrap();

        assert_eq!(store.count_since(t0 + Duration::minutes(60)), 2);
        assert_eq!(store.count_since(t0), 3);
        assert_eq!(store.channels(), vec!["a".to_string(), "b".to_string()]);
    }
}
