//! Per-channel typing indicators.
//!
//! Entries map `(channel, user)` to the time of the last keystroke signal.
//! Staleness is a read-time property: [`TypingTracker::typing_users`] only
//! reports entries younger than the TTL. Storage is pruned on write, when a
//! signal for the same channel arrives, and never by the passage of time
//! alone.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Utc};
use tracing::trace;

use campus_shared::{HubError, Result};

/// user id -> last keystroke signal
pub type TypingMap = BTreeMap<String, DateTime<Utc>>;

#[derive(Debug, Clone)]
pub struct TypingTracker {
    channels: HashMap<String, TypingMap>,
    ttl: Duration,
}

impl TypingTracker {
    pub fn new(ttl: Duration) -> Self {
        Self {
            channels: HashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Apply a typing signal and return the channel's full map afterwards.
    ///
    /// `is_typing == false` removes the entry immediately regardless of its
    /// age. Entries of this channel that are already past the TTL are
    /// dropped first.
    pub fn set(
        &mut self,
        channel_id: &str,
        user_id: &str,
        is_typing: bool,
        now: DateTime<Utc>,
    ) -> Result<TypingMap> {
        if channel_id.trim().is_empty() {
            return Err(HubError::MissingField("channelId"));
        }
        if user_id.trim().is_empty() {
            return Err(HubError::MissingField("userId"));
        }

        let ttl = self.ttl;
        let map = self.channels.entry(channel_id.to_string()).or_default();

        let before = map.len();
        map.retain(|_, ts| now - *ts < ttl);
        if map.len() != before {
            trace!(
                channel = %channel_id,
                swept = before - map.len(),
                "Swept stale typing entries"
            );
        }

        if is_typing {
            map.insert(user_id.to_string(), now);
        } else {
            map.remove(user_id);
        }

        let snapshot = map.clone();
        if map.is_empty() {
            self.channels.remove(channel_id);
        }
        Ok(snapshot)
    }

    /// The stored map for `channel_id`, stale entries included.
    pub fn map(&self, channel_id: &str) -> TypingMap {
        self.channels.get(channel_id).cloned().unwrap_or_default()
    }

    /// Users of `channel_id` whose last signal is younger than the TTL,
    /// ordered by id.
    pub fn typing_users(&self, channel_id: &str, now: DateTime<Utc>) -> Vec<String> {
        self.channels
            .get(channel_id)
            .map(|map| {
                map.iter()
                    .filter(|(_, ts)| now - **ts < self.ttl)
                    .map(|(user, _)| user.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> TypingTracker {
        TypingTracker::new(Duration::seconds(3))
    }

    #[test]
    fn test_set_and_clear() {
        let mut typing = tracker();
        let now = Utc::now();

        let map = typing.set("general", "u1", true, now).unwrap();
        assert_eq!(map.get("u1"), Some(&now));

        let map = typing.set("general", "u1", false, now).unwrap();
        assert!(map.is_empty());
        assert!(typing.map("general").is_empty());
    }

    #[test]
    fn test_event_map_contains_whole_channel() {
        let mut typing = tracker();
        let now = Utc::now();

        typing.set("general", "u1", true, now).unwrap();
        let map = typing.set("general", "u2", true, now).unwrap();
        assert_eq!(map.len(), 2);

        // Other channels are independent.
        let other = typing.set("random", "u3", true, now).unwrap();
        assert_eq!(other.len(), 1);
    }

    #[test]
    fn test_time_alone_does_not_remove_entries() {
        let mut typing = tracker();
        let t0 = Utc::now();
        typing.set("general", "u1", true, t0).unwrap();

        let later = t0 + Duration::seconds(60);
        assert!(typing.typing_users("general", later).is_empty());
        assert!(typing.map("general").contains_key("u1"));
    }

    #[test]
    fn test_typing_users_filters_by_ttl() {
        let mut typing = tracker();
        let t0 = Utc::now();
        typing.set("general", "u1", true, t0).unwrap();
        typing
            .set("general", "u2", true, t0 + Duration::seconds(2))
            .unwrap();

        let at = t0 + Duration::milliseconds(3500);
        assert_eq!(typing.typing_users("general", at), vec!["u2".to_string()]);
    }

    #[test]
    fn test_write_sweeps_stale_entries() {
        let mut typing = tracker();
        let t0 = Utc::now();
        typing.set("general", "u1", true, t0).unwrap();

        let map = typing
            .set("general", "u2", true, t0 + Duration::seconds(5))
            .unwrap();
        assert!(!map.contains_key("u1"));
        assert!(map.contains_key("u2"));
    }

    #[test]
    fn test_refresh_keeps_user_typing() {
        let mut typing = tracker();
        let t0 = Utc::now();
        typing.set("general", "u1", true, t0).unwrap();
        typing
            .set("general", "u1", true, t0 + Duration::seconds(2))
            .unwrap();

        let at = t0 + Duration::seconds(4);
        assert_eq!(typing.typing_users("general", at), vec!["u1".to_string()]);
    }

    #[test]
    fn test_rejects_empty_ids() {
        let mut typing = tracker();
        assert_eq!(
            typing.set("", "u1", true, Utc::now()),
            Err(HubError::MissingField("channelId"))
        );
        assert_eq!(
            typing.set("general", "", true, Utc::now()),
            Err(HubError::MissingField("userId"))
        );
    }

    #[test]
    fn test_unknown_channel_reads_empty() {
        let typing = tracker();
        assert!(typing.map("nowhere").is_empty());
        assert!(typing.typing_users("nowhere", Utc::now()).is_empty());
    }
}
