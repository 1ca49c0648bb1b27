//! Presence registry.
//!
//! Maintains the map of known users keyed by id. Inserts are upserts with
//! last-write-wins semantics; updates against an unknown id are ignored so
//! that callers holding stale ids never fail.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use campus_shared::{HubError, PresenceStatus, Result, Role, User};

#[derive(Debug, Clone, Default)]
pub struct PresenceRegistry {
    users: HashMap<String, User>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or fully replace the record for `user.id`.
    ///
    /// `last_seen` is stamped with `now`. Returns the stored record.
    pub fn upsert(&mut self, mut user: User, now: DateTime<Utc>) -> Result<User> {
        if user.id.trim().is_empty() {
            return Err(HubError::MissingField("id"));
        }
        if user.name.trim().is_empty() {
            return Err(HubError::MissingField("name"));
        }

        user.last_seen = now;
        let replaced = self.users.insert(user.id.clone(), user.clone()).is_some();

        debug!(user = %user.id, status = %user.status, replaced, "Upserted user");
        Ok(user)
    }

    /// Set the status of a known user. `None` if `id` is unknown.
    pub fn set_status(
        &mut self,
        id: &str,
        status: PresenceStatus,
        now: DateTime<Utc>,
    ) -> Option<User> {
        let user = self.users.get_mut(id)?;
        user.status = status;
        user.last_seen = now;
        debug!(user = %id, status = %status, "Updated user status");
        Some(user.clone())
    }

    /// Change the role of a known user. `None` if `id` is unknown.
    pub fn set_role(&mut self, id: &str, role: Role) -> Option<User> {
        let user = self.users.get_mut(id)?;
        user.role = role;
        debug!(user = %id, role = %role, "Updated user role");
        Some(user.clone())
    }

    /// Record which channel a known user is viewing.
    pub fn set_current_channel(&mut self, id: &str, channel: Option<String>) -> Option<User> {
        let user = self.users.get_mut(id)?;
        user.current_channel = channel;
        Some(user.clone())
    }

    /// Remove a user, returning the old record if there was one.
    pub fn remove(&mut self, id: &str) -> Option<User> {
        let removed = self.users.remove(id);
        if removed.is_some() {
            debug!(user = %id, "Removed user from registry");
        }
        removed
    }

    pub fn get(&self, id: &str) -> Option<User> {
        self.users.get(id).cloned()
    }

    /// All records, sorted by id. The returned vector is a copy.
    pub fn snapshot(&self) -> Vec<User> {
        let mut users: Vec<User> = self.users.values().cloned().collect();
        users.sort_by(|a, b| a.id.cmp(&b.id));
        users
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Number of users whose status is not offline.
    pub fn connected_count(&self) -> usize {
        self.users
            .values()
            .filter(|u| u.status.is_connected())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn alice() -> User {
        User::new("u1", "Alice", Role::Student)
    }

    #[test]
    fn test_upsert_replaces_existing() {
        let mut registry = PresenceRegistry::new();
        let now = Utc::now();

        registry.upsert(alice(), now).unwrap();
        let renamed = User {
            name: "Alice B.".into(),
            ..alice()
        }
        .with_status(PresenceStatus::Busy);
        registry.upsert(renamed, now).unwrap();

        assert_eq!(registry.len(), 1);
        let stored = registry.get("u1").unwrap();
        assert_eq!(stored.name, "Alice B.");
        assert_eq!(stored.status, PresenceStatus::Busy);
    }

    #[test]
    fn test_upsert_does_not_merge_fields() {
        let mut registry = PresenceRegistry::new();
        let now = Utc::now();

        registry
            .upsert(alice().with_avatar("/a.png"), now)
            .unwrap();
        registry.upsert(alice(), now).unwrap();

        assert!(registry.get("u1").unwrap().avatar.is_none());
    }

    #[test]
    fn test_upsert_stamps_last_seen() {
        let mut registry = PresenceRegistry::new();
        let now = Utc::now() + Duration::minutes(3);
        let stored = registry.upsert(alice(), now).unwrap();
        assert_eq!(stored.last_seen, now);
    }

    #[test]
    fn test_upsert_rejects_missing_fields() {
        let mut registry = PresenceRegistry::new();
        let now = Utc::now();

        let no_id = User::new("", "Alice", Role::Student);
        assert_eq!(registry.upsert(no_id, now), Err(HubError::MissingField("id")));

        let no_name = User::new("u1", "  ", Role::Student);
        assert_eq!(
            registry.upsert(no_name, now),
            Err(HubError::MissingField("name"))
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_set_status_unknown_user() {
        let mut registry = PresenceRegistry::new();
        assert!(registry
            .set_status("ghost", PresenceStatus::Away, Utc::now())
            .is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_set_status_updates_last_seen() {
        let mut registry = PresenceRegistry::new();
        let t0 = Utc::now();
        registry.upsert(alice(), t0).unwrap();

        let t1 = t0 + Duration::seconds(30);
        let updated = registry.set_status("u1", PresenceStatus::Away, t1).unwrap();
        assert_eq!(updated.status, PresenceStatus::Away);
        assert_eq!(updated.last_seen, t1);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let mut registry = PresenceRegistry::new();
        registry.upsert(alice(), Utc::now()).unwrap();

        let mut snapshot = registry.snapshot();
        snapshot[0].name = "Mallory".into();
        snapshot.clear();

        assert_eq!(registry.get("u1").unwrap().name, "Alice");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_connected_count_skips_offline() {
        let mut registry = PresenceRegistry::new();
        let now = Utc::now();
        registry.upsert(alice(), now).unwrap();
        registry
            .upsert(
                User::new("u2", "Bob", Role::Teacher).with_status(PresenceStatus::Offline),
                now,
            )
            .unwrap();
        registry
            .upsert(
                User::new("u3", "Cara", Role::Admin).with_status(PresenceStatus::Away),
                now,
            )
            .unwrap();

        assert_eq!(registry.connected_count(), 2);
    }

    #[test]
    fn test_role_and_channel_updates() {
        let mut registry = PresenceRegistry::new();
        registry.upsert(alice(), Utc::now()).unwrap();

        let promoted = registry.set_role("u1", Role::Teacher).unwrap();
        assert_eq!(promoted.role, Role::Teacher);

        let moved = registry
            .set_current_channel("u1", Some("general".into()))
            .unwrap();
        assert_eq!(moved.current_channel.as_deref(), Some("general"));

        assert!(registry.set_role("ghost", Role::Admin).is_none());
    }
}
