//! The hub context object.
//!
//! [`Hub`] composes the individual stores and the event bus. Each store
//! sits behind its own mutex. Mutations go through one dispatch queue per
//! hub, so listeners receive events in the order the stores changed, see
//! the new state and may call back into the hub.
//!
//! A listener must not block on another thread that writes to the same
//! hub: that writer waits for the listener's event to finish delivery.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::broadcast;
use tracing::{debug, info};

use campus_shared::constants::{DEFAULT_EVENT_BUFFER, DEFAULT_TYPING_TTL_SECS};
use campus_shared::{
    Announcement, AnnouncementDraft, EventKind, HubEvent, Message, MessageDraft, PresenceStatus,
    Result, Role, SystemStats, User,
};

use crate::announcements::AnnouncementLog;
use crate::bus::{EventBus, ListenerId, Subscription};
use crate::clock::{Clock, SystemClock};
use crate::dispatch::Dispatcher;
use crate::messages::MessageStore;
use crate::presence::PresenceRegistry;
use crate::stats::StatsHolder;
use crate::typing::{TypingMap, TypingTracker};

/// Hub settings.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// How long a typing signal keeps a user in the "typing" view.
    pub typing_ttl: StdDuration,
    /// Per-receiver capacity of the async event mirror.
    pub event_buffer: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            typing_ttl: StdDuration::from_secs(DEFAULT_TYPING_TTL_SECS),
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

/// Presence, messaging, announcement and stats state of one process.
pub struct Hub {
    dispatch: Dispatcher,
    clock: Arc<dyn Clock>,
    users: Mutex<PresenceRegistry>,
    messages: Mutex<MessageStore>,
    typing: Mutex<TypingTracker>,
    announcements: Mutex<AnnouncementLog>,
    stats: Mutex<StatsHolder>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // Store mutations are single-step and handlers never run under these
    // locks, so the data behind a poisoned lock is still consistent.
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Hub {
    pub fn new(config: HubConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: HubConfig, clock: Arc<dyn Clock>) -> Self {
        let ttl = Duration::from_std(config.typing_ttl)
            .unwrap_or_else(|_| Duration::seconds(DEFAULT_TYPING_TTL_SECS as i64));

        info!(
            typing_ttl_ms = ttl.num_milliseconds(),
            event_buffer = config.event_buffer,
            "Live hub created"
        );

        Self {
            dispatch: Dispatcher::new(EventBus::new(config.event_buffer)),
            clock,
            users: Mutex::new(PresenceRegistry::new()),
            messages: Mutex::new(MessageStore::new()),
            typing: Mutex::new(TypingTracker::new(ttl)),
            announcements: Mutex::new(AnnouncementLog::new()),
            stats: Mutex::new(StatsHolder::new()),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    pub fn on<F>(&self, kind: EventKind, handler: F) -> Subscription
    where
        F: Fn(&HubEvent) + Send + Sync + 'static,
    {
        self.dispatch.bus().on(kind, handler)
    }

    pub fn off(&self, kind: EventKind, id: ListenerId) -> bool {
        self.dispatch.bus().off(kind, id)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HubEvent> {
        self.dispatch.bus().subscribe()
    }

    // -----------------------------------------------------------------------
    // Presence
    // -----------------------------------------------------------------------

    /// Insert or replace a user and emit `user_updated`.
    pub fn add_user(&self, user: User) -> Result<User> {
        self.dispatch.commit(
            || lock(&self.users).upsert(user, self.clock.now()),
            |stored: &Result<User>| stored.as_ref().ok().cloned().map(HubEvent::UserUpdated),
        )
    }

    /// Change a user's status and emit `user_updated`. Unknown ids are
    /// ignored and emit nothing.
    pub fn update_user_status(&self, id: &str, status: PresenceStatus) -> Option<User> {
        let updated = self.dispatch.commit(
            || lock(&self.users).set_status(id, status, self.clock.now()),
            user_updated,
        );
        if updated.is_none() {
            debug!(user = %id, "Status update for unknown user ignored");
        }
        updated
    }

    /// Change a user's role ("promote") and emit `user_updated`.
    pub fn set_user_role(&self, id: &str, role: Role) -> Option<User> {
        self.dispatch
            .commit(|| lock(&self.users).set_role(id, role), user_updated)
    }

    /// Record the channel a user is viewing and emit `user_updated`.
    pub fn set_current_channel(&self, id: &str, channel: Option<String>) -> Option<User> {
        self.dispatch.commit(
            || lock(&self.users).set_current_channel(id, channel),
            user_updated,
        )
    }

    /// Remove a user. `user_removed` is emitted whether or not the user
    /// existed.
    pub fn remove_user(&self, id: &str) -> Option<User> {
        self.dispatch.commit(
            || lock(&self.users).remove(id),
            |_| {
                Some(HubEvent::UserRemoved {
                    user_id: id.to_string(),
                })
            },
        )
    }

    /// Copy of every known user, sorted by id.
    pub fn get_users(&self) -> Vec<User> {
        lock(&self.users).snapshot()
    }

    pub fn get_user(&self, id: &str) -> Option<User> {
        lock(&self.users).get(id)
    }

    /// Users whose status is not offline.
    pub fn online_count(&self) -> usize {
        lock(&self.users).connected_count()
    }

    // -----------------------------------------------------------------------
    // Messages
    // -----------------------------------------------------------------------

    /// Append a message to `channel_id` and emit `message_added`.
    pub fn add_message(&self, channel_id: &str, draft: MessageDraft) -> Result<Message> {
        self.dispatch.commit(
            || lock(&self.messages).append(channel_id, draft, self.clock.now()),
            |appended: &Result<Message>| {
                let message = appended.as_ref().ok()?.clone();
                Some(HubEvent::MessageAdded {
                    channel_id: channel_id.to_string(),
                    message,
                })
            },
        )
    }

    /// Messages of a channel in insertion order; empty if never written.
    pub fn get_messages(&self, channel_id: &str) -> Vec<Message> {
        lock(&self.messages).list(channel_id)
    }

    pub fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        content: impl Into<String>,
    ) -> Result<Option<Message>> {
        let content = content.into();
        self.dispatch.commit(
            || lock(&self.messages).edit(channel_id, message_id, content, self.clock.now()),
            |edited| message_updated(channel_id, edited),
        )
    }

    pub fn toggle_reaction(
        &self,
        channel_id: &str,
        message_id: &str,
        emoji: &str,
        user_id: &str,
    ) -> Result<Option<Message>> {
        self.dispatch.commit(
            || lock(&self.messages).toggle_reaction(channel_id, message_id, emoji, user_id),
            |toggled| message_updated(channel_id, toggled),
        )
    }

    /// Channels with at least one message.
    pub fn channels(&self) -> Vec<String> {
        lock(&self.messages).channels()
    }

    /// Messages sent across all channels at or after `since`.
    pub fn messages_since(&self, since: DateTime<Utc>) -> usize {
        lock(&self.messages).count_since(since)
    }

    // -----------------------------------------------------------------------
    // Typing
    // -----------------------------------------------------------------------

    /// Apply a typing signal and emit `typing_updated` with the channel's
    /// whole map.
    pub fn set_typing(&self, channel_id: &str, user_id: &str, is_typing: bool) -> Result<TypingMap> {
        self.dispatch.commit(
            || lock(&self.typing).set(channel_id, user_id, is_typing, self.clock.now()),
            |typing: &Result<TypingMap>| {
                let typing = typing.as_ref().ok()?.clone();
                Some(HubEvent::TypingUpdated {
                    channel_id: channel_id.to_string(),
                    typing,
                })
            },
        )
    }

    /// Users currently typing in `channel_id` (TTL applied).
    pub fn typing_users(&self, channel_id: &str) -> Vec<String> {
        lock(&self.typing).typing_users(channel_id, self.clock.now())
    }

    /// Stored typing entries of `channel_id`, stale ones included.
    pub fn typing_map(&self, channel_id: &str) -> TypingMap {
        lock(&self.typing).map(channel_id)
    }

    pub fn typing_ttl(&self) -> Duration {
        lock(&self.typing).ttl()
    }

    // -----------------------------------------------------------------------
    // Announcements
    // -----------------------------------------------------------------------

    pub fn add_announcement(&self, draft: AnnouncementDraft) -> Result<Announcement> {
        self.dispatch.commit(
            || lock(&self.announcements).append(draft, self.clock.now()),
            |added: &Result<Announcement>| added.as_ref().ok().cloned().map(HubEvent::AnnouncementAdded),
        )
    }

    /// Every announcement so far, oldest first.
    pub fn get_announcements(&self) -> Vec<Announcement> {
        lock(&self.announcements).all()
    }

    // -----------------------------------------------------------------------
    // System stats
    // -----------------------------------------------------------------------

    pub fn update_system_stats(&self, stats: SystemStats) -> SystemStats {
        self.dispatch.commit(
            || lock(&self.stats).replace(stats),
            |stored: &SystemStats| Some(HubEvent::SystemStatsUpdated(stored.clone())),
        )
    }

    pub fn get_system_stats(&self) -> SystemStats {
        lock(&self.stats).current()
    }
}

fn user_updated(user: &Option<User>) -> Option<HubEvent> {
    user.clone().map(HubEvent::UserUpdated)
}

fn message_updated(channel_id: &str, outcome: &Result<Option<Message>>) -> Option<HubEvent> {
    let message = outcome.as_ref().ok()?.as_ref()?.clone();
    Some(HubEvent::MessageUpdated {
        channel_id: channel_id.to_string(),
        message,
    })
}

impl Default for Hub {
    fn default() -> Self {
        Self::new(HubConfig::default())
    }
}
