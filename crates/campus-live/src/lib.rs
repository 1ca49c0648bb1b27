//! # campus-live
//!
//! In-memory presence and channel messaging hub.
//!
//! A [`Hub`] owns one registry of connected users, the per-channel message
//! logs and typing maps, the announcement list and the last system stats
//! snapshot. Every mutation updates its store and then emits a [`HubEvent`]
//! on the hub's [`EventBus`], which fans it out synchronously to registered
//! listeners and mirrors it onto a broadcast channel for async consumers.
//! Events reach listeners in the order the stores changed, even with
//! writers on several threads.
//!
//! The hub is a plain context object: construct it once at startup and
//! share it as `Arc<Hub>`. Each hub is independent; nothing is shared
//! between processes.

pub mod announcements;
pub mod bus;
pub mod clock;
mod dispatch;
pub mod hub;
pub mod messages;
pub mod presence;
pub mod stats;
pub mod typing;

pub use bus::{EventBus, ListenerId, Subscription};
pub use clock::{Clock, ManualClock, SystemClock};
pub use hub::{Hub, HubConfig};

pub use campus_shared::{EventKind, HubError, HubEvent};
