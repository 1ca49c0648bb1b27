//! Synchronous publish/subscribe primitive.
//!
//! Listeners register per [`EventKind`] and are invoked in registration
//! order on the emitting thread before [`EventBus::emit`] returns. Every
//! emitted event is also mirrored onto a bounded `tokio::sync::broadcast`
//! channel so async tasks can follow the hub without registering a
//! callback.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::sync::broadcast;
use tracing::{trace, warn};

use campus_shared::{EventKind, HubEvent};

/// Callback invoked for every matching event.
pub type Handler = Arc<dyn Fn(&HubEvent) + Send + Sync>;

/// Identifies one registration. Two registrations of the same closure get
/// two different ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

struct Listener {
    id: ListenerId,
    handler: Handler,
}

struct BusInner {
    listeners: Mutex<HashMap<EventKind, Vec<Listener>>>,
    next_id: AtomicU64,
    mirror: broadcast::Sender<HubEvent>,
}

impl BusInner {
    fn listeners(&self) -> MutexGuard<'_, HashMap<EventKind, Vec<Listener>>> {
        // Handlers never run under this lock, so a poisoned guard still
        // holds a consistent map.
        self.listeners.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn remove(&self, kind: EventKind, id: ListenerId) -> bool {
        let mut listeners = self.listeners();
        let Some(list) = listeners.get_mut(&kind) else {
            return false;
        };
        let Some(pos) = list.iter().position(|l| l.id == id) else {
            return false;
        };
        list.remove(pos);
        if list.is_empty() {
            listeners.remove(&kind);
        }
        true
    }
}

/// Cloneable handle to a shared listener table.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    /// Create a bus whose async mirror buffers up to `capacity` events per
    /// receiver.
    pub fn new(capacity: usize) -> Self {
        let (mirror, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(BusInner {
                listeners: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                mirror,
            }),
        }
    }

    /// Register `handler` for every future event of `kind`.
    ///
    /// The listener stays registered until the returned [`Subscription`] is
    /// dropped, [`EventBus::off`] is called with its id, or forever if the
    /// subscription is detached.
    pub fn on<F>(&self, kind: EventKind, handler: F) -> Subscription
    where
        F: Fn(&HubEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner
            .listeners()
            .entry(kind)
            .or_default()
            .push(Listener {
                id,
                handler: Arc::new(handler),
            });

        trace!(event = %kind, listener = id.0, "Listener registered");

        Subscription {
            bus: Arc::downgrade(&self.inner),
            kind,
            id,
            active: true,
        }
    }

    /// Remove exactly one registration. Returns `false` if `id` was not
    /// registered for `kind`.
    pub fn off(&self, kind: EventKind, id: ListenerId) -> bool {
        let removed = self.inner.remove(kind, id);
        if removed {
            trace!(event = %kind, listener = id.0, "Listener removed");
        }
        removed
    }

    /// Deliver `event` to every listener registered for its kind at the
    /// time of the call, then to the async mirror.
    ///
    /// A panicking listener is logged and skipped; the remaining listeners
    /// still run. Returns how many listeners completed normally.
    pub fn emit(&self, event: HubEvent) -> usize {
        let kind = event.kind();
        let handlers: Vec<(ListenerId, Handler)> = self
            .inner
            .listeners()
            .get(&kind)
            .map(|list| {
                list.iter()
                    .map(|l| (l.id, Arc::clone(&l.handler)))
                    .collect()
            })
            .unwrap_or_default();

        let mut delivered = 0;
        for (id, handler) in handlers {
            match panic::catch_unwind(AssertUnwindSafe(|| handler(&event))) {
                Ok(()) => delivered += 1,
                Err(_) => {
                    warn!(event = %kind, listener = id.0, "Listener panicked, continuing delivery");
                }
            }
        }

        // No receivers is not an error.
        let _ = self.inner.mirror.send(event);

        delivered
    }

    /// Follow every emitted event from an async task.
    ///
    /// Slow receivers lag and lose the oldest events; synchronous listeners
    /// are unaffected.
    pub fn subscribe(&self) -> broadcast::Receiver<HubEvent> {
        self.inner.mirror.subscribe()
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.inner.listeners().get(&kind).map_or(0, Vec::len)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(campus_shared::constants::DEFAULT_EVENT_BUFFER)
    }
}

/// Handle returned by [`EventBus::on`]. Dropping it unregisters the
/// listener.
#[must_use = "dropping a Subscription unregisters its listener"]
pub struct Subscription {
    bus: Weak<BusInner>,
    kind: EventKind,
    id: ListenerId,
    active: bool,
}

impl Subscription {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Keep the listener registered for the lifetime of the bus.
    pub fn detach(mut self) -> ListenerId {
        self.active = false;
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if !self.active {
            return;
        }
        if let Some(inner) = self.bus.upgrade() {
            inner.remove(self.kind, self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .field("active", &self.active)
            .finish()
    }
}
