//! Ordered event delivery for hub mutations.
//!
//! A mutation and the queueing of its event happen under one lock, so the
//! queue order is the order in which the stores changed. Whichever thread
//! finds the queue idle drains it, emitting with the lock released so
//! listeners may call back into the hub. Events raised from inside a
//! listener are queued behind the one being delivered. Writers on other
//! threads block until their own event has gone out.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use tracing::trace;

use campus_shared::HubEvent;

use crate::bus::EventBus;

#[derive(Default)]
struct Queue {
    pending: VecDeque<(u64, HubEvent)>,
    queued: u64,
    delivered: u64,
    drainer: Option<ThreadId>,
}

pub(crate) struct Dispatcher {
    bus: EventBus,
    queue: Mutex<Queue>,
    progress: Condvar,
}

impl Dispatcher {
    pub(crate) fn new(bus: EventBus) -> Self {
        Self {
            bus,
            queue: Mutex::new(Queue::default()),
            progress: Condvar::new(),
        }
    }

    pub(crate) fn bus(&self) -> &EventBus {
        &self.bus
    }

    fn queue(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `apply`, then deliver the event `event_for` derives from its
    /// outcome, if any. Returns the outcome once that event has reached
    /// every listener, or immediately when called from inside a listener.
    pub(crate) fn commit<T>(
        &self,
        apply: impl FnOnce() -> T,
        event_for: impl FnOnce(&T) -> Option<HubEvent>,
    ) -> T {
        let mut queue = self.queue();
        let outcome = apply();
        let Some(event) = event_for(&outcome) else {
            return outcome;
        };

        queue.queued += 1;
        let seq = queue.queued;
        queue.pending.push_back((seq, event));

        let me = thread::current().id();
        match queue.drainer {
            // Raised by a listener; the drain loop up the stack delivers it.
            Some(owner) if owner == me => return outcome,
            Some(_) => {
                while queue.delivered < seq {
                    queue = self
                        .progress
                        .wait(queue)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                return outcome;
            }
            None => queue.drainer = Some(me),
        }

        loop {
            let Some((seq, event)) = queue.pending.pop_front() else {
                break;
            };
            drop(queue);

            trace!(event = %event.kind(), seq, "Dispatching event");
            self.bus.emit(event);

            queue = self.queue();
            queue.delivered = seq;
            self.progress.notify_all();
        }
        queue.drainer = None;
        outcome
    }
}
