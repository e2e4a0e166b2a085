//! Single-slot mailbox between the event producer (touch reader thread or
//! interrupt handler) and the polling loop.
//!
//! At most one event is in flight. The producer fills the slot and then
//! raises `pending` with release ordering; the consumer observes `pending`
//! with acquire ordering, takes the record and clears the flag before any
//! callback runs. Events posted while the slot is occupied are dropped and
//! counted.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};

use log::trace;

use crate::event::TouchEvent;

#[derive(Debug, Default)]
pub struct Mailbox {
    pending: AtomicBool,
    slot: Mutex<Option<TouchEvent>>,
    dropped: AtomicU32,
}

impl Mailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer an event. Returns `false` (and drops it) if the previous one
    /// has not been consumed yet.
    pub fn post(&self, event: TouchEvent) -> bool {
        if self.pending.load(Ordering::Acquire) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            trace!("Mailbox busy, dropped {}", event.name());
            return false;
        }
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(event);
        self.pending.store(true, Ordering::Release);
        true
    }

    /// Take the pending event, if any, and free the slot.
    pub fn take(&self) -> Option<TouchEvent> {
        if !self.pending.load(Ordering::Acquire) {
            return None;
        }
        let event = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.pending.store(false, Ordering::Release);
        event
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Number of events dropped because the slot was occupied.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}
