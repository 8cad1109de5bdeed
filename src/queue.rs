//! Event queue — the single hand-off point between interrupts and the
//! main loop
//!
//! Producers post [`Event`]s from any context. The main loop calls
//! [`EventSink::process`], which pops and fires events one at a time until
//! the queue is observed empty. Each pop is its own short critical section;
//! callbacks run with interrupts enabled, so events posted by a callback or
//! by an interrupt during the drain are fired by the same `process` call.
//!
//! There is no priority and no preemption between callbacks. A callback
//! that blocks stalls every other pending event.
//!
//! A full queue rejects new events ([`Error::QueueFull`]) rather than
//! overwriting: an overwritten ring reads as empty and would lose every
//! pending event, not just the oldest.
//!
//! Author: stedmeister

use core::cell::RefCell;

use critical_section::Mutex;
use log::{trace, warn};

use crate::critical::{self, CriticalSection};
use crate::error::{Error, Result};
use crate::event::{Event, EventFn};
use crate::ring::RingBuffer;

/// Anything events can be handed to
///
/// The timer service posts expirations through this trait, so an
/// alternate queue can be substituted without touching the timers.
pub trait EventSink {
    /// Enqueue `event` inside an already-open critical section
    fn post(&self, cs: CriticalSection<'_>, event: Event) -> Result<()>;

    /// Run every pending event, including ones posted while draining
    ///
    /// Returns the number of events fired.
    fn process(&self) -> usize;

    /// Enqueue `event`; callable from interrupt context
    fn queue_event(&self, event: Event) -> Result<()> {
        let posted = critical::with(|cs| self.post(cs, event));
        if posted.is_err() {
            warn!("event queue full, dropping event");
        }
        posted
    }

    /// Enqueue `func(data)`; callable from interrupt context
    fn queue_fn(&self, func: EventFn, data: usize) -> Result<()> {
        self.queue_event(Event::new(func, data))
    }
}

/// Event queue counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Events accepted
    pub queued: u32,
    /// Events fired
    pub dispatched: u32,
    /// Events refused because the queue was full
    pub rejected: u32,
    /// Deepest the queue has been
    pub high_water: usize,
}

impl QueueStats {
    const ZERO: QueueStats = QueueStats {
        queued: 0,
        dispatched: 0,
        rejected: 0,
        high_water: 0,
    };
}

struct QueueState<const S: usize> {
    events: RingBuffer<Event, S>,
    stats: QueueStats,
}

/// Fixed-depth event queue holding up to `S - 1` pending events
pub struct EventQueue<const S: usize> {
    state: Mutex<RefCell<QueueState<S>>>,
}

impl<const S: usize> EventQueue<S> {
    /// Create an empty queue
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(QueueState {
                events: RingBuffer::filled(Event::idle()),
                stats: QueueStats::ZERO,
            })),
        }
    }

    /// Pop the oldest event in its own critical section
    fn next_event(&self) -> Option<Event> {
        critical::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            let event = state.events.pop();
            if event.is_some() {
                state.stats.dispatched = state.stats.dispatched.wrapping_add(1);
            }
            event
        })
    }

    /// Number of pending events
    pub fn len(&self) -> usize {
        critical::with(|cs| self.state.borrow_ref(cs).events.len())
    }

    /// Is the queue empty?
    pub fn is_empty(&self) -> bool {
        critical::with(|cs| self.state.borrow_ref(cs).events.is_empty())
    }

    /// Maximum number of pending events
    pub const fn capacity(&self) -> usize {
        S - 1
    }

    /// Snapshot of the queue counters
    pub fn stats(&self) -> QueueStats {
        critical::with(|cs| self.state.borrow_ref(cs).stats)
    }

    /// Drop every pending event without firing it
    pub fn clear(&self) {
        critical::with(|cs| self.state.borrow_ref_mut(cs).events.clear());
    }
}

impl<const S: usize> EventSink for EventQueue<S> {
    fn post(&self, cs: CriticalSection<'_>, event: Event) -> Result<()> {
        let mut state = self.state.borrow_ref_mut(cs);
        if state.events.try_push(event).is_err() {
            state.stats.rejected = state.stats.rejected.wrapping_add(1);
            return Err(Error::QueueFull);
        }

        let depth = state.events.len();
        let stats = &mut state.stats;
        stats.queued = stats.queued.wrapping_add(1);
        stats.high_water = stats.high_water.max(depth);
        Ok(())
    }

    fn process(&self) -> usize {
        let mut fired = 0;
        while let Some(event) = self.next_event() {
            trace!("dispatch event data={:#x}", event.data());
            event.fire();
            fired += 1;
        }
        fired
    }
}

impl<const S: usize> Default for EventQueue<S> {
    fn default() -> Self {
        Self::new()
    }
}
