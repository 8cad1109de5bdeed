//! Software timers — countdown slots driven by the periodic tick
//!
//! A fixed table of `S` slots. Each armed slot counts down once per
//! [`Timers::tick`]; when it reaches zero its event is posted to the event
//! sink. Expired events are never fired from `tick` itself, which usually
//! runs in the timer interrupt, so the queue stays the only dispatch point.
//!
//! A timer armed with `T` ticks fires on exactly the `T`-th following tick.
//!
//! # Handles
//! [`TimerHandle`] carries the slot index plus the slot's generation,
//! bumped every time the slot is armed. `remove` on a handle whose timer
//! already fired, was removed, or whose slot now belongs to a newer timer
//! does nothing. Generations are 8 bits, so a handle held across 256
//! re-arms of the same slot can alias again.
//!
//! Author: stedmeister

use core::cell::RefCell;

use critical_section::Mutex;
use log::{trace, warn};

use crate::config::{Ticks, INVALID_SLOT, MAX_TIMER_SLOTS};
use crate::critical;
use crate::error::{Error, Result};
use crate::event::Event;
use crate::queue::EventSink;

/// Identifies one armed timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle {
    slot: u8,
    generation: u8,
}

impl TimerHandle {
    /// Returned by [`Timers::add`] when no slot is available
    pub const INVALID: TimerHandle = TimerHandle {
        slot: INVALID_SLOT,
        generation: 0,
    };

    /// Slot index in the timer table
    pub const fn slot(&self) -> u8 {
        self.slot
    }

    /// `false` for [`TimerHandle::INVALID`]
    pub const fn is_valid(&self) -> bool {
        self.slot != INVALID_SLOT
    }
}

/// Timer policy
///
/// [`TimerService`] is the linear-scan implementation. Another policy
/// (sorted list, delta queue) can stand in without changing callers.
pub trait Timers {
    /// Advance every armed timer by one tick; call from the tick interrupt
    fn tick(&self);

    /// Arm a timer firing `event` after `ticks` ticks
    fn try_add(&self, ticks: Ticks, event: Event) -> Result<TimerHandle>;

    /// Disarm a pending timer
    ///
    /// Fails with [`Error::InvalidHandle`] if the handle does not name a
    /// pending timer.
    fn cancel(&self, handle: TimerHandle) -> Result<()>;

    /// Arm a timer, returning [`TimerHandle::INVALID`] on failure
    fn add(&self, ticks: Ticks, event: Event) -> TimerHandle {
        self.try_add(ticks, event).unwrap_or(TimerHandle::INVALID)
    }

    /// Disarm a timer; no-op for fired, removed, stale or invalid handles
    fn remove(&self, handle: TimerHandle) {
        self.cancel(handle).ok();
    }
}

/// One countdown slot; `ticks == 0` means free
#[derive(Clone, Copy)]
struct TimerSlot {
    ticks: Ticks,
    generation: u8,
    event: Event,
}

impl TimerSlot {
    const FREE: TimerSlot = TimerSlot {
        ticks: 0,
        generation: 0,
        event: Event::idle(),
    };

    fn is_free(&self) -> bool {
        self.ticks == 0
    }

    fn matches(&self, handle: TimerHandle) -> bool {
        !self.is_free() && self.generation == handle.generation
    }
}

/// Fixed table of `S` software timers posting to a shared event sink
pub struct TimerService<'q, Q: EventSink + ?Sized, const S: usize> {
    /// Where expired events go (shared, not owned)
    sink: &'q Q,
    slots: Mutex<RefCell<[TimerSlot; S]>>,
}

impl<'q, Q: EventSink + ?Sized, const S: usize> TimerService<'q, Q, S> {
    const SLOT_CHECK: () = assert!(
        S >= 1 && S <= MAX_TIMER_SLOTS,
        "timer slot count must be within 1..=255"
    );

    /// Create a timer table with every slot free
    pub const fn new(sink: &'q Q) -> Self {
        let () = Self::SLOT_CHECK;
        Self {
            sink,
            slots: Mutex::new(RefCell::new([TimerSlot::FREE; S])),
        }
    }

    /// Event sink expirations are posted to
    pub fn sink(&self) -> &'q Q {
        self.sink
    }

    /// Number of slots
    pub const fn capacity(&self) -> usize {
        S
    }

    /// Number of armed timers
    pub fn active_count(&self) -> usize {
        critical::with(|cs| {
            self.slots
                .borrow_ref(cs)
                .iter()
                .filter(|slot| !slot.is_free())
                .count()
        })
    }

    /// Is the timer behind `handle` still counting down?
    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.remaining(handle).is_some()
    }

    /// Ticks left before the timer behind `handle` fires
    pub fn remaining(&self, handle: TimerHandle) -> Option<Ticks> {
        critical::with(|cs| {
            self.slots
                .borrow_ref(cs)
                .get(handle.slot as usize)
                .filter(|slot| slot.matches(handle))
                .map(|slot| slot.ticks)
        })
    }

    /// Disarm every timer
    pub fn clear(&self) {
        critical::with(|cs| {
            for slot in self.slots.borrow_ref_mut(cs).iter_mut() {
                slot.ticks = 0;
                slot.event = Event::idle();
            }
        });
    }
}

impl<'q, Q: EventSink + ?Sized, const S: usize> Timers for TimerService<'q, Q, S> {
    fn tick(&self) {
        let (expired, dropped) = critical::with(|cs| {
            let mut slots = self.slots.borrow_ref_mut(cs);
            let (mut expired, mut dropped) = (0usize, 0usize);
            for slot in slots.iter_mut().filter(|slot| !slot.is_free()) {
                slot.ticks -= 1;
                if slot.ticks == 0 {
                    expired += 1;
                    if self.sink.post(cs, slot.event).is_err() {
                        dropped += 1;
                    }
                }
            }
            (expired, dropped)
        });

        if expired > 0 {
            trace!("{} timer(s) expired", expired);
        }
        if dropped > 0 {
            warn!("{} expired timer event(s) dropped, queue full", dropped);
        }
    }

    fn try_add(&self, ticks: Ticks, event: Event) -> Result<TimerHandle> {
        if ticks == 0 {
            warn!("refusing zero-tick timer");
            return Err(Error::ZeroTimeout);
        }

        let added: Result<TimerHandle> = critical::with(|cs| {
            let mut slots = self.slots.borrow_ref_mut(cs);
            let (idx, slot) = slots
                .iter_mut()
                .enumerate()
                .find(|(_, slot)| slot.is_free())
                .ok_or(Error::NoFreeSlot)?;

            slot.ticks = ticks;
            slot.event = event;
            slot.generation = slot.generation.wrapping_add(1);
            Ok(TimerHandle {
                slot: idx as u8,
                generation: slot.generation,
            })
        });

        if added.is_err() {
            warn!("all {} timer slots in use", S);
        }
        added
    }

    fn cancel(&self, handle: TimerHandle) -> Result<()> {
        critical::with(|cs| {
            let mut slots = self.slots.borrow_ref_mut(cs);
            match slots.get_mut(handle.slot as usize) {
                Some(slot) if slot.matches(handle) => {
                    slot.ticks = 0;
                    slot.event = Event::idle();
                    Ok(())
                }
                _ => Err(Error::InvalidHandle),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::EventQueue;
    use crate::ring::SharedRing;
    use std::vec::Vec;

    fn drain(log: &SharedRing<usize, 32>) -> Vec<usize> {
        core::iter::from_fn(|| log.pop()).collect()
    }

    fn noop(_: usize) {}

    #[test]
    fn test_handles_are_sequential_then_invalid() {
        let queue = EventQueue::<8>::new();
        let timers = TimerService::<_, 4>::new(&queue);

        let handles: Vec<u8> = (0..4)
            .map(|i| timers.add(10, Event::new(noop, i)).slot())
            .collect();
        assert_eq!(handles, [0, 1, 2, 3]);

        let fifth = timers.add(10, Event::from_fn(noop));
        assert_eq!(fifth, TimerHandle::INVALID);
        assert!(!fifth.is_valid());
        assert_eq!(
            timers.try_add(10, Event::from_fn(noop)),
            Err(Error::NoFreeSlot)
        );
        assert_eq!(timers.active_count(), 4);
    }

    #[test]
    fn test_fires_on_exact_tick() {
        static FIRED: SharedRing<usize, 32> = SharedRing::filled(0);
        fn fire(data: usize) {
            FIRED.push(data);
        }

        let queue = EventQueue::<8>::new();
        let timers = TimerService::<_, 4>::new(&queue);

        assert_eq!(timers.add(4, Event::new(fire, 1)).slot(), 0);
        assert_eq!(timers.add(1, Event::new(fire, 2)).slot(), 1);
        assert_eq!(timers.add(2, Event::new(fire, 3)).slot(), 2);
        assert_eq!(timers.add(2, Event::new(fire, 4)).slot(), 3);
        assert!(!timers.add(1, Event::new(fire, 5)).is_valid());

        timers.tick();
        queue.process();
        assert_eq!(drain(&FIRED), [2]);

        timers.tick();
        queue.process();
        assert_eq!(drain(&FIRED), [3, 4]);

        timers.tick();
        queue.process();
        assert!(drain(&FIRED).is_empty());

        timers.tick();
        queue.process();
        assert_eq!(drain(&FIRED), [1]);
        assert_eq!(timers.active_count(), 0);
    }

    #[test]
    fn test_tick_posts_but_does_not_fire() {
        static FIRED: SharedRing<usize, 32> = SharedRing::filled(0);
        fn fire(data: usize) {
            FIRED.push(data);
        }

        let queue = EventQueue::<8>::new();
        let timers = TimerService::<_, 2>::new(&queue);
        timers.add(1, Event::new(fire, 7));

        timers.tick();
        assert!(drain(&FIRED).is_empty());
        assert_eq!(queue.len(), 1);

        queue.process();
        assert_eq!(drain(&FIRED), [7]);
    }

    #[test]
    fn test_remove_before_expiry_prevents_event() {
        let queue = EventQueue::<8>::new();
        let timers = TimerService::<_, 2>::new(&queue);

        let handle = timers.add(2, Event::from_fn(noop));
        timers.tick();
        assert_eq!(timers.remaining(handle), Some(1));
        timers.remove(handle);
        assert!(!timers.is_pending(handle));

        timers.tick();
        timers.tick();
        assert!(queue.is_empty());
    }

    #[test]
    fn test_remove_after_expiry_is_noop() {
        let queue = EventQueue::<8>::new();
        let timers = TimerService::<_, 2>::new(&queue);

        let handle = timers.add(1, Event::from_fn(noop));
        timers.tick();
        assert_eq!(timers.cancel(handle), Err(Error::InvalidHandle));
        timers.remove(handle);
        timers.remove(TimerHandle::INVALID);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_zero_timeout_consumes_no_slot() {
        let queue = EventQueue::<8>::new();
        let timers = TimerService::<_, 1>::new(&queue);

        assert_eq!(
            timers.try_add(0, Event::from_fn(noop)),
            Err(Error::ZeroTimeout)
        );
        assert_eq!(timers.add(0, Event::from_fn(noop)), TimerHandle::INVALID);
        assert_eq!(timers.active_count(), 0);
        assert!(timers.add(1, Event::from_fn(noop)).is_valid());
    }

    #[test]
    fn test_stale_handle_cannot_cancel_new_occupant() {
        let queue = EventQueue::<8>::new();
        let timers = TimerService::<_, 1>::new(&queue);

        let old = timers.add(5, Event::from_fn(noop));
        timers.remove(old);
        let new = timers.add(5, Event::from_fn(noop));
        assert_eq!(old.slot(), new.slot());
        assert_ne!(old, new);

        timers.remove(old);
        assert!(timers.is_pending(new));
        assert_eq!(timers.remaining(new), Some(5));
    }

    #[test]
    fn test_full_queue_still_frees_slot() {
        let queue = EventQueue::<2>::new();
        let timers = TimerService::<_, 2>::new(&queue);

        timers.add(1, Event::new(noop, 1));
        timers.add(1, Event::new(noop, 2));
        timers.tick();

        assert_eq!(queue.len(), 1);
        assert_eq!(queue.stats().rejected, 1);
        assert_eq!(timers.active_count(), 0);
    }

    #[test]
    fn test_dyn_sink() {
        let queue = EventQueue::<4>::new();
        let sink: &dyn EventSink = &queue;
        let timers: TimerService<'_, dyn EventSink, 2> = TimerService::new(sink);

        timers.add(1, Event::from_fn(noop));
        timers.tick();
        assert_eq!(timers.sink().process(), 1);
    }

    #[test]
    fn test_static_service() {
        static QUEUE: EventQueue<4> = EventQueue::new();
        static TIMERS: TimerService<'static, EventQueue<4>, 2> = TimerService::new(&QUEUE);

        let handle = TIMERS.add(3, Event::from_fn(noop));
        assert_eq!(TIMERS.capacity(), 2);
        TIMERS.clear();
        assert!(!TIMERS.is_pending(handle));
    }
}
