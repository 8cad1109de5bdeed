//! Kernel — top-level context tying the event queue to the timers
//!
//! One [`Kernel`] is built at startup and shared by reference with the
//! interrupt handlers and the main loop. The tick interrupt calls
//! [`Kernel::tick`]; peripheral interrupts call [`Kernel::queue_fn`];
//! the main loop calls [`Kernel::run`] (or [`Kernel::process`] in its own
//! loop).
//!
//! ```ignore
//! static QUEUE: EventQueue<16> = EventQueue::new();
//! static KERNEL: Kernel<'static, 16, 4> = Kernel::new(&QUEUE);
//!
//! fn toggle_led(_: usize) {
//!     LED.toggle();
//!     KERNEL.add_timer(500, Event::from_fn(toggle_led));
//! }
//!
//! #[interrupt]
//! fn TIMER0() {
//!     KERNEL.tick();
//! }
//!
//! fn main() -> ! {
//!     KERNEL.add_timer(500, Event::from_fn(toggle_led));
//!     KERNEL.run(cortex_m::asm::wfi)
//! }
//! ```
//!
//! Author: stedmeister

use core::cell::Cell;

use critical_section::Mutex;
use log::debug;

use crate::config::{Ticks, DEFAULT_QUEUE_DEPTH, DEFAULT_TIMER_SLOTS};
use crate::critical;
use crate::error::Result;
use crate::event::{Event, EventFn};
use crate::queue::{EventQueue, EventSink, QueueStats};
use crate::timer::{TimerHandle, TimerService, Timers};

/// Kernel sized with the default queue depth and timer count
pub type DefaultKernel<'k> = Kernel<'k, DEFAULT_QUEUE_DEPTH, DEFAULT_TIMER_SLOTS>;

/// Event queue plus software timers
///
/// Memory footprint (defaults, 32-bit target):
/// - Timers: 8 slots × 12 bytes
/// - Tick counter: 8 bytes
/// - Queue: borrowed, 32 events × 8 bytes
pub struct Kernel<'k, const Q: usize, const T: usize> {
    /// Event queue (shared with interrupt producers)
    queue: &'k EventQueue<Q>,
    /// Software timers posting to `queue`
    timers: TimerService<'k, EventQueue<Q>, T>,
    /// Ticks since start
    ticks: Mutex<Cell<u64>>,
}

impl<'k, const Q: usize, const T: usize> Kernel<'k, Q, T> {
    /// Create a kernel around `queue`
    pub const fn new(queue: &'k EventQueue<Q>) -> Self {
        Self {
            queue,
            timers: TimerService::new(queue),
            ticks: Mutex::new(Cell::new(0)),
        }
    }

    /// Periodic tick; call from the timer interrupt
    pub fn tick(&self) {
        critical::with(|cs| {
            let ticks = self.ticks.borrow(cs);
            ticks.set(ticks.get().wrapping_add(1));
        });
        self.timers.tick();
    }

    /// Drain the event queue; call from the main loop
    ///
    /// Returns the number of events fired.
    pub fn process(&self) -> usize {
        self.queue.process()
    }

    /// Defer `event` to the main loop
    pub fn queue_event(&self, event: Event) -> Result<()> {
        self.queue.queue_event(event)
    }

    /// Defer `func(data)` to the main loop
    pub fn queue_fn(&self, func: EventFn, data: usize) -> Result<()> {
        self.queue.queue_fn(func, data)
    }

    /// Post `event` after `ticks` ticks; [`TimerHandle::INVALID`] on failure
    pub fn add_timer(&self, ticks: Ticks, event: Event) -> TimerHandle {
        self.timers.add(ticks, event)
    }

    /// Post `event` after `ticks` ticks
    pub fn try_add_timer(&self, ticks: Ticks, event: Event) -> Result<TimerHandle> {
        self.timers.try_add(ticks, event)
    }

    /// Cancel a pending timer
    pub fn remove_timer(&self, handle: TimerHandle) {
        self.timers.remove(handle);
    }

    /// Ticks since start
    pub fn now(&self) -> u64 {
        critical::with(|cs| self.ticks.borrow(cs).get())
    }

    /// Event queue the kernel drains
    pub fn queue(&self) -> &'k EventQueue<Q> {
        self.queue
    }

    /// Timer service posting to the queue
    pub fn timers(&self) -> &TimerService<'k, EventQueue<Q>, T> {
        &self.timers
    }

    /// Main loop: drain events, call `idle` whenever nothing was pending
    ///
    /// `idle` is typically the platform's wait-for-interrupt.
    pub fn run(&self, mut idle: impl FnMut()) -> ! {
        debug!("kernel running: {} queue slots, {} timers", Q - 1, T);
        loop {
            if self.process() == 0 {
                idle();
            }
        }
    }

    /// Simulate `ticks` tick interrupts, draining after each (testing)
    pub fn run_for(&self, ticks: u64) -> KernelStats {
        debug!("simulating {} ticks", ticks);
        let mut dispatched = 0u64;
        for _ in 0..ticks {
            self.tick();
            dispatched += self.process() as u64;
        }

        KernelStats {
            ticks,
            dispatched,
            ..self.stats()
        }
    }

    /// Totals since start
    pub fn stats(&self) -> KernelStats {
        let queue = self.queue.stats();
        KernelStats {
            ticks: self.now(),
            dispatched: queue.dispatched as u64,
            active_timers: self.timers.active_count(),
            queue,
        }
    }

    /// Memory footprint estimate (the borrowed queue excluded)
    pub fn memory_footprint(&self) -> usize {
        core::mem::size_of::<Self>()
    }
}

/// Kernel execution statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelStats {
    /// Ticks covered
    pub ticks: u64,
    /// Events fired
    pub dispatched: u64,
    /// Timers still armed
    pub active_timers: usize,
    /// Event queue counters
    pub queue: QueueStats,
}
