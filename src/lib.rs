//! StedOS — cooperative event kernel for microcontrollers
//!
//! Interrupts defer work; the main loop runs it.
//!
//! Minimal kernel for single-core parts with two contexts (interrupt and
//! main loop):
//! - Fixed-capacity ring buffers (no heap, no allocation)
//! - Deferred-callback event queue, the single hand-off point from
//!   interrupts to the main loop
//! - Software timers that turn periodic ticks into deferred events
//! - Scoped interrupt masking via `critical-section`
//!
//! # Quick start
//! ```
//! use stedos::{Event, EventQueue, Kernel};
//!
//! static QUEUE: EventQueue<8> = EventQueue::new();
//! static KERNEL: Kernel<'static, 8, 4> = Kernel::new(&QUEUE);
//!
//! fn on_timeout(data: usize) {
//!     assert_eq!(data, 7);
//! }
//!
//! KERNEL.add_timer(3, Event::new(on_timeout, 7));
//! let stats = KERNEL.run_for(3);
//! assert_eq!(stats.dispatched, 1);
//! ```
//!
//! # No-std
//! The crate is `#![no_std]`. The binary must link a `critical-section`
//! implementation (the HAL usually provides one; hosted builds enable the
//! `std` feature).
//!
//! Author: stedmeister

#![no_std]

pub mod config;
pub mod critical;
pub mod error;
pub mod event;
pub mod kernel;
pub mod queue;
pub mod ring;
pub mod timer;

pub use config::{Ticks, TickRate};
pub use error::{Error, Result};
pub use event::{Event, EventFn};
pub use kernel::{DefaultKernel, Kernel, KernelStats};
pub use queue::{EventQueue, EventSink, QueueStats};
pub use ring::{RingBuffer, SharedRing};
pub use timer::{TimerHandle, TimerService, Timers};

#[cfg(test)]
extern crate std;
