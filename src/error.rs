//! Kernel error type
//!
//! Nothing in the kernel panics or retries. Every recoverable failure
//! is reported through [`Error`]; the sentinel-returning calls have a
//! `try_` twin returning [`Result`].
//!
//! Author: stedmeister

use thiserror::Error;

/// Kernel errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// The event queue holds its maximum number of pending events
    #[error("event queue is full")]
    QueueFull,
    /// A ring buffer refused a write under the reject policy
    #[error("ring buffer is full")]
    RingFull,
    /// Every timer slot is armed
    #[error("no free timer slot")]
    NoFreeSlot,
    /// A timer was requested with a timeout of zero ticks
    #[error("timer timeout must be at least one tick")]
    ZeroTimeout,
    /// The handle is the sentinel, out of range, or stale
    #[error("invalid timer handle")]
    InvalidHandle,
}

/// Kernel result alias
pub type Result<T> = core::result::Result<T, Error>;
