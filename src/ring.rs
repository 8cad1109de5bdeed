//! Fixed-capacity circular FIFO
//!
//! [`RingBuffer`] is the plain container: `&mut self`, no locking, usable
//! from a single context or from inside a critical section.
//! [`SharedRing`] wraps it in a critical-section mutex so interrupt
//! handlers and the main loop can share one instance through `&self`.
//!
//! # Index walk
//! `push` advances `head` and then stores; `pop` advances `tail` and then
//! reads. The ring is empty exactly when `head == tail`, so one slot is
//! always sacrificed and the usable capacity is `N - 1`.
//!
//! # Overflow and underflow
//! Both policies are chosen by the caller:
//! - [`RingBuffer::push`] overwrites. Pushing onto a full ring walks `head`
//!   over unread data, and the ring then reports fewer (possibly zero)
//!   pending elements than were written.
//! - [`RingBuffer::try_push`] rejects and hands the value back.
//! - [`RingBuffer::pop`] / [`RingBuffer::peek`] return `None` when empty.
//! - [`RingBuffer::pop_wrapping`] advances `tail` regardless and returns
//!   whatever the slot holds. Storage is always initialised, so the value is
//!   stale, never undefined.
//!
//! Author: stedmeister

use core::cell::RefCell;

use critical_section::Mutex;

use crate::config::MAX_RING_CAPACITY;
use crate::critical::{self, CriticalSection};
use crate::error::{Error, Result};

/// Fixed-capacity FIFO with `u8` indices, `1 <= N <= 256`
pub struct RingBuffer<T: Copy, const N: usize> {
    /// Element storage
    buffer: [T; N],
    /// Index of the most recently written slot
    head: u8,
    /// Index of the most recently read slot
    tail: u8,
}

impl<T: Copy, const N: usize> RingBuffer<T, N> {
    const CAPACITY_CHECK: () = assert!(
        N >= 1 && N <= MAX_RING_CAPACITY,
        "ring capacity must be within 1..=256"
    );

    /// Create an empty ring with every slot set to `value`
    pub const fn filled(value: T) -> Self {
        let () = Self::CAPACITY_CHECK;
        Self {
            buffer: [value; N],
            head: 0,
            tail: 0,
        }
    }

    /// Next index after `idx`, wrapping at `N`
    #[inline(always)]
    const fn advance(idx: u8) -> u8 {
        if N == MAX_RING_CAPACITY {
            wrap_natural(idx)
        } else if N.is_power_of_two() {
            wrap_mask(idx, N)
        } else {
            wrap_compare(idx, N)
        }
    }

    /// Write `value`, overwriting unread data if the ring is full
    #[inline]
    pub fn push(&mut self, value: T) {
        self.head = Self::advance(self.head);
        self.buffer[self.head as usize] = value;
    }

    /// Write `value` unless the ring already holds `N - 1` elements
    ///
    /// Returns the value back when full.
    #[inline]
    pub fn try_push(&mut self, value: T) -> core::result::Result<(), T> {
        if self.is_full() {
            return Err(value);
        }
        self.push(value);
        Ok(())
    }

    /// Remove the oldest element, `None` if empty
    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        if self.is_empty() {
            None
        } else {
            Some(self.pop_wrapping())
        }
    }

    /// Advance `tail` and return that slot without checking for emptiness
    ///
    /// On an empty ring this yields a stale element and leaves `tail` one
    /// past `head`; callers that care check [`is_empty`](Self::is_empty)
    /// first.
    #[inline]
    pub fn pop_wrapping(&mut self) -> T {
        self.tail = Self::advance(self.tail);
        self.buffer[self.tail as usize]
    }

    /// Look at the oldest element without removing it
    #[inline]
    pub fn peek(&self) -> Option<T> {
        if self.is_empty() {
            None
        } else {
            Some(self.buffer[Self::advance(self.tail) as usize])
        }
    }

    /// Is the ring empty?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    /// Would the next `push` overwrite unread data?
    #[inline]
    pub fn is_full(&self) -> bool {
        Self::advance(self.head) == self.tail
    }

    /// Number of unread elements
    #[inline]
    pub fn len(&self) -> usize {
        (self.head as usize + N - self.tail as usize) % N
    }

    /// Usable capacity (one slot reserved for full/empty distinction)
    #[inline]
    pub const fn capacity(&self) -> usize {
        N - 1
    }

    /// Discard all unread elements
    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
    }
}

impl<T: Copy + Default, const N: usize> RingBuffer<T, N> {
    /// Create an empty ring filled with `T::default()`
    pub fn new() -> Self {
        Self::filled(T::default())
    }
}

impl<T: Copy + Default, const N: usize> Default for RingBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

/// 256 slots on a `u8` index: overflow is the wrap
#[inline(always)]
const fn wrap_natural(idx: u8) -> u8 {
    idx.wrapping_add(1)
}

/// Power-of-two sizes: mask off the carry
#[inline(always)]
const fn wrap_mask(idx: u8, n: usize) -> u8 {
    ((idx as usize + 1) & (n - 1)) as u8
}

/// Wrap by comparison, for capacities that are not a power of two
#[inline(always)]
const fn wrap_compare(idx: u8, n: usize) -> u8 {
    let next = idx as usize + 1;
    if next == n {
        0
    } else {
        next as u8
    }
}

/// Ring shared between interrupt handlers and the main loop
///
/// Every method is one critical section. `const` constructible, so it can
/// live in a `static`.
pub struct SharedRing<T: Copy, const N: usize> {
    inner: Mutex<RefCell<RingBuffer<T, N>>>,
}

impl<T: Copy, const N: usize> SharedRing<T, N> {
    /// Create an empty shared ring with every slot set to `value`
    pub const fn filled(value: T) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(RingBuffer::filled(value))),
        }
    }

    /// Run `f` on the ring inside an already-open critical section
    pub fn with_ring<R>(
        &self,
        cs: CriticalSection<'_>,
        f: impl FnOnce(&mut RingBuffer<T, N>) -> R,
    ) -> R {
        f(&mut *self.inner.borrow_ref_mut(cs))
    }

    /// Overwriting push
    pub fn push(&self, value: T) {
        critical::with(|cs| self.with_ring(cs, |ring| ring.push(value)));
    }

    /// Rejecting push
    pub fn try_push(&self, value: T) -> Result<()> {
        critical::with(|cs| self.with_ring(cs, |ring| ring.try_push(value)))
            .map_err(|_| Error::RingFull)
    }

    /// Remove the oldest element
    pub fn pop(&self) -> Option<T> {
        critical::with(|cs| self.with_ring(cs, RingBuffer::pop))
    }

    /// Look at the oldest element
    pub fn peek(&self) -> Option<T> {
        critical::with(|cs| self.with_ring(cs, |ring| ring.peek()))
    }

    /// Is the ring empty?
    pub fn is_empty(&self) -> bool {
        critical::with(|cs| self.with_ring(cs, |ring| ring.is_empty()))
    }

    /// Number of unread elements
    pub fn len(&self) -> usize {
        critical::with(|cs| self.with_ring(cs, |ring| ring.len()))
    }

    /// Discard all unread elements
    pub fn clear(&self) {
        critical::with(|cs| self.with_ring(cs, RingBuffer::clear));
    }
}

impl<T: Copy + Default, const N: usize> Default for SharedRing<T, N> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(RingBuffer::new())),
        }
    }
}
