//! Compile-time configuration — capacities, sentinels, tick rate
//!
//! Every container in the kernel is sized by a const generic. The
//! constants here bound those generics and give sensible defaults for
//! small 8-bit and 32-bit parts.
//!
//! Author: stedmeister

/// Largest ring capacity; indices are stored as `u8`
pub const MAX_RING_CAPACITY: usize = 256;

/// Slot index reserved for "no slot available"
pub const INVALID_SLOT: u8 = 0xFF;

/// Largest timer table; one index value is reserved for [`INVALID_SLOT`]
pub const MAX_TIMER_SLOTS: usize = INVALID_SLOT as usize;

/// Default event queue depth (usable depth is one less)
pub const DEFAULT_QUEUE_DEPTH: usize = 32;

/// Default number of software timer slots
pub const DEFAULT_TIMER_SLOTS: usize = 8;

/// Timer countdown value, in ticks
pub type Ticks = u16;

/// Rate of the periodic interrupt driving `tick()`
///
/// Converts wall-clock delays into tick counts. Conversions round up
/// so a requested delay is never shortened, and saturate at
/// [`Ticks::MAX`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickRate {
    /// Ticks per second
    hz: u32,
}

impl TickRate {
    /// One tick per millisecond
    pub const KILOHERTZ: TickRate = TickRate { hz: 1_000 };

    /// Create a tick rate from a frequency in Hz (clamped to at least 1 Hz)
    pub const fn from_hz(hz: u32) -> Self {
        Self {
            hz: if hz == 0 { 1 } else { hz },
        }
    }

    /// Tick frequency in Hz
    pub const fn hz(&self) -> u32 {
        self.hz
    }

    /// Length of one tick in microseconds (rounded down)
    pub const fn period_us(&self) -> u32 {
        1_000_000 / self.hz
    }

    /// Ticks covering `ms` milliseconds
    pub const fn ticks_for_ms(&self, ms: u32) -> Ticks {
        Self::scale(ms as u64, self.hz as u64, 1_000)
    }

    /// Ticks covering `us` microseconds
    pub const fn ticks_for_us(&self, us: u32) -> Ticks {
        Self::scale(us as u64, self.hz as u64, 1_000_000)
    }

    const fn scale(amount: u64, hz: u64, per_second: u64) -> Ticks {
        if amount == 0 {
            return 0;
        }
        let ticks = (amount * hz).div_ceil(per_second);
        if ticks > Ticks::MAX as u64 {
            Ticks::MAX
        } else {
            ticks as Ticks
        }
    }
}

impl Default for TickRate {
    fn default() -> Self {
        Self::KILOHERTZ
    }
}
