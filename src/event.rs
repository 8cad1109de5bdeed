//! Deferred events — static, no-alloc callback descriptors
//!
//! An event is a plain function pointer plus one machine word of opaque
//! data. Producers (interrupt handlers, other callbacks) build them by
//! value; the event queue fires each one exactly once on the main loop.
//!
//! Author: stedmeister

/// Event callback — receives the event's data word
pub type EventFn = fn(usize);

/// Callback and data word, fired once by the event queue
///
/// Size: two machine words
#[derive(Debug, Clone, Copy)]
pub struct Event {
    /// Callback to run on the main loop
    func: EventFn,
    /// Opaque data handed to `func`
    data: usize,
}

fn ignore(_: usize) {}

impl Event {
    /// Create an event carrying `data`
    pub const fn new(func: EventFn, data: usize) -> Self {
        Self { func, data }
    }

    /// Create an event with a zero data word
    pub const fn from_fn(func: EventFn) -> Self {
        Self { func, data: 0 }
    }

    /// Event that does nothing; fills unused storage
    pub const fn idle() -> Self {
        Self::from_fn(ignore)
    }

    /// Data word
    pub const fn data(&self) -> usize {
        self.data
    }

    /// Run the callback with the data word
    #[inline]
    pub fn fire(self) {
        (self.func)(self.data);
    }
}

impl Default for Event {
    fn default() -> Self {
        Self::idle()
    }
}

impl From<EventFn> for Event {
    fn from(func: EventFn) -> Self {
        Self::from_fn(func)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_fire_passes_data() {
        static SEEN: AtomicUsize = AtomicUsize::new(0);
        fn record(data: usize) {
            SEEN.store(data, Ordering::SeqCst);
        }

        Event::new(record, 0xBEEF).fire();
        assert_eq!(SEEN.load(Ordering::SeqCst), 0xBEEF);
    }

    #[test]
    fn test_from_fn_has_zero_data() {
        fn noop(_: usize) {}
        let event = Event::from_fn(noop);
        assert_eq!(event.data(), 0);
        let event: Event = (noop as EventFn).into();
        assert_eq!(event.data(), 0);
    }

    #[test]
    fn test_idle_is_harmless() {
        let event = Event::default();
        assert_eq!(event.data(), 0);
        event.fire();
    }

    #[test]
    fn test_event_is_two_words() {
        assert_eq!(
            core::mem::size_of::<Event>(),
            2 * core::mem::size_of::<usize>()
        );
    }
}
