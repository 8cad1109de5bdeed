//! Critical sections — scoped interrupt masking
//!
//! The only mutual exclusion in the kernel. [`with`] masks interrupts for
//! the duration of a closure and, on every exit path (including
//! unwinding), restores the interrupt state that was in effect before,
//! then issues a compiler fence so writes made inside are ordered before
//! anything after.
//!
//! The architecture-specific masking comes from the `critical-section`
//! implementation linked into the final binary (cortex-m, riscv, avr-device,
//! or `critical-section/std` on a host).
//!
//! Every mutating public operation acquires exactly once through [`with`].
//! Helpers running inside a section take the [`CriticalSection`] token as a
//! parameter instead of acquiring again, so sections never nest by
//! construction. Should one nest anyway, the save/restore keeps interrupts
//! masked until the outermost section closes; sections are closure-scoped,
//! so they always close in reverse order.
//!
//! Author: stedmeister

use core::sync::atomic::{compiler_fence, Ordering};

pub use critical_section::CriticalSection;

/// Run `f` with interrupts masked
#[inline]
pub fn with<R>(f: impl FnOnce(CriticalSection<'_>) -> R) -> R {
    let result = critical_section::with(f);
    compiler_fence(Ordering::SeqCst);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use core::sync::atomic::AtomicBool;
    use critical_section::Mutex;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_with_returns_value() {
        let value = with(|_| 42);
        assert_eq!(value, 42);
    }

    #[test]
    fn test_token_borrows_mutex() {
        let counter = Mutex::new(Cell::new(0u32));
        with(|cs| counter.borrow(cs).set(counter.borrow(cs).get() + 1));
        with(|cs| assert_eq!(counter.borrow(cs).get(), 1));
    }

    #[test]
    fn test_released_on_early_return() {
        fn bump_unless(flag: bool, counter: &Mutex<Cell<u32>>) -> Option<()> {
            with(|cs| {
                if flag {
                    return None;
                }
                counter.borrow(cs).set(counter.borrow(cs).get() + 1);
                Some(())
            })
        }

        let counter = Mutex::new(Cell::new(0u32));
        assert!(bump_unless(true, &counter).is_none());
        // A leaked section would deadlock the next acquire on the host
        assert!(bump_unless(false, &counter).is_some());
        with(|cs| assert_eq!(counter.borrow(cs).get(), 1));
    }

    #[test]
    fn test_nested_section_keeps_outer_exclusive() {
        static ENTERED: AtomicBool = AtomicBool::new(false);

        let other = with(|_| {
            with(|_| ());

            // Inner section closed; the outer one must still exclude
            // every other context.
            let other = thread::spawn(|| {
                with(|_| ENTERED.store(true, Ordering::SeqCst));
            });
            thread::sleep(Duration::from_millis(50));
            assert!(!ENTERED.load(Ordering::SeqCst));
            other
        });

        other.join().unwrap();
        assert!(ENTERED.load(Ordering::SeqCst));
    }
}
