use core::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crossbeam_utils::{Backoff, CachePadded};

use super::api::{RawLock, RawTryLock};

/// A lock whose waiters spin instead of sleeping.
///
/// Waiters only read the flag until it looks free, then race for it with a single swap. Once the
/// backoff is exhausted they yield to the scheduler between reads. Suited to very short critical
/// sections.
#[derive(Debug, Default)]
pub struct SpinLock {
    held: CachePadded<AtomicBool>,
}

impl SpinLock {
    /// Returns `true` if some thread holds the lock right now.
    pub fn is_locked(&self) -> bool {
        self.held.load(Ordering::Relaxed)
    }

    fn acquire(&self) -> bool {
        !self.held.swap(true, Ordering::Acquire)
    }
}

unsafe impl RawLock for SpinLock {
    type Token = ();

    fn lock(&self) {
        let backoff = Backoff::new();
        while !self.acquire() {
            while self.is_locked() {
                if backoff.is_completed() {
                    thread::yield_now();
                } else {
                    backoff.snooze();
                }
            }
        }
    }

    unsafe fn unlock(&self, _token: ()) {
        self.held.store(false, Ordering::Release);
    }
}

unsafe impl RawTryLock for SpinLock {
    fn try_lock(&self) -> Result<(), ()> {
        // Read first so a failed attempt does not take the cache line exclusively.
        if !self.is_locked() && self.acquire() {
            Ok(())
        } else {
            Err(())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread::scope;

    use super::super::{api, HierarchicalLock};
    use super::*;

    #[test]
    fn smoke() {
        api::tests::smoke::<SpinLock>();
    }

    #[test]
    fn try_lock_reflects_state() {
        let lock = SpinLock::default();
        assert!(!lock.is_locked());
        assert!(lock.try_lock().is_ok());
        assert!(lock.is_locked());
        assert!(lock.try_lock().is_err());
        unsafe { lock.unlock(()) };
        assert!(!lock.is_locked());
    }

    #[test]
    fn counter_under_contention() {
        const THREADS: usize = 8;
        const ROUNDS: usize = 2000;
        let counter = HierarchicalLock::<usize, SpinLock>::with_raw(1, 0);

        scope(|s| {
            for _ in 0..THREADS {
                s.spawn(|| {
                    for _ in 0..ROUNDS {
                        *counter.lock().unwrap() += 1;
                    }
                });
            }
        });

        assert_eq!(counter.into_inner(), THREADS * ROUNDS);
    }
}
