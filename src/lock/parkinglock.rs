use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use super::api::{RawLock, RawTryLock};

/// A lock whose waiters sleep on a condition variable instead of spinning.
#[derive(Debug, Default)]
pub struct ParkingLock {
    locked: Mutex<bool>,
    released: Condvar,
}

impl ParkingLock {
    // The flag is a plain bool, so a poisoned guard is still meaningful.
    fn state(&self) -> MutexGuard<'_, bool> {
        self.locked.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

unsafe impl RawLock for ParkingLock {
    type Token = ();

    fn lock(&self) {
        let mut locked = self.state();
        while *locked {
            locked = self
                .released
                .wait(locked)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *locked = true;
    }

    unsafe fn unlock(&self, _token: ()) {
        *self.state() = false;
        self.released.notify_one();
    }
}

unsafe impl RawTryLock for ParkingLock {
    fn try_lock(&self) -> Result<(), ()> {
        let mut locked = self.state();
        if *locked {
            return Err(());
        }
        *locked = true;
        Ok(())
    }
}
