use core::cell::UnsafeCell;
use core::fmt;
use core::marker::PhantomData;
use core::mem::ManuallyDrop;
use core::ops::{Deref, DerefMut};

use tracing::warn;

use super::api::{RawLock, RawTryLock};
use super::hierarchy;
use super::parkinglock::ParkingLock;
use crate::Result;

/// A lock tagged with a hierarchy level.
///
/// A thread may only acquire a hierarchical lock whose level is strictly below every hierarchical
/// lock it already holds. Any set of locks held by one thread is therefore held in strictly
/// decreasing level order, and the wait-for graph among threads blocked on hierarchical locks
/// cannot contain a cycle.
///
/// This only covers locks that go through this type. A thread blocking on some other mutex while
/// holding a hierarchical lock can still take part in a deadlock.
///
/// ```
/// use joinkit::{Error, HierarchicalLock};
///
/// let high = HierarchicalLock::new(10_000, 0);
/// let low = HierarchicalLock::new(5_000, 0);
///
/// let l = low.lock().unwrap();
/// assert!(matches!(high.lock(), Err(Error::HierarchyViolation { .. })));
/// drop(l);
///
/// let h = high.lock().unwrap();
/// let l = low.lock().unwrap();
/// drop((l, h));
/// ```
#[derive(Debug)]
pub struct HierarchicalLock<T, L: RawLock = ParkingLock> {
    level: u64,
    inner: L,
    data: UnsafeCell<T>,
}

// Send is automatically implemented for HierarchicalLock.

// SAFETY: threads can only access `&mut T` via the lock, and `L` is `Sync`.
unsafe impl<T: Send, L: RawLock> Sync for HierarchicalLock<T, L> {}

impl<T> HierarchicalLock<T> {
    /// Creates a new lock at `level` protecting `data`.
    pub fn new(level: u64, data: T) -> Self {
        Self::with_raw(level, data)
    }
}

impl<T, L: RawLock> HierarchicalLock<T, L> {
    /// Creates a new lock at `level` on top of the raw lock `L`.
    pub fn with_raw(level: u64, data: T) -> Self {
        Self {
            level,
            inner: L::default(),
            data: UnsafeCell::new(data),
        }
    }

    /// Level of this lock.
    pub fn level(&self) -> u64 {
        self.level
    }

    /// Destroys the lock and retrieves the lock-protected value.
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }

    /// Mutable access without locking, which `&mut self` makes safe.
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    fn violation(&self, result: Result<()>) -> Result<()> {
        if let Err(e) = &result {
            warn!(level = self.level, "{e}");
        }
        result
    }

    /// Acquires the lock, blocking until it is free.
    ///
    /// Fails with [`Error::HierarchyViolation`](crate::Error::HierarchyViolation) without blocking
    /// if the current thread holds a hierarchical lock whose level is not strictly above this one.
    pub fn lock(&self) -> Result<HierarchyGuard<'_, T, L>> {
        self.violation(hierarchy::check(self.level))?;
        let token = self.inner.lock();
        hierarchy::enter(self.level);
        Ok(HierarchyGuard::new(self, token))
    }
}

impl<T, L: RawTryLock> HierarchicalLock<T, L> {
    /// Tries to acquire the lock without blocking.
    ///
    /// The hierarchy is checked exactly as in [`HierarchicalLock::lock`]. Returns `Ok(None)` if
    /// another thread holds the lock, in which case the current thread's held level is unchanged.
    pub fn try_lock(&self) -> Result<Option<HierarchyGuard<'_, T, L>>> {
        self.violation(hierarchy::check(self.level))?;
        Ok(self.inner.try_lock().ok().map(|token| {
            hierarchy::enter(self.level);
            HierarchyGuard::new(self, token)
        }))
    }
}

/// A guard that holds a [`HierarchicalLock`] and dereferences the inner value.
///
/// Dropping the guard (or calling [`HierarchyGuard::unlock`]) restores the thread's held level and
/// releases the lock. The guard stays on the thread that acquired it.
pub struct HierarchyGuard<'s, T, L: RawLock = ParkingLock> {
    lock: &'s HierarchicalLock<T, L>,
    token: ManuallyDrop<L::Token>,
    // The held level lives in thread-local state, so the guard must be dropped where it was made.
    _not_send: PhantomData<*const ()>,
}

// SAFETY: Reference to `HierarchyGuard` implies reference to `T`. Thus, `T` must be `Sync`.
unsafe impl<T: Sync, L: RawLock> Sync for HierarchyGuard<'_, T, L> {}

impl<'s, T, L: RawLock> HierarchyGuard<'s, T, L> {
    fn new(lock: &'s HierarchicalLock<T, L>, token: L::Token) -> Self {
        Self {
            lock,
            token: ManuallyDrop::new(token),
            _not_send: PhantomData,
        }
    }

    /// Releases the lock.
    pub fn unlock(self) {
        drop(self);
    }
}

impl<T, L: RawLock> Drop for HierarchyGuard<'_, T, L> {
    fn drop(&mut self) {
        hierarchy::exit(self.lock.level);

        // SAFETY: `self.token` is not used anymore in this function, and as we are `drop`ing
        // `self`, it is not used anymore.
        let token = unsafe { ManuallyDrop::take(&mut self.token) };

        // SAFETY: since `self` was created with `lock` and its `token`, the `token` given to
        // `unlock()` is correct.
        unsafe { self.lock.inner.unlock(token) };
    }
}

impl<T, L: RawLock> Deref for HierarchyGuard<'_, T, L> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        // SAFETY: Having a `HierarchyGuard` means the underlying lock is acquired, so the
        // underlying data is valid. Hence we can create a shared reference to it.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T, L: RawLock> DerefMut for HierarchyGuard<'_, T, L> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: Having a `HierarchyGuard` means the underlying lock is acquired, and having a
        // mutable reference to the guard means we are the only one with access to the data.
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T: fmt::Debug, L: RawLock> fmt::Debug for HierarchyGuard<'_, T, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HierarchyGuard")
            .field("level", &self.lock.level)
            .field("data", &**self)
            .finish()
    }
}
