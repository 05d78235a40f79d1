use core::fmt;
use core::marker::PhantomData;
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::{Error, Result};

/// Order in which a [`SyncContainer`] hands out its elements.
pub trait Discipline: Send + Sync + 'static {
    /// Inserts `value` into `items`.
    fn put<T>(items: &mut VecDeque<T>, value: T);

    /// Removes the next element to be handed out, if any.
    fn take<T>(items: &mut VecDeque<T>) -> Option<T>;
}

/// A blocking container guarded by one mutex and one condition variable.
///
/// Elements only ever leave the container by value, so no reference into the protected sequence
/// escapes the critical section.
pub struct SyncContainer<T, D: Discipline> {
    items: Mutex<VecDeque<T>>,
    /// Signalled once per successful insertion.
    available: Condvar,
    _marker: PhantomData<D>,
}

impl<T, D: Discipline> Default for SyncContainer<T, D> {
    fn default() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
            _marker: PhantomData,
        }
    }
}

impl<T, D: Discipline> SyncContainer<T, D> {
    /// Creates a new, empty container.
    pub fn new() -> Self {
        Self::default()
    }

    // Nothing user-provided runs while the guard is held except `T::clone` in `Clone`, which can
    // not leave the sequence half-updated, so a poisoned lock is still consistent.
    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts a value and wakes one thread blocked in a pop, if any.
    pub fn push(&self, value: T) {
        D::put(&mut self.lock(), value);
        self.available.notify_one();
    }

    /// Removes the next element, blocking until one is available.
    pub fn pop_blocking(&self) -> T {
        let mut items = self.lock();
        loop {
            if let Some(value) = D::take(&mut items) {
                return value;
            }
            items = self
                .available
                .wait(items)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Removes the next element, waiting at most `timeout` for one to arrive.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut items = self.lock();
        loop {
            if let Some(value) = D::take(&mut items) {
                return Some(value);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            items = self
                .available
                .wait_timeout(items, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Removes the next element if there is one, without blocking.
    pub fn try_pop(&self) -> Option<T> {
        D::take(&mut self.lock())
    }

    /// Like [`SyncContainer::try_pop`], but reports an empty container as
    /// [`Error::ContainerEmpty`].
    pub fn pop_now(&self) -> Result<T> {
        self.try_pop().ok_or(Error::ContainerEmpty)
    }

    /// Returns `true` if the container is empty.
    ///
    /// The answer may be stale by the time the caller looks at it.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Number of elements currently stored. Best-effort, like [`SyncContainer::is_empty`].
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Destroys the container and returns its elements in the order they would be popped.
    pub fn into_vec(self) -> Vec<T> {
        let mut items = self.items.into_inner().unwrap_or_else(PoisonError::into_inner);
        let mut result = Vec::with_capacity(items.len());
        while let Some(value) = D::take(&mut items) {
            result.push(value);
        }
        result
    }
}

impl<T: Clone, D: Discipline> Clone for SyncContainer<T, D> {
    /// Copies the elements while holding the source's lock. The copy gets its own mutex.
    fn clone(&self) -> Self {
        let items = self.lock().clone();
        Self {
            items: Mutex::new(items),
            available: Condvar::new(),
            _marker: PhantomData,
        }
    }
}

impl<T, D: Discipline> FromIterator<T> for SyncContainer<T, D> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut items = VecDeque::new();
        for value in iter {
            D::put(&mut items, value);
        }
        Self {
            items: Mutex::new(items),
            available: Condvar::new(),
            _marker: PhantomData,
        }
    }
}

impl<T, D: Discipline> fmt::Debug for SyncContainer<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncContainer")
            .field("len", &self.len())
            .finish()
    }
}
