//! Single-assignment deferred results.
//!
//! A [`channel`] connects a [`Promise`], held by whoever computes the value, to a [`Future`],
//! held by whoever needs it. The slot between them moves through
//!
//! ```text
//! Pending --resolve--> Ready(value | failure) --get--> Taken
//!    \
//!     `--promise dropped--> Abandoned
//! ```
//!
//! [`Task`] bundles a closure with the promise of its result, so that running the task always
//! settles the future, even if the closure panics.

use core::fmt;
use core::mem;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::{Error, Result, TaskFailure};

enum State<T> {
    Pending,
    Ready(Result<T, TaskFailure>),
    Taken,
    Abandoned(Option<TaskFailure>),
}

struct Inner<T> {
    state: State<T>,
    /// Cleared when the `Future` is dropped.
    observed: bool,
}

struct Slot<T> {
    inner: Mutex<Inner<T>>,
    settled: Condvar,
}

impl<T> Slot<T> {
    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn settle(&self, state: State<T>) {
        let mut inner = self.lock();
        if !inner.observed {
            if let State::Ready(Err(failure)) = &state {
                warn!("task failure was never observed: {failure}");
            }
        }
        inner.state = state;
        self.settled.notify_all();
    }
}

/// Creates a connected pair of [`Promise`] and [`Future`].
pub fn channel<T>() -> (Promise<T>, Future<T>) {
    let slot = Arc::new(Slot {
        inner: Mutex::new(Inner {
            state: State::Pending,
            observed: true,
        }),
        settled: Condvar::new(),
    });
    (
        Promise {
            slot: slot.clone(),
            resolved: false,
        },
        Future { slot },
    )
}

/// The producing side of a [`Future`].
///
/// Dropping a promise without resolving it abandons the future: [`Future::get`] then fails with
/// [`Error::BrokenTask`].
pub struct Promise<T> {
    slot: Arc<Slot<T>>,
    resolved: bool,
}

impl<T> Promise<T> {
    /// Resolves the future with a value or a failure, waking the consumer.
    ///
    /// Fails with [`Error::AlreadyResolved`] if the promise was already resolved. Resolving a
    /// promise whose future was dropped succeeds and discards `outcome`.
    pub fn resolve(&mut self, outcome: Result<T, TaskFailure>) -> Result<()> {
        if self.resolved {
            return Err(Error::AlreadyResolved);
        }
        self.resolved = true;
        self.slot.settle(State::Ready(outcome));
        Ok(())
    }

    /// Resolves the future with a value.
    pub fn fulfill(&mut self, value: T) -> Result<()> {
        self.resolve(Ok(value))
    }

    /// Resolves the future with a failure.
    pub fn fail(&mut self, failure: TaskFailure) -> Result<()> {
        self.resolve(Err(failure))
    }

    /// Returns `true` once the promise has been resolved.
    pub fn is_resolved(&self) -> bool {
        self.resolved
    }
}

impl<T> Drop for Promise<T> {
    fn drop(&mut self) {
        if self.resolved {
            return;
        }
        let cause = thread::panicking()
            .then(|| TaskFailure::new("producer panicked before resolving the future"));
        self.slot.settle(State::Abandoned(cause));
    }
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("resolved", &self.resolved)
            .finish()
    }
}

/// A handle to a value that is produced elsewhere.
///
/// The value can be retrieved once; afterwards [`Future::get`] fails with
/// [`Error::ResultAlreadyRetrieved`].
pub struct Future<T> {
    slot: Arc<Slot<T>>,
}

impl<T> Future<T> {
    /// Blocks until the future is settled and takes its outcome.
    ///
    /// - The value, if the promise was fulfilled.
    /// - [`Error::TaskFailed`] with the original failure, if the task failed.
    /// - [`Error::BrokenTask`], if the promise was dropped without being resolved.
    /// - [`Error::ResultAlreadyRetrieved`], if an earlier call already took the outcome.
    pub fn get(&self) -> Result<T> {
        let mut inner = self.slot.lock();
        while let State::Pending = inner.state {
            inner = self
                .slot
                .settled
                .wait(inner)
                .unwrap_or_else(PoisonError::into_inner);
        }
        Self::take(&mut inner)
    }

    /// Like [`Future::get`], but gives up after `timeout` and returns `Ok(None)`.
    ///
    /// Timing out does not affect the task, which keeps running.
    pub fn get_timeout(&self, timeout: Duration) -> Result<Option<T>> {
        let deadline = Instant::now() + timeout;
        let mut inner = self.slot.lock();
        while let State::Pending = inner.state {
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            inner = self
                .slot
                .settled
                .wait_timeout(inner, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        Self::take(&mut inner).map(Some)
    }

    /// Returns `true` if [`Future::get`] would return without blocking.
    pub fn is_ready(&self) -> bool {
        !matches!(self.slot.lock().state, State::Pending)
    }

    fn take(inner: &mut Inner<T>) -> Result<T> {
        match mem::replace(&mut inner.state, State::Taken) {
            State::Ready(Ok(value)) => Ok(value),
            State::Ready(Err(failure)) => Err(Error::TaskFailed(failure)),
            State::Taken => Err(Error::ResultAlreadyRetrieved),
            State::Abandoned(cause) => {
                inner.state = State::Abandoned(cause.clone());
                Err(Error::BrokenTask { cause })
            }
            State::Pending => unreachable!("future taken while pending"),
        }
    }
}

impl<T> Drop for Future<T> {
    fn drop(&mut self) {
        let mut inner = self.slot.lock();
        inner.observed = false;
        if let State::Ready(Err(failure)) = &inner.state {
            warn!("task failure was never observed: {failure}");
        }
    }
}

impl<T> fmt::Debug for Future<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Future")
            .field("ready", &self.is_ready())
            .finish()
    }
}

/// A closure together with the promise of its result.
pub struct Task<'a, T> {
    body: Box<dyn FnOnce() -> T + Send + 'a>,
    promise: Promise<T>,
}

impl<'a, T> Task<'a, T> {
    /// Wraps `body` into a task and returns it with the future of its result.
    pub fn new<F>(body: F) -> (Self, Future<T>)
    where
        F: FnOnce() -> T + Send + 'a,
    {
        let (promise, future) = channel();
        let task = Self {
            body: Box::new(body),
            promise,
        };
        (task, future)
    }

    /// Runs the task on the current thread and resolves its future.
    ///
    /// A panic in the body is caught and delivered as [`Error::TaskFailed`].
    pub fn run(self) {
        let Self { body, mut promise } = self;
        let outcome = catch_unwind(AssertUnwindSafe(body)).map_err(TaskFailure::from_panic);
        if let Err(failure) = &outcome {
            debug!("{failure}");
        }
        promise.resolved = true;
        promise.slot.settle(State::Ready(outcome));
    }
}

impl<T> fmt::Debug for Task<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").finish_non_exhaustive()
    }
}
