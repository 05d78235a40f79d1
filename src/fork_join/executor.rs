use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread::{self, Scope};

use tracing::debug;

use super::config::ForkJoinConfig;
use crate::future::{Future, Task};
use crate::{Result, TaskFailure};

/// Runs divide-and-conquer computations on scoped OS threads.
///
/// Every operation spawns its threads inside a [`std::thread::scope`], so tasks may borrow from
/// the caller and are all joined before the operation returns.
#[derive(Debug, Clone, Default)]
pub struct ForkJoinExecutor {
    config: ForkJoinConfig,
}

impl ForkJoinExecutor {
    /// Creates an executor with the given configuration.
    pub fn new(config: ForkJoinConfig) -> Self {
        Self { config }
    }

    /// Configuration of this executor.
    pub fn config(&self) -> &ForkJoinConfig {
        &self.config
    }

    /// Runs `a` on a new thread and `b` on the current one, and returns both results.
    ///
    /// A panic in either closure is reported as [`Error::TaskFailed`](crate::Error::TaskFailed),
    /// the one in `a` first if both fail.
    pub fn join<A, B, RA, RB>(&self, a: A, b: B) -> Result<(RA, RB)>
    where
        A: FnOnce() -> RA + Send,
        B: FnOnce() -> RB,
        RA: Send,
    {
        thread::scope(|s| {
            let ra = fork(s, a);
            let rb = inline(b);
            Ok((ra.get()?, rb?))
        })
    }
}

/// Runs `body` on the current thread, reporting a panic the way a forked task does.
pub(crate) fn inline<T, F: FnOnce() -> T>(body: F) -> Result<T> {
    catch_unwind(AssertUnwindSafe(body)).map_err(|payload| {
        let failure = TaskFailure::from_panic(payload);
        debug!("{failure}");
        failure.into()
    })
}

/// Spawns `body` as a task on `scope` and returns the future of its result.
pub(crate) fn fork<'scope, T, F>(scope: &'scope Scope<'scope, '_>, body: F) -> Future<T>
where
    F: FnOnce() -> T + Send + 'scope,
    T: Send + 'scope,
{
    let (task, future) = Task::new(body);
    let _unused = scope.spawn(move || task.run());
    future
}
