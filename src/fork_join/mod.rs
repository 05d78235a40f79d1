//! Fork-join execution: parallel reduction and parallel partition-sort.
//!
//! A [`ForkJoinExecutor`] forks work onto scoped threads as [`Task`](crate::Task)s and joins by
//! blocking on their [`Future`](crate::Future)s. Fan-out is always bounded: reductions use at most
//! [`ForkJoinConfig::max_threads`] threads, and sorting stops spawning once
//! [`ForkJoinConfig::max_outstanding_tasks`] tasks are in flight. [`ThreadPool`] runs
//! `'static` jobs on a fixed set of workers fed by a [`Queue`](crate::Queue).

mod config;
mod executor;
mod pool;
mod reduce;
mod sort;

pub use config::{hardware_threads, ForkJoinConfig, DEFAULT_MIN_BLOCK_SIZE, DEFAULT_SORT_THRESHOLD};
pub use executor::ForkJoinExecutor;
pub use pool::ThreadPool;

use crate::Result;

/// [`ForkJoinExecutor::reduce`] with the default configuration.
pub fn parallel_reduce<T, F>(items: &[T], init: T, op: F) -> Result<T>
where
    T: Clone + Send + Sync,
    F: Fn(T, T) -> T + Sync,
{
    ForkJoinExecutor::default().reduce(items, init, op)
}

/// [`ForkJoinExecutor::sort`] with the default configuration.
pub fn parallel_sort<T: Ord + Send>(items: Vec<T>) -> Result<Vec<T>> {
    ForkJoinExecutor::default().sort(items)
}
