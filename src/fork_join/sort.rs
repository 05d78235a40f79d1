use core::cmp::Ordering;
use core::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::thread::{self, Scope};

use crossbeam_utils::CachePadded;
use tracing::{debug, trace};

use super::executor::{fork, inline, ForkJoinExecutor};
use crate::future::Future;
use crate::Result;

impl ForkJoinExecutor {
    /// Sorts `items` in ascending order. See [`ForkJoinExecutor::sort_by`].
    ///
    /// ```
    /// use joinkit::ForkJoinExecutor;
    ///
    /// let executor = ForkJoinExecutor::default();
    /// assert_eq!(executor.sort(vec![5, 3, 8, 1, 9, 2]).unwrap(), vec![1, 2, 3, 5, 8, 9]);
    /// ```
    pub fn sort<T: Ord + Send>(&self, items: Vec<T>) -> Result<Vec<T>> {
        self.sort_by(items, |a, b| a < b)
    }

    /// Sorts `items` with the strict weak ordering `less` using parallel partition-sort.
    ///
    /// The first element is the pivot. The rest is split in one pass into the elements less than
    /// the pivot and the others; the lower part is sorted by a spawned task while the current
    /// thread goes on with the higher part, and the result is `lower ++ [pivot] ++ higher`.
    ///
    /// A part is only spawned if it has at least
    /// [`sort_threshold`](super::ForkJoinConfig::sort_threshold) elements and fewer than
    /// [`max_outstanding_tasks`](super::ForkJoinConfig::max_outstanding_tasks) spawned tasks are
    /// still running; otherwise it is sorted on the current thread with the standard library's
    /// unstable sort, using the ordering derived from `less`. The sort is not stable.
    ///
    /// A panic in `less` is reported as [`Error::TaskFailed`](crate::Error::TaskFailed), whether
    /// it happened in a spawned task or on the current thread.
    pub fn sort_by<T, F>(&self, items: Vec<T>, less: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(&T, &T) -> bool + Sync,
    {
        let budget = Budget::new(self.config().max_outstanding_tasks());
        let job = SortJob {
            less: &less,
            threshold: self.config().sort_threshold(),
            budget: &budget,
        };
        debug!(
            len = items.len(),
            threshold = job.threshold,
            max_outstanding = budget.max,
            "parallel sort"
        );
        inline(|| thread::scope(|s| job.run(s, items)))?
    }
}

/// Caps the number of spawned sort tasks alive at the same time.
#[derive(Debug)]
struct Budget {
    outstanding: CachePadded<AtomicUsize>,
    max: usize,
}

impl Budget {
    fn new(max: usize) -> Self {
        Self {
            outstanding: CachePadded::new(AtomicUsize::new(0)),
            max,
        }
    }

    fn try_acquire(&self) -> Option<Permit<'_>> {
        self.outstanding
            .fetch_update(AtomicOrdering::AcqRel, AtomicOrdering::Acquire, |n| {
                (n < self.max).then_some(n + 1)
            })
            .ok()
            .map(|_| Permit { budget: self })
    }
}

/// One outstanding spawned task. Returned to the budget on drop, even if the task panics.
#[derive(Debug)]
struct Permit<'b> {
    budget: &'b Budget,
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        let _ = self
            .budget
            .outstanding
            .fetch_sub(1, AtomicOrdering::Release);
    }
}

enum Lower<T> {
    Forked(Future<Result<Vec<T>>>),
    Sorted(Vec<T>),
}

struct SortJob<'env, F> {
    less: &'env F,
    threshold: usize,
    budget: &'env Budget,
}

impl<F> Clone for SortJob<'_, F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<F> Copy for SortJob<'_, F> {}

impl<'env, F> SortJob<'env, F> {
    /// Sorts `items`, forking lower partitions onto `scope` while the budget allows.
    ///
    /// The recursion on the higher partition is a loop: each round remembers its lower part and
    /// pivot, so the stack depth does not grow with the input on already-sorted data.
    fn run<'scope, T>(self, scope: &'scope Scope<'scope, 'env>, items: Vec<T>) -> Result<Vec<T>>
    where
        T: Send + 'scope,
        F: Fn(&T, &T) -> bool + Sync,
    {
        let len = items.len();
        let mut rounds = Vec::new();
        let mut rest = items;

        while rest.len() > 1 && rest.len() >= self.threshold {
            let mut drain = rest.drain(..);
            let Some(pivot) = drain.next() else {
                break;
            };
            let (lower, higher): (Vec<T>, Vec<T>) = drain.partition(|x| (self.less)(x, &pivot));

            let permit = if lower.len() >= self.threshold {
                self.budget.try_acquire()
            } else {
                None
            };
            let lower = match permit {
                Some(permit) => {
                    trace!(len = lower.len(), "forking lower partition");
                    Lower::Forked(fork(scope, move || {
                        let _permit = permit;
                        self.run(scope, lower)
                    }))
                }
                None => Lower::Sorted(self.sequential(lower)),
            };

            rounds.push((lower, pivot));
            rest = higher;
        }

        let rest = self.sequential(rest);

        let mut sorted = Vec::with_capacity(len);
        for (lower, pivot) in rounds {
            match lower {
                Lower::Forked(future) => sorted.extend(future.get()??),
                Lower::Sorted(part) => sorted.extend(part),
            }
            sorted.push(pivot);
        }
        sorted.extend(rest);
        Ok(sorted)
    }

    /// Sorts a partition on the current thread without partitioning it further.
    fn sequential<T>(&self, mut items: Vec<T>) -> Vec<T>
    where
        F: Fn(&T, &T) -> bool,
    {
        items.sort_unstable_by(|a, b| {
            if (self.less)(a, b) {
                Ordering::Less
            } else if (self.less)(b, a) {
                Ordering::Greater
            } else {
                Ordering::Equal
            }
        });
        items
    }
}
