use std::thread;

use tracing::debug;

use super::executor::{fork, inline, ForkJoinExecutor};
use crate::Result;

impl ForkJoinExecutor {
    /// Reduces `items` with the associative operation `op`, starting from `init`.
    ///
    /// The input is split into contiguous blocks of at least
    /// [`min_block_size`](super::ForkJoinConfig::min_block_size) elements, one per thread and no
    /// more than [`max_threads`](super::ForkJoinConfig::max_threads). Every block but the last is
    /// reduced on a spawned thread; the last one is reduced by the caller. Block results are then
    /// folded into `init` in block order, not completion order, so for an associative `op` the
    /// result equals `items.iter().cloned().fold(init, op)`. Floating-point addition is only
    /// approximately associative, so sums of floats may differ in the last bits.
    ///
    /// A panic in `op` is reported as [`Error::TaskFailed`](crate::Error::TaskFailed), whichever
    /// thread ran the failing block.
    ///
    /// ```
    /// use joinkit::ForkJoinExecutor;
    ///
    /// let executor = ForkJoinExecutor::default();
    /// assert_eq!(executor.reduce(&[5, 5, 5, 5, 5], 0, |a, b| a + b).unwrap(), 25);
    /// assert_eq!(executor.reduce(&[], 7, |a: i32, b| a + b).unwrap(), 7);
    /// ```
    pub fn reduce<T, F>(&self, items: &[T], init: T, op: F) -> Result<T>
    where
        T: Clone + Send + Sync,
        F: Fn(T, T) -> T + Sync,
    {
        if items.is_empty() {
            return Ok(init);
        }

        let max_blocks = items.len().div_ceil(self.config().min_block_size());
        let blocks = max_blocks.min(self.config().max_threads());
        let block_size = items.len() / blocks;
        debug!(
            len = items.len(),
            blocks, block_size, "forking reduction over {} worker(s)", blocks - 1
        );

        let op = &op;
        // The last block also takes the remainder of the division.
        let (forked, last) = items.split_at(block_size * (blocks - 1));

        thread::scope(|s| {
            let futures = forked
                .chunks(block_size)
                .map(|block| fork(s, move || reduce_block(block, op)))
                .collect::<Vec<_>>();

            let last = inline(|| reduce_block(last, op));

            let mut partials = Vec::with_capacity(blocks);
            for future in &futures {
                partials.push(future.get()?);
            }
            partials.push(last?);

            inline(|| partials.into_iter().flatten().fold(init, op))
        })
    }
}

/// Left-to-right reduction of one block, seeded with its first element.
fn reduce_block<T: Clone, F: Fn(T, T) -> T>(block: &[T], op: &F) -> Option<T> {
    block.iter().cloned().reduce(op)
}

#[cfg(test)]
mod tests {
    use super::super::ForkJoinConfig;
    use super::*;
    use crate::Error;

    #[test]
    fn five_fives() {
        let executor = ForkJoinExecutor::default();
        assert_eq!(executor.reduce(&[5, 5, 5, 5, 5], 0, |a, b| a + b), Ok(25));
    }

    #[test]
    fn empty_returns_init() {
        let executor = ForkJoinExecutor::default();
        assert_eq!(executor.reduce(&[], 42, |a: u64, b| a * b), Ok(42));
    }

    #[test]
    fn matches_sequential_for_any_shape() {
        let items = (1..=1000_u64).collect::<Vec<_>>();
        let expected = items.iter().sum::<u64>() + 17;

        for threads in [1, 2, 3, 8, 64] {
            for block in [1, 7, 25, 100, 5000] {
                let executor = ForkJoinExecutor::new(
                    ForkJoinConfig::default()
                        .with_max_threads(threads)
                        .with_min_block_size(block),
                );
                assert_eq!(executor.reduce(&items, 17, |a, b| a + b), Ok(expected));
            }
        }
    }

    #[test]
    fn keeps_block_order() {
        // String concatenation is associative but not commutative.
        let items = (0..200).map(|i| (i % 10).to_string()).collect::<Vec<_>>();
        let expected = items.concat();
        let executor = ForkJoinExecutor::new(
            ForkJoinConfig::default()
                .with_max_threads(8)
                .with_min_block_size(3),
        );
        let result = executor.reduce(&items, String::new(), |a, b| a + &b);
        assert_eq!(result, Ok(expected));
    }

    #[test]
    fn worker_panic_is_reported() {
        let items = (0..100).collect::<Vec<i32>>();
        // With 4 threads the blocks are 0..25, 25..50, 50..75 and 75..100, the last one reduced
        // by the caller. With 1 thread everything runs on the caller.
        for threads in [1, 4] {
            for poisoned in [3, 95] {
                let executor = ForkJoinExecutor::new(
                    ForkJoinConfig::default()
                        .with_max_threads(threads)
                        .with_min_block_size(10),
                );
                let result = executor.reduce(&items, 0, |a, b| {
                    if b == poisoned {
                        panic!("poisoned element");
                    }
                    a + b
                });
                assert!(
                    matches!(result, Err(Error::TaskFailed(_))),
                    "threads={threads} poisoned={poisoned}: {result:?}"
                );
            }
        }
    }

    #[test]
    fn combine_panic_is_reported() {
        let items = (1..=100).collect::<Vec<i32>>();
        let executor = ForkJoinExecutor::new(
            ForkJoinConfig::default()
                .with_max_threads(4)
                .with_min_block_size(10),
        );
        // Only the final fold over the block results sees the seed.
        let result = executor.reduce(&items, -1, |a, b| {
            if a == -1 {
                panic!("bad seed");
            }
            a + b
        });
        assert!(matches!(result, Err(Error::TaskFailed(_))));
    }
}
