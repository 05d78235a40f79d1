use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread::{self, scope, sleep};
use std::time::Duration;

use joinkit::{parallel_reduce, parallel_sort, ForkJoinConfig, ForkJoinExecutor};
use rand::prelude::*;

/// Records how many threads run an instrumented closure at once, and which threads do.
#[derive(Default)]
struct Occupancy {
    active: AtomicUsize,
    peak: AtomicUsize,
    threads: Mutex<HashSet<thread::ThreadId>>,
}

impl Occupancy {
    fn enter<R>(&self, f: impl FnOnce() -> R) -> R {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        let _ = self.peak.fetch_max(now, Ordering::SeqCst);
        let _ = self.threads.lock().unwrap().insert(thread::current().id());
        sleep(Duration::from_micros(20));
        let result = f();
        let _ = self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn threads(&self) -> usize {
        self.threads.lock().unwrap().len()
    }
}

#[test]
fn reduce_five_fives() {
    assert_eq!(parallel_reduce(&[5, 5, 5, 5, 5], 0, |a, b| a + b).unwrap(), 25);
}

#[test]
fn reduce_matches_sequential() {
    let mut rng = thread_rng();
    for _ in 0..16 {
        let len = rng.gen_range(0..5000);
        let items = (0..len).map(|_| rng.gen::<u32>() as u64).collect::<Vec<_>>();
        let executor = ForkJoinExecutor::new(
            ForkJoinConfig::default()
                .with_max_threads(rng.gen_range(1..16))
                .with_min_block_size(rng.gen_range(1..100)),
        );
        let expected = items.iter().fold(3, |a, b| a ^ b);
        assert_eq!(executor.reduce(&items, 3, |a, b| a ^ b).unwrap(), expected);
    }
}

/// Matrix products are associative but not commutative, so this catches combining out of
/// block order.
#[test]
fn reduce_non_commutative() {
    type M = [[u64; 2]; 2];
    fn mul(a: M, b: M) -> M {
        let mut c = [[0; 2]; 2];
        for i in 0..2 {
            for j in 0..2 {
                for k in 0..2 {
                    c[i][j] = (c[i][j] + a[i][k] * b[k][j]) % 1_000_003;
                }
            }
        }
        c
    }

    let mut rng = thread_rng();
    let items = (0..777)
        .map(|_| {
            let mut m = [[0; 2]; 2];
            m.iter_mut().flatten().for_each(|x| *x = rng.gen_range(0..100));
            m
        })
        .collect::<Vec<M>>();
    let identity = [[1, 0], [0, 1]];
    let expected = items.iter().copied().fold(identity, mul);

    let executor = ForkJoinExecutor::new(
        ForkJoinConfig::default()
            .with_max_threads(8)
            .with_min_block_size(10),
    );
    assert_eq!(executor.reduce(&items, identity, mul).unwrap(), expected);
}

#[test]
fn sort_small_inputs() {
    assert_eq!(
        parallel_sort(vec![5, 3, 8, 1, 9, 2]).unwrap(),
        vec![1, 2, 3, 5, 8, 9]
    );
    assert_eq!(parallel_sort(Vec::<u8>::new()).unwrap(), Vec::<u8>::new());
}

/// The caller plus at most `max_threads - 1` workers, and never more than one per block.
#[test]
fn reduce_fan_out_is_bounded() {
    let items = (0..2000_u64).collect::<Vec<_>>();
    for (threads, min_block, bound) in [(3, 10, 3), (8, 1000, 2), (1, 10, 1), (16, 5000, 1)] {
        let occupancy = Occupancy::default();
        let executor = ForkJoinExecutor::new(
            ForkJoinConfig::default()
                .with_max_threads(threads)
                .with_min_block_size(min_block),
        );
        let sum = executor
            .reduce(&items, 0, |a, b| occupancy.enter(|| a + b))
            .unwrap();
        assert_eq!(sum, (0..2000).sum::<u64>());
        assert!(occupancy.threads() <= bound, "threads={threads} min_block={min_block}");
        assert!(occupancy.peak() <= bound, "threads={threads} min_block={min_block}");
    }
}

/// Every spawned sort task holds a permit while it compares, so at most
/// `max_outstanding_tasks` tasks and the caller compare at once.
#[test]
fn sort_fan_out_is_bounded() {
    let mut rng = thread_rng();
    for max_outstanding in [1, 2, 3] {
        let mut items = (0..1000).collect::<Vec<u32>>();
        items.shuffle(&mut rng);

        let occupancy = Occupancy::default();
        let executor = ForkJoinExecutor::new(
            ForkJoinConfig::default()
                .with_sort_threshold(32)
                .with_max_outstanding_tasks(max_outstanding),
        );
        let sorted = executor
            .sort_by(items, |a, b| occupancy.enter(|| a < b))
            .unwrap();
        assert_eq!(sorted, (0..1000).collect::<Vec<_>>());
        assert!(
            occupancy.peak() <= max_outstanding + 1,
            "peak {} with {max_outstanding} task(s)",
            occupancy.peak()
        );
    }
}

#[test]
fn sort_random() {
    let mut rng = thread_rng();
    for threshold in [2, 16, 256, 4096] {
        let executor = ForkJoinExecutor::new(
            ForkJoinConfig::default()
                .with_sort_threshold(threshold)
                .with_max_outstanding_tasks(8),
        );
        let mut items = (0..20_000).map(|i| i % 1000).collect::<Vec<u32>>();
        items.shuffle(&mut rng);

        let mut expected = items.clone();
        expected.sort_unstable();

        let sorted = executor.sort(items).unwrap();
        assert_eq!(sorted, expected);
        assert_eq!(executor.sort(sorted.clone()).unwrap(), sorted);
    }
}

#[test]
fn sort_by_key() {
    let mut rng = thread_rng();
    let mut words = (0..2000)
        .map(|i| format!("{:x}", i * 2654435761_u64 % 100_000))
        .collect::<Vec<_>>();
    words.shuffle(&mut rng);

    let executor = ForkJoinExecutor::new(ForkJoinConfig::default().with_sort_threshold(32));
    let sorted = executor
        .sort_by(words, |a, b| (a.len(), a) < (b.len(), b))
        .unwrap();
    assert!(sorted
        .windows(2)
        .all(|w| (w[0].len(), &w[0]) <= (w[1].len(), &w[1])));
}

/// Executors can be shared and used from many threads at once.
#[test]
fn concurrent_callers() {
    let executor = ForkJoinExecutor::new(
        ForkJoinConfig::default()
            .with_sort_threshold(64)
            .with_max_outstanding_tasks(2),
    );

    scope(|s| {
        for t in 0..4_u64 {
            let executor = &executor;
            s.spawn(move || {
                let items = (0..3000).rev().map(|i| i * (t + 1)).collect::<Vec<u64>>();
                let sum = executor.reduce(&items, 0, |a, b| a + b).unwrap();
                assert_eq!(sum, (0..3000).sum::<u64>() * (t + 1));
                let sorted = executor.sort(items).unwrap();
                assert!(sorted.windows(2).all(|w| w[0] <= w[1]));
            });
        }
    });
}
