use joinkit::fork_join::hardware_threads;
use joinkit::{parallel_reduce, parallel_sort, HierarchicalLock, Queue, ThreadPool};
use tracing_subscriber::EnvFilter;

const NUM_JOBS: usize = 20;

fn main() -> joinkit::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("hardware threads: {}", hardware_threads());

    // Reduction of a tiny input happens on the calling thread only.
    let fives = [5, 5, 5, 5, 5];
    println!("sum of {fives:?} = {}", parallel_reduce(&fives, 0, |a, b| a + b)?);

    let big = (1..=1_000_000_u64).collect::<Vec<_>>();
    println!(
        "sum of 1..=1000000 = {}",
        parallel_reduce(&big, 0, |a, b| a + b)?
    );

    // An interleaved permutation of 0..10000.
    let shuffled = (0..10_000_u32).map(|i| (i * 7919) % 10_000).collect::<Vec<_>>();
    let sorted = parallel_sort(shuffled)?;
    println!(
        "sorted {} items, first {:?}, last {:?}",
        sorted.len(),
        sorted.first(),
        sorted.last()
    );

    // The pool's workers report back through a queue; the main thread collects the reports.
    let reports = std::sync::Arc::new(Queue::new());
    {
        let pool = ThreadPool::new(4);
        for id in 0..NUM_JOBS {
            let reports = reports.clone();
            pool.execute(move || {
                let name = std::thread::current().name().map(String::from);
                reports.push((id, name));
            });
        }
        // When the pool is dropped, all jobs are finished and the workers joined.
    }
    for _ in 0..NUM_JOBS {
        let (id, worker) = reports.pop_blocking();
        println!("[report] job {id} ran on {}", worker.as_deref().unwrap_or("?"));
    }

    // Locks must be taken in decreasing level order.
    let config = HierarchicalLock::new(10_000, "config");
    let cache = HierarchicalLock::new(5_000, "cache");
    {
        let _cache = cache.lock()?;
        if let Err(e) = config.lock() {
            println!("refused: {e}");
        }
    }
    let config = config.lock()?;
    let cache = cache.lock()?;
    println!("holding {} then {}", *config, *cache);

    Ok(())
}
