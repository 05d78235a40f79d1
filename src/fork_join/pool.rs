//! Thread pool with a fixed number of workers.

use core::any::Any;
use core::fmt;
use std::io;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::trace;

use crate::container::Queue;
use crate::future::{Future, Task};

type Job = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Run(Job),
    Exit,
}

struct Shared {
    jobs: Queue<Message>,
    /// Number of submitted jobs that have not finished yet.
    pending: Mutex<usize>,
    idle: Condvar,
    /// Payload of the first panic raised by an `execute` job.
    panic: Mutex<Option<Box<dyn Any + Send>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    fn work(&self, id: usize) {
        trace!("worker {id} starting");
        loop {
            match self.jobs.pop_blocking() {
                Message::Run(job) => {
                    if let Err(payload) = catch_unwind(AssertUnwindSafe(job)) {
                        let _ = lock(&self.panic).get_or_insert(payload);
                    }
                    self.finish_job();
                }
                Message::Exit => break,
            }
        }
        trace!("worker {id} exiting");
    }

    fn finish_job(&self) {
        let mut pending = lock(&self.pending);
        *pending -= 1;
        if *pending == 0 {
            self.idle.notify_all();
        }
    }
}

/// A pool of worker threads that run jobs taken from a shared [`Queue`].
///
/// Dropping the pool waits for every submitted job, joins the workers, and then re-raises the
/// first panic of an [`execute`](ThreadPool::execute)d job on the dropping thread.
pub struct ThreadPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl ThreadPool {
    /// Creates a pool with `size` workers (at least one).
    ///
    /// # Panics
    ///
    /// Panics if the OS fails to create a thread, like [`std::thread::spawn`].
    pub fn new(size: usize) -> Self {
        Self::try_new(size).unwrap_or_else(|e| panic!("failed to spawn worker thread: {e}"))
    }

    /// Creates a pool with `size` workers (at least one), reporting thread creation failures.
    pub fn try_new(size: usize) -> io::Result<Self> {
        let shared = Arc::new(Shared {
            jobs: Queue::new(),
            pending: Mutex::new(0),
            idle: Condvar::new(),
            panic: Mutex::new(None),
        });
        let mut pool = Self {
            shared,
            workers: Vec::new(),
        };
        for id in 0..size.max(1) {
            let shared = pool.shared.clone();
            // On error, dropping `pool` stops the workers spawned so far.
            let handle = thread::Builder::new()
                .name(format!("pool-worker-{id}"))
                .spawn(move || shared.work(id))?;
            pool.workers.push(handle);
        }
        Ok(pool)
    }

    /// Number of worker threads.
    pub fn num_threads(&self) -> usize {
        self.workers.len()
    }

    fn submit(&self, job: Job) {
        *lock(&self.shared.pending) += 1;
        self.shared.jobs.push(Message::Run(job));
    }

    /// Runs `f` on some worker.
    ///
    /// If `f` panics, the panic is re-raised when the pool is dropped.
    pub fn execute<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit(Box::new(f));
    }

    /// Runs `f` on some worker and returns the future of its result.
    ///
    /// A panic in `f` is delivered through the future as
    /// [`Error::TaskFailed`](crate::Error::TaskFailed).
    pub fn spawn<T, F>(&self, f: F) -> Future<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (task, future) = Task::new(f);
        self.submit(Box::new(move || task.run()));
        future
    }

    /// Blocks until every job submitted so far has finished.
    ///
    /// Must not be called from inside a job of the same pool, which would wait for itself.
    pub fn join(&self) {
        let mut pending = lock(&self.shared.pending);
        while *pending > 0 {
            pending = self
                .shared
                .idle
                .wait(pending)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.join();

        for _ in &self.workers {
            self.shared.jobs.push(Message::Exit);
        }
        for handle in self.workers.drain(..) {
            if let Err(payload) = handle.join() {
                let _ = lock(&self.shared.panic).get_or_insert(payload);
            }
        }

        if let Some(payload) = lock(&self.shared.panic).take() {
            if !thread::panicking() {
                resume_unwind(payload);
            }
        }
    }
}

impl fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadPool")
            .field("workers", &self.workers.len())
            .field("pending", &*lock(&self.shared.pending))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::Error;

    #[test]
    fn spawn_returns_results() {
        let pool = ThreadPool::new(3);
        let futures = (0..32_u64)
            .map(|i| pool.spawn(move || i * i))
            .collect::<Vec<_>>();
        let squares = futures
            .iter()
            .map(|f| f.get().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(squares, (0..32).map(|i| i * i).collect::<Vec<_>>());
    }

    #[test]
    fn spawn_panic_goes_to_future() {
        let pool = ThreadPool::new(2);
        let future = pool.spawn(|| -> u8 { panic!("inside task") });
        assert!(matches!(future.get(), Err(Error::TaskFailed(_))));
        // The pool itself is unaffected.
        assert_eq!(pool.spawn(|| 1).get(), Ok(1));
        drop(pool);
    }

    #[test]
    fn zero_size_gets_one_worker() {
        let pool = ThreadPool::new(0);
        assert_eq!(pool.num_threads(), 1);
        let future = pool.spawn(|| "ran");
        assert_eq!(future.get_timeout(Duration::from_secs(3)), Ok(Some("ran")));
    }
}
