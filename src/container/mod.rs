//! Blocking thread-safe containers.
//!
//! Every container owns one mutex and one condition variable. [`SyncContainer::push`] never
//! blocks beyond the critical section and wakes one waiter; [`SyncContainer::pop_blocking`]
//! re-checks emptiness under the lock after every wakeup, so spurious wakeups are harmless and
//! an element is handed to exactly one consumer.

mod base;
mod queue;
mod stack;

pub use base::{Discipline, SyncContainer};
pub use queue::{Fifo, Queue};
pub use stack::{Lifo, Stack};
