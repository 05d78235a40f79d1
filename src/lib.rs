//! Blocking containers, hierarchical locks and fork-join execution on OS threads.

#![warn(missing_docs, missing_debug_implementations)]
#![allow(clippy::result_unit_err)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod container;
mod error;
pub mod fork_join;
pub mod future;
pub mod lock;

pub use container::{Queue, Stack, SyncContainer};
pub use error::{Error, Result, TaskFailure};
pub use fork_join::{parallel_reduce, parallel_sort, ForkJoinConfig, ForkJoinExecutor, ThreadPool};
pub use future::{channel, Future, Promise, Task};
pub use lock::{HierarchicalLock, HierarchyGuard};
