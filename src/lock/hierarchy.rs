//! Per-thread bookkeeping of held hierarchy levels.
//!
//! Each thread keeps the levels of the hierarchical locks it holds, in acquisition order. Since
//! every acquisition must be strictly below the last one, the list is strictly decreasing and its
//! last entry is the thread's current held level.

use core::cell::RefCell;

use crate::{Error, Result};

thread_local! {
    static HELD: RefCell<Vec<u64>> = const { RefCell::new(Vec::new()) };
}

/// Lowest level held by the current thread, or `None` if it holds no hierarchical lock.
pub fn held_level() -> Option<u64> {
    HELD.with(|held| held.borrow().last().copied())
}

/// Checks whether the current thread may acquire a lock of level `requested`.
pub(crate) fn check(requested: u64) -> Result<()> {
    match held_level() {
        Some(held) if held <= requested => Err(Error::HierarchyViolation { held, requested }),
        _ => Ok(()),
    }
}

/// Records that the current thread now holds `level`.
pub(crate) fn enter(level: u64) {
    HELD.with(|held| {
        let mut held = held.borrow_mut();
        debug_assert!(held.last().map_or(true, |&last| last > level));
        held.push(level);
    });
}

/// Records that the current thread released `level`.
///
/// Releasing out of acquisition order only removes that level; the held level stays the lowest
/// one still held.
pub(crate) fn exit(level: u64) {
    HELD.with(|held| {
        let mut held = held.borrow_mut();
        if let Some(index) = held.iter().rposition(|&l| l == level) {
            let _ = held.remove(index);
        }
    });
}
