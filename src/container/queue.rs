use std::collections::VecDeque;

use super::base::{Discipline, SyncContainer};

/// First in, first out.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fifo;

impl Discipline for Fifo {
    fn put<T>(items: &mut VecDeque<T>, value: T) {
        items.push_back(value);
    }

    fn take<T>(items: &mut VecDeque<T>) -> Option<T> {
        items.pop_front()
    }
}

/// Blocking FIFO queue.
///
/// Usable with any number of producers and consumers.
pub type Queue<T> = SyncContainer<T, Fifo>;
