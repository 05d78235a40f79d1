use std::collections::VecDeque;

use super::base::{Discipline, SyncContainer};

/// Last in, first out.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lifo;

impl Discipline for Lifo {
    fn put<T>(items: &mut VecDeque<T>, value: T) {
        items.push_back(value);
    }

    fn take<T>(items: &mut VecDeque<T>) -> Option<T> {
        items.pop_back()
    }
}

/// Blocking LIFO stack.
pub type Stack<T> = SyncContainer<T, Lifo>;
