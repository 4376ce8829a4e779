use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// FIFO of slab keys whose futures have been woken.
///
/// Wakers must be `Send + Sync`, so unlike the rest of the scheduler this
/// queue sits behind a mutex.
#[derive(Debug, Default)]
pub struct ReadyQueue {
    keys: Mutex<VecDeque<usize>>,
}

impl ReadyQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, key: usize) {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(key);
    }

    pub fn pop(&self) -> Option<usize> {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    pub fn clear(&self) {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
