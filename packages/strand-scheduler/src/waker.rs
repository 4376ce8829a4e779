use crate::queue::ReadyQueue;
use futures::task::{ArcWake, waker};
use std::sync::Arc;
use std::task::Waker;

/// Wakes a spawned future by queueing its slab key for the next tick.
struct SlotWaker {
    key: usize,
    ready: Arc<ReadyQueue>,
}

impl ArcWake for SlotWaker {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        arc_self.ready.push(arc_self.key);
    }
}

pub(crate) fn slot_waker(key: usize, ready: Arc<ReadyQueue>) -> Waker {
    waker(Arc::new(SlotWaker { key, ready }))
}
