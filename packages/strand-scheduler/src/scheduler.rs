use crate::Scheduler;
use crate::config::SchedulerConfig;
use crate::queue::ReadyQueue;
use crate::waker::slot_waker;
use futures::FutureExt;
use futures::task::{LocalFutureObj, LocalSpawn, SpawnError};
use slab::Slab;
use std::cell::{Cell, RefCell};
use std::sync::Arc;
use std::task::{Context, Poll};

/// A single-threaded executor for `!Send` futures.
///
/// Spawned futures are stored in a slab. A future is polled when its key is
/// on the ready queue: once right after spawning, then each time its waker
/// fires. Nothing runs outside of [`tick`](Scheduler::tick).
pub struct LocalScheduler {
    // A slot is `None` while its future is being polled.
    futures: RefCell<Slab<Option<LocalFutureObj<'static, ()>>>>,
    ready: Arc<ReadyQueue>,
    config: SchedulerConfig,
    closed: Cell<bool>,
}

impl LocalScheduler {
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    pub fn with_config(config: SchedulerConfig) -> Self {
        Self {
            futures: RefCell::new(Slab::new()),
            ready: Arc::new(ReadyQueue::new()),
            config,
            closed: Cell::new(false),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Number of spawned futures that have not completed.
    pub fn pending(&self) -> usize {
        self.futures.borrow().len()
    }

    /// Drops every pending future and refuses further spawns.
    pub fn shutdown(&self) {
        self.closed.set(true);
        self.ready.clear();
        let futures = std::mem::take(&mut *self.futures.borrow_mut());
        tracing::debug!("Scheduler shutdown, dropping {} futures", futures.len());
        drop(futures);
    }

    fn poll_slot(&self, key: usize) -> bool {
        let future = self
            .futures
            .borrow_mut()
            .get_mut(key)
            .and_then(Option::take);
        // Stale wake: the future completed, or is already being polled.
        let Some(mut future) = future else {
            return false;
        };

        let waker = slot_waker(key, self.ready.clone());
        let mut cx = Context::from_waker(&waker);
        match future.poll_unpin(&mut cx) {
            Poll::Ready(()) => {
                let mut futures = self.futures.borrow_mut();
                if futures.contains(key) {
                    futures.remove(key);
                }
            }
            Poll::Pending => {
                // The slot is gone if the scheduler shut down mid-poll.
                if let Some(slot) = self.futures.borrow_mut().get_mut(key) {
                    *slot = Some(future);
                }
            }
        }
        true
    }
}

impl Default for LocalScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for LocalScheduler {
    fn tick(&self) -> bool {
        let mut polled = 0;
        while polled < self.config.poll_budget {
            let Some(key) = self.ready.pop() else {
                break;
            };
            if self.poll_slot(key) {
                polled += 1;
            }
        }
        tracing::trace!(
            "Scheduler tick polled {} futures, {} pending",
            polled,
            self.pending()
        );
        !self.ready.is_empty()
    }

    fn is_idle(&self) -> bool {
        self.ready.is_empty()
    }
}

impl LocalSpawn for LocalScheduler {
    fn spawn_local_obj(&self, future: LocalFutureObj<'static, ()>) -> Result<(), SpawnError> {
        if self.closed.get() {
            return Err(SpawnError::shutdown());
        }
        let key = self.futures.borrow_mut().insert(Some(future));
        self.ready.push(key);
        Ok(())
    }

    fn status_local(&self) -> Result<(), SpawnError> {
        if self.closed.get() {
            return Err(SpawnError::shutdown());
        }
        Ok(())
    }
}
