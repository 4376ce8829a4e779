use crate::registry::{LiveTasks, SubscriptionKey, TaskMap, WatchKey};
use futures::task::LocalSpawn;
use slotmap::SlotMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use strand_interpreter::{ExecutionContext, Mutator, Sequence, Value, ValueTask, interpret};
use strand_task::Notifications;

type Subscriber<S> = Rc<dyn Fn(&S)>;

/// State container that runs sequences against itself.
///
/// A `Store` owns the state, the dependencies and the executor used for
/// awaited futures, and keeps track of the tasks it started: the live set
/// (cancelled together by [`cancel_all`](Store::cancel_all)) and, per
/// sequence, the active task that strategies compose with.
///
/// Running tasks hold a handle to the store, so a store with pending work
/// stays alive until that work finishes or is cancelled.
pub struct Store<S, D> {
    inner: Rc<StoreInner<S, D>>,
}

struct StoreInner<S, D> {
    state: RefCell<S>,
    dependencies: D,
    spawner: Rc<dyn LocalSpawn>,
    live: RefCell<LiveTasks>,
    tasks: RefCell<TaskMap>,
    subscribers: RefCell<SlotMap<SubscriptionKey, Subscriber<S>>>,
}

impl<S, D> Clone for Store<S, D> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S, D> fmt::Debug for Store<S, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("live_tasks", &self.inner.live.borrow().len())
            .finish_non_exhaustive()
    }
}

impl<S, D> Store<S, D>
where
    S: Clone + 'static,
    D: Clone + 'static,
{
    pub fn new(state: S, dependencies: D, spawner: Rc<dyn LocalSpawn>) -> Self {
        Self {
            inner: Rc::new(StoreInner {
                state: RefCell::new(state),
                dependencies,
                spawner,
                live: RefCell::default(),
                tasks: RefCell::default(),
                subscribers: RefCell::new(SlotMap::with_key()),
            }),
        }
    }

    /// Mutates a copy of the state in place and commits it.
    pub fn update(&self, f: impl FnOnce(&mut S) + 'static) -> S {
        let mut draft = self.inner.state.borrow().clone();
        f(&mut draft);
        self.commit(draft)
    }

    fn commit(&self, next: S) -> S {
        *self.inner.state.borrow_mut() = next.clone();
        let subscribers: Vec<Subscriber<S>> =
            self.inner.subscribers.borrow().values().cloned().collect();
        for subscriber in subscribers {
            subscriber(&next);
        }
        next
    }

    /// Registers a callback invoked with the new state after every commit.
    pub fn subscribe(&self, f: impl Fn(&S) + 'static) -> SubscriptionKey {
        self.inner.subscribers.borrow_mut().insert(Rc::new(f))
    }

    pub fn unsubscribe(&self, key: SubscriptionKey) -> bool {
        self.inner.subscribers.borrow_mut().remove(key).is_some()
    }

    /// Registers a callback invoked with every task started for `sequence`,
    /// after strategy composition.
    pub fn watch(
        &self,
        sequence: &Sequence<Self>,
        f: impl Fn(&ValueTask) + 'static,
    ) -> WatchKey {
        self.inner
            .tasks
            .borrow_mut()
            .watch(sequence.key(), Rc::new(f))
    }

    pub fn unwatch(&self, key: WatchKey) -> bool {
        self.inner.tasks.borrow_mut().unwatch(key)
    }

    /// The unfinished composed task of a sequence that carries a strategy.
    pub fn active_task(&self, sequence: &Sequence<Self>) -> Option<ValueTask> {
        self.inner.tasks.borrow().active(sequence.key())
    }

    /// The task most recently announced to the watchers of `sequence`, or an
    /// idle task if it was never called.
    pub fn latest_task(&self, sequence: &Sequence<Self>) -> ValueTask {
        self.inner
            .tasks
            .borrow()
            .latest(sequence.key())
            .unwrap_or_else(ValueTask::idle)
    }

    /// Number of started tasks that have not finished.
    pub fn live_tasks(&self) -> usize {
        self.inner.live.borrow().len()
    }

    /// Cancels every live task.
    pub fn cancel_all(&self) {
        let tasks = self.inner.live.borrow_mut().drain();
        tracing::debug!("Store cancelling {} live tasks", tasks.len());
        for task in tasks {
            task.cancel();
        }
    }

    /// Keeps `task` in the live set until it finishes.
    fn register(&self, task: &ValueTask) {
        let key = self.inner.live.borrow_mut().insert(task.clone());
        let store = Rc::downgrade(&self.inner);
        task.listen(Notifications::new().on_finished(move || {
            if let Some(inner) = store.upgrade() {
                inner.live.borrow_mut().remove(key);
            }
        }));
    }

    /// Composes `task` with the active task of `sequence` and returns the
    /// task that is authoritative from now on.
    fn start(&self, sequence: &Sequence<Self>, task: ValueTask) -> ValueTask {
        let Some(strategy) = sequence.strategy() else {
            return task;
        };

        let key = sequence.key();
        let active = self.inner.tasks.borrow().active(key);
        let composed = match &active {
            Some(active) => {
                tracing::debug!(
                    "Sequence '{}' composing {} with active {}",
                    sequence.name(),
                    task.id(),
                    active.id()
                );
                strategy.compose(active.clone(), task)
            }
            None => task,
        };

        // The strategy kept the active task, which is already tracked.
        if active.is_some_and(|active| active.ptr_eq(&composed)) {
            return composed;
        }

        self.inner.tasks.borrow_mut().set_active(key, composed.clone());
        let store: Weak<StoreInner<S, D>> = Rc::downgrade(&self.inner);
        let finished = composed.clone();
        composed.listen(Notifications::new().on_finished(move || {
            if let Some(inner) = store.upgrade() {
                inner.tasks.borrow_mut().clear_active(key, &finished);
            }
        }));
        composed
    }
}

impl<S, D> ExecutionContext for Store<S, D>
where
    S: Clone + 'static,
    D: Clone + 'static,
{
    type State = S;
    type Dependencies = D;

    fn state(&self) -> S {
        self.inner.state.borrow().clone()
    }

    /// Runs the mutator on a copy of the latest state; the copy, or the
    /// replacement the mutator returns, becomes the new state.
    fn set_state(&self, mutator: Mutator<S>) -> Option<S> {
        let mut draft = self.inner.state.borrow().clone();
        let next = mutator(&mut draft).unwrap_or(draft);
        Some(self.commit(next))
    }

    fn dependencies(&self) -> D {
        self.inner.dependencies.clone()
    }

    /// Starts one invocation of `sequence` and returns its task.
    ///
    /// The returned task is the new invocation itself, even when the
    /// sequence's strategy keeps an older task or queues the new one.
    fn call(&self, sequence: &Sequence<Self>, event: Value) -> ValueTask {
        let task = interpret(self.clone(), sequence, event);
        tracing::debug!("Store calling '{}' as {}", sequence.name(), task.id());
        self.register(&task);

        let composed = self.start(sequence, task.clone());
        let watchers = self
            .inner
            .tasks
            .borrow_mut()
            .announce(sequence.key(), composed.clone());
        for watcher in watchers {
            watcher(&composed);
        }

        composed.run();
        task
    }

    fn spawner(&self) -> &dyn LocalSpawn {
        &*self.inner.spawner
    }
}
