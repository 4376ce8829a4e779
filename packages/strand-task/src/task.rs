use smallvec::SmallVec;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-unique identifier of a task, allocated on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

impl TaskId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        TaskId(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Task({})", self.0)
    }
}

/// Lifecycle of a task. Once a terminal status is reached it never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TaskStatus {
    /// Constructed, runner not invoked yet.
    Idle,
    Running,
    Resolved,
    Rejected,
    Cancelled,
}

impl TaskStatus {
    pub fn is_finished(self) -> bool {
        matches!(
            self,
            TaskStatus::Resolved | TaskStatus::Rejected | TaskStatus::Cancelled
        )
    }
}

/// A bundle of callbacks fired once, at the terminal transition of a task.
///
/// Only the callback matching the outcome fires, followed by `on_finished`.
pub struct Notifications<T, E> {
    on_resolved: Option<Box<dyn FnOnce(&T)>>,
    on_rejected: Option<Box<dyn FnOnce(&E)>>,
    on_cancelled: Option<Box<dyn FnOnce()>>,
    on_finished: Option<Box<dyn FnOnce()>>,
}

impl<T, E> Default for Notifications<T, E> {
    fn default() -> Self {
        Self {
            on_resolved: None,
            on_rejected: None,
            on_cancelled: None,
            on_finished: None,
        }
    }
}

impl<T, E> Notifications<T, E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_resolved(mut self, f: impl FnOnce(&T) + 'static) -> Self {
        self.on_resolved = Some(Box::new(f));
        self
    }

    pub fn on_rejected(mut self, f: impl FnOnce(&E) + 'static) -> Self {
        self.on_rejected = Some(Box::new(f));
        self
    }

    pub fn on_cancelled(mut self, f: impl FnOnce() + 'static) -> Self {
        self.on_cancelled = Some(Box::new(f));
        self
    }

    pub fn on_finished(mut self, f: impl FnOnce() + 'static) -> Self {
        self.on_finished = Some(Box::new(f));
        self
    }

    fn deliver(self, outcome: &Outcome<T, E>) {
        match outcome {
            Outcome::Resolved(value) => {
                if let Some(f) = self.on_resolved {
                    f(value);
                }
            }
            Outcome::Rejected(error) => {
                if let Some(f) = self.on_rejected {
                    f(error);
                }
            }
            Outcome::Cancelled => {
                if let Some(f) = self.on_cancelled {
                    f();
                }
            }
        }
        if let Some(f) = self.on_finished {
            f();
        }
    }
}

pub(crate) enum Outcome<T, E> {
    Resolved(T),
    Rejected(E),
    Cancelled,
}

enum Settlement<T, E> {
    Resolved(T),
    Rejected(E),
}

type Runner<T, E> = Box<dyn FnOnce(TaskResolver<T, E>)>;

struct State<T, E> {
    status: TaskStatus,
    result: Option<T>,
    error: Option<E>,
    cleanup_error: Option<E>,
    subscribers: SmallVec<[Notifications<T, E>; 2]>,
    cancel_hooks: Vec<Box<dyn FnOnce()>>,
}

struct Inner<T, E> {
    id: TaskId,
    state: RefCell<State<T, E>>,
    runner: RefCell<Option<Runner<T, E>>>,
}

/// Shared handle to one computation's lifecycle and outcome.
///
/// Cloning a `Task` clones the handle, not the computation: every clone
/// observes and controls the same underlying task. Tasks start idle and are
/// started by [`Task::run`].
pub struct Task<T, E> {
    inner: Rc<Inner<T, E>>,
}

impl<T, E> Clone for Task<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T, E> fmt::Debug for Task<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = self
            .inner
            .state
            .try_borrow()
            .map(|state| state.status)
            .ok();
        f.debug_struct("Task")
            .field("id", &self.inner.id)
            .field("status", &status)
            .finish()
    }
}

impl<T, E> Task<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    /// Creates an idle task. `runner` is invoked once, on the first `run`.
    pub fn new<F>(runner: F) -> Self
    where
        F: FnOnce(TaskResolver<T, E>) + 'static,
    {
        Self {
            inner: Rc::new(Inner {
                id: TaskId::next(),
                state: RefCell::new(State {
                    status: TaskStatus::Idle,
                    result: None,
                    error: None,
                    cleanup_error: None,
                    subscribers: SmallVec::new(),
                    cancel_hooks: Vec::new(),
                }),
                runner: RefCell::new(Some(Box::new(runner))),
            }),
        }
    }

    /// A task whose runner never settles it. Only `cancel` can finish it.
    pub fn idle() -> Self {
        Self::new(|_| {})
    }

    /// An already resolved task.
    pub fn resolved(value: T) -> Self {
        let task = Self::new(move |resolver| resolver.resolve(value));
        task.run();
        task
    }

    /// An already rejected task.
    pub fn rejected(error: E) -> Self {
        let task = Self::new(move |resolver| resolver.reject(error));
        task.run();
        task
    }

    pub fn id(&self) -> TaskId {
        self.inner.id
    }

    pub fn status(&self) -> TaskStatus {
        self.inner.state.borrow().status
    }

    pub fn is_idle(&self) -> bool {
        self.status() == TaskStatus::Idle
    }

    pub fn is_running(&self) -> bool {
        self.status() == TaskStatus::Running
    }

    pub fn is_cancelled(&self) -> bool {
        self.status() == TaskStatus::Cancelled
    }

    pub fn is_finished(&self) -> bool {
        self.status().is_finished()
    }

    /// The resolved value. `Some` iff the task resolved.
    pub fn result(&self) -> Option<T> {
        self.inner.state.borrow().result.clone()
    }

    /// The rejection error. `Some` iff the task rejected.
    pub fn error(&self) -> Option<E> {
        self.inner.state.borrow().error.clone()
    }

    /// Error that escaped the producer's cleanup after the task was cancelled.
    pub fn cleanup_error(&self) -> Option<E> {
        self.inner.state.borrow().cleanup_error.clone()
    }

    /// Number of subscribers waiting for the outcome. Always zero once the
    /// task has finished.
    pub fn subscriber_count(&self) -> usize {
        self.inner.state.borrow().subscribers.len()
    }

    /// Returns true if both handles refer to the same task.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Starts the task. A no-op if it is already running or finished.
    pub fn run(&self) {
        {
            let mut state = self.inner.state.borrow_mut();
            if state.status != TaskStatus::Idle {
                return;
            }
            state.status = TaskStatus::Running;
        }
        tracing::trace!("{} running", self.inner.id);

        let runner = self.inner.runner.borrow_mut().take();
        if let Some(runner) = runner {
            runner(self.resolver());
        }
    }

    /// Registers `notifications`, then starts the task.
    ///
    /// The notifications are honoured even when the task is already running
    /// or finished.
    pub fn run_with(&self, notifications: Notifications<T, E>) {
        self.listen(notifications);
        self.run();
    }

    /// Cancels the task unless it already finished.
    ///
    /// Cancel hooks registered by the producer run first, in registration
    /// order, then every subscriber is notified.
    pub fn cancel(&self) {
        let hooks = {
            let mut state = self.inner.state.borrow_mut();
            if state.status.is_finished() {
                return;
            }
            state.status = TaskStatus::Cancelled;
            std::mem::take(&mut state.cancel_hooks)
        };
        tracing::trace!("{} cancelled", self.inner.id);

        // An idle task never gets to run.
        let runner = self.inner.runner.borrow_mut().take();
        drop(runner);

        for hook in hooks {
            hook();
        }
        self.notify_subscribers();
    }

    /// Subscribes to the terminal transition.
    ///
    /// Fires synchronously, before returning, when the task already finished.
    pub fn listen(&self, notifications: Notifications<T, E>) {
        let finished = {
            let mut state = self.inner.state.borrow_mut();
            if state.status.is_finished() {
                Some(notifications)
            } else {
                state.subscribers.push(notifications);
                None
            }
        };
        if let Some(notifications) = finished {
            if let Some(outcome) = self.outcome() {
                notifications.deliver(&outcome);
            }
        }
    }

    pub(crate) fn downgrade(&self) -> WeakTask<T, E> {
        WeakTask(Rc::downgrade(&self.inner))
    }

    pub(crate) fn resolver(&self) -> TaskResolver<T, E> {
        TaskResolver {
            inner: self.inner.clone(),
        }
    }

    pub(crate) fn outcome(&self) -> Option<Outcome<T, E>> {
        let state = self.inner.state.borrow();
        match state.status {
            TaskStatus::Resolved => state.result.clone().map(Outcome::Resolved),
            TaskStatus::Rejected => state.error.clone().map(Outcome::Rejected),
            TaskStatus::Cancelled => Some(Outcome::Cancelled),
            TaskStatus::Idle | TaskStatus::Running => None,
        }
    }

    fn settle(&self, settlement: Settlement<T, E>) {
        let hooks = {
            let mut state = self.inner.state.borrow_mut();
            if state.status != TaskStatus::Running {
                tracing::trace!(
                    "{} is {:?}, ignoring late settlement",
                    self.inner.id,
                    state.status
                );
                return;
            }
            match settlement {
                Settlement::Resolved(value) => {
                    state.status = TaskStatus::Resolved;
                    state.result = Some(value);
                }
                Settlement::Rejected(error) => {
                    state.status = TaskStatus::Rejected;
                    state.error = Some(error);
                }
            }
            std::mem::take(&mut state.cancel_hooks)
        };
        tracing::trace!("{} settled as {:?}", self.inner.id, self.status());
        drop(hooks);
        self.notify_subscribers();
    }

    fn notify_subscribers(&self) {
        let subscribers = std::mem::take(&mut self.inner.state.borrow_mut().subscribers);
        let Some(outcome) = self.outcome() else {
            return;
        };
        for notifications in subscribers {
            notifications.deliver(&outcome);
        }
    }
}

/// Non-owning handle, for callbacks stored inside the task they observe.
pub(crate) struct WeakTask<T, E>(Weak<Inner<T, E>>);

impl<T, E> WeakTask<T, E> {
    pub(crate) fn upgrade(&self) -> Option<Task<T, E>> {
        self.0.upgrade().map(|inner| Task { inner })
    }
}

/// Producer-side capability handed to a task's runner.
pub struct TaskResolver<T, E> {
    inner: Rc<Inner<T, E>>,
}

impl<T, E> Clone for TaskResolver<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T, E> TaskResolver<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    /// The consumer-side handle of the task being produced.
    pub fn task(&self) -> Task<T, E> {
        Task {
            inner: self.inner.clone(),
        }
    }

    pub fn resolve(&self, value: T) {
        self.task().settle(Settlement::Resolved(value));
    }

    pub fn reject(&self, error: E) {
        self.task().settle(Settlement::Rejected(error));
    }

    /// Abandons the task from the producer side.
    pub fn cancel(&self) {
        self.task().cancel();
    }

    /// Registers a hook run when the task is cancelled.
    ///
    /// Runs immediately if the task is already cancelled and is discarded if
    /// the task settled some other way.
    pub fn on_cancelled(&self, hook: impl FnOnce() + 'static) {
        let status = {
            let mut state = self.inner.state.borrow_mut();
            if !state.status.is_finished() {
                state.cancel_hooks.push(Box::new(hook));
                return;
            }
            state.status
        };
        if status == TaskStatus::Cancelled {
            hook();
        }
    }

    /// Records an error that escaped cleanup after cancellation.
    ///
    /// Only the first failure is kept, and only on a cancelled task.
    pub fn fail_cleanup(&self, error: E) {
        let mut state = self.inner.state.borrow_mut();
        if state.status == TaskStatus::Cancelled && state.cleanup_error.is_none() {
            tracing::debug!("{} cleanup failed after cancellation", self.inner.id);
            state.cleanup_error = Some(error);
        }
    }
}
