use crate::computation::{Computation, Resume, Sequence, Step};
use crate::context::ExecutionContext;
use crate::effect::Effect;
use crate::error::{Error, Interrupt};
use crate::operator::OperatorApi;
use crate::value::Value;
use futures::future::{AbortHandle, Aborted, LocalBoxFuture, abortable};
use futures::task::LocalSpawnExt;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use strand_task::{Notifications, Task, TaskId, TaskResolver};

/// Creates an idle task that runs one invocation of `sequence`.
///
/// When started, the task builds a computation from `event` and drives it:
/// each yielded effect is interpreted and the computation is resumed with
/// the effect's outcome, until it returns (resolving the task) or raises
/// (rejecting it). Cancelling the task injects an [`Error::Cancelled`] into
/// the computation so it can run its cleanup, and cancels whatever the
/// computation was waiting on.
pub fn interpret<C: ExecutionContext>(
    context: C,
    sequence: &Sequence<C>,
    event: Value,
) -> Task<Value, Error> {
    let sequence = sequence.clone();
    Task::new(move |resolver: TaskResolver<Value, Error>| {
        let task = resolver.task();
        tracing::debug!("{} interpreting sequence '{}'", task.id(), sequence.name());

        let driver = Rc::new(Driver {
            context,
            id: task.id(),
            computation: RefCell::new(sequence.start(event)),
            resolver: resolver.clone(),
            pending: RefCell::new(None),
            queued: RefCell::new(None),
            stepping: Cell::new(false),
            interrupted: Cell::new(false),
            done: Cell::new(false),
        });
        resolver.on_cancelled({
            let driver = driver.clone();
            move || driver.interrupt()
        });
        driver.feed(Resume::Value(Value::unit()));
    })
}

/// Whether an awaited task is started by the interpreter or only observed.
#[derive(Clone, Copy)]
enum Start {
    Run,
    Observe,
}

/// What a suspended computation is waiting on.
enum Suspension {
    Future(AbortHandle),
    Task(Task<Value, Error>),
}

impl Suspension {
    fn cancel(self) {
        match self {
            Suspension::Future(handle) => handle.abort(),
            Suspension::Task(task) => task.cancel(),
        }
    }
}

/// Step loop state for one running invocation.
pub(crate) struct Driver<C: ExecutionContext> {
    pub(crate) context: C,
    id: TaskId,
    computation: RefCell<Box<dyn Computation<C>>>,
    pub(crate) resolver: TaskResolver<Value, Error>,
    pending: RefCell<Option<Suspension>>,
    // Input that arrived while the computation was being stepped.
    queued: RefCell<Option<Resume>>,
    stepping: Cell<bool>,
    // Cancellation requested while the computation was borrowed.
    interrupted: Cell<bool>,
    // The computation returned or raised and must not be resumed again.
    done: Cell<bool>,
}

impl<C: ExecutionContext> Driver<C> {
    /// Resumes the computation with `input`.
    ///
    /// Re-entrant calls (an effect that completes synchronously while the
    /// loop is already running) are queued and picked up by the running
    /// loop, so the stack does not grow with the number of steps.
    pub(crate) fn feed(self: &Rc<Self>, input: Resume) {
        if self.stepping.get() {
            let previous = self.queued.borrow_mut().replace(input);
            debug_assert!(previous.is_none(), "computation resumed twice");
            return;
        }

        self.stepping.set(true);
        let mut next = Some(input);
        while let Some(input) = next {
            self.advance(input);
            if self.interrupted.take() {
                self.unwind();
            }
            next = self.queued.borrow_mut().take();
        }
        self.stepping.set(false);
    }

    fn advance(self: &Rc<Self>, input: Resume) {
        if self.done.get() || self.resolver.task().is_finished() {
            tracing::trace!("{} ignoring resumption of a finished computation", self.id);
            return;
        }

        let step = {
            let mut computation = self.computation.borrow_mut();
            match input {
                Resume::Value(value) => computation.resume(value),
                Resume::Error(error) => computation.resume_with_error(error),
            }
        };

        match step {
            Ok(Step::Yielded(effect)) => {
                if self.resolver.task().is_finished() {
                    tracing::trace!("{} dropping {} effect yielded after cancellation", self.id, effect.kind());
                    return;
                }
                self.interpret(effect);
            }
            Ok(Step::Done(value)) => {
                self.done.set(true);
                tracing::trace!("{} computation returned", self.id);
                self.resolver.resolve(value);
            }
            Err(error) => {
                self.done.set(true);
                tracing::trace!("{} computation raised: {}", self.id, error);
                self.resolver.reject(error);
            }
        }
    }

    pub(crate) fn interpret(self: &Rc<Self>, effect: Effect<C>) {
        tracing::trace!("{} interpreting {} effect", self.id, effect.kind());
        match effect {
            Effect::Future(future) => self.await_future(future),
            Effect::Sequence(sequence, event) => {
                // The context decides when the invocation starts.
                let task = self.context.call(&sequence, event);
                self.await_task(task, Start::Observe);
            }
            Effect::Mutator(mutator) => {
                let state = self.context.set_state(mutator);
                self.feed(Resume::Value(Value::from(state)));
            }
            Effect::Operator(operator) => operator.run(OperatorApi::new(self.clone())),
            Effect::Task(task) => self.await_task(task, Start::Run),
            Effect::Value(value) => match Effect::classify(value) {
                Ok(effect) => self.interpret(effect),
                Err(error) => {
                    // Not recoverable by the computation.
                    tracing::warn!("{} {}", self.id, error);
                    self.done.set(true);
                    self.resolver.reject(error);
                }
            },
        }
    }

    fn await_future(self: &Rc<Self>, future: LocalBoxFuture<'static, Result<Value, Error>>) {
        let (future, handle) = abortable(future);
        *self.pending.borrow_mut() = Some(Suspension::Future(handle));

        let driver = self.clone();
        let spawned = self.context.spawner().spawn_local(async move {
            match future.await {
                Ok(Ok(value)) => driver.settle(Resume::Value(value)),
                Ok(Err(error)) => driver.settle(Resume::Error(error)),
                Err(Aborted) => tracing::trace!("{} awaited future aborted", driver.id),
            }
        });

        if let Err(error) = spawned {
            tracing::warn!("{} could not spawn future: {}", self.id, error);
            self.pending.borrow_mut().take();
            self.feed(Resume::Error(Error::from(error)));
        }
    }

    fn await_task(self: &Rc<Self>, task: Task<Value, Error>, start: Start) {
        if task.is_finished() {
            self.feed(outcome_of(&task));
            return;
        }

        *self.pending.borrow_mut() = Some(Suspension::Task(task.clone()));
        let resolved = self.clone();
        let rejected = self.clone();
        let cancelled = self.clone();
        let notifications = Notifications::new()
            .on_resolved(move |value: &Value| resolved.settle(Resume::Value(value.clone())))
            .on_rejected(move |error: &Error| rejected.settle(Resume::Error(error.clone())))
            .on_cancelled(move || {
                cancelled.settle(Resume::Error(Error::Cancelled(Interrupt::new())))
            });
        match start {
            Start::Run => task.run_with(notifications),
            Start::Observe => task.listen(notifications),
        }
    }

    fn settle(self: &Rc<Self>, input: Resume) {
        self.pending.borrow_mut().take();
        self.feed(input);
    }

    /// Cancellation hook: unwinds the computation, then cancels whatever it
    /// was suspended on.
    fn interrupt(self: &Rc<Self>) {
        tracing::debug!("{} cancelled, unwinding computation", self.id);
        self.unwind();
        let pending = self.pending.borrow_mut().take();
        if let Some(suspension) = pending {
            suspension.cancel();
        }
    }

    fn unwind(&self) {
        if self.done.get() {
            return;
        }
        // Cancelled from inside its own step: unwind once the step returns.
        let Ok(mut computation) = self.computation.try_borrow_mut() else {
            self.interrupted.set(true);
            return;
        };
        self.done.set(true);

        let interrupt = Interrupt::new();
        let outcome = computation.resume_with_error(Error::Cancelled(interrupt));
        drop(computation);

        match outcome {
            Err(error) if error.is_interrupt(interrupt) => {
                tracing::debug!("{} unwound cleanly", self.id);
            }
            Err(error) => {
                tracing::error!("{} cleanup failed after cancellation: {}", self.id, error);
                self.resolver.fail_cleanup(error);
            }
            Ok(Step::Done(value)) => {
                tracing::debug!("{} returned {:?} while cancelled, discarding", self.id, value);
            }
            Ok(Step::Yielded(effect)) => {
                tracing::warn!("{} yielded a {} effect while cancelled, dropping it", self.id, effect.kind());
            }
        }
    }
}

fn outcome_of(task: &Task<Value, Error>) -> Resume {
    if let Some(value) = task.result() {
        return Resume::Value(value);
    }
    match task.error() {
        Some(error) => Resume::Error(error),
        None => Resume::Error(Error::Cancelled(Interrupt::new())),
    }
}
