#![allow(dead_code)]

use futures::channel::oneshot;
use futures::task::LocalSpawn;
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use strand_interpreter::{
    Effect, Error, ExecutionContext, Mutator, Sequence, Value, ValueTask, interpret,
};
use strand_scheduler::{LocalScheduler, Scheduler};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Counter {
    pub value: i32,
}

pub type Seq = Sequence<TestContext>;

/// Execution context backed by a `LocalScheduler`.
#[derive(Clone)]
pub struct TestContext {
    inner: Rc<Inner>,
}

struct Inner {
    state: RefCell<Counter>,
    commits: Cell<usize>,
    calls: RefCell<Vec<ValueTask>>,
    scheduler: LocalScheduler,
}

impl TestContext {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(Inner {
                state: RefCell::new(Counter::default()),
                commits: Cell::new(0),
                calls: RefCell::new(Vec::new()),
                scheduler: LocalScheduler::new(),
            }),
        }
    }

    pub fn scheduler(&self) -> &LocalScheduler {
        &self.inner.scheduler
    }

    /// Starts one invocation of `sequence`.
    pub fn run(&self, sequence: &Seq, event: Value) -> ValueTask {
        let task = interpret(self.clone(), sequence, event);
        task.run();
        task
    }

    pub fn drain(&self) -> usize {
        self.inner.scheduler.run_until_stalled()
    }

    pub fn counter(&self) -> i32 {
        self.inner.state.borrow().value
    }

    pub fn set_counter(&self, value: i32) {
        self.inner.state.borrow_mut().value = value;
    }

    pub fn commits(&self) -> usize {
        self.inner.commits.get()
    }

    /// Tasks created through `call`, in order.
    pub fn calls(&self) -> Vec<ValueTask> {
        self.inner.calls.borrow().clone()
    }
}

impl ExecutionContext for TestContext {
    type State = Counter;
    type Dependencies = &'static str;

    fn state(&self) -> Counter {
        self.inner.state.borrow().clone()
    }

    fn set_state(&self, mutator: Mutator<Counter>) -> Option<Counter> {
        let mut draft = self.state();
        let next = mutator(&mut draft).unwrap_or(draft);
        *self.inner.state.borrow_mut() = next.clone();
        self.inner.commits.set(self.inner.commits.get() + 1);
        Some(next)
    }

    fn dependencies(&self) -> &'static str {
        "api-client"
    }

    fn call(&self, sequence: &Seq, event: Value) -> ValueTask {
        let task = interpret(self.clone(), sequence, event);
        self.inner.calls.borrow_mut().push(task.clone());
        task.run();
        task
    }

    fn spawner(&self) -> &dyn LocalSpawn {
        &self.inner.scheduler
    }
}

/// Effect resolving with whatever is later sent on the returned channel.
pub fn external<T: Any>() -> (oneshot::Sender<T>, Effect<TestContext>) {
    let (sender, receiver) = oneshot::channel();
    let effect = Effect::future(async move {
        receiver.await.map(Value::new).map_err(Error::custom)
    });
    (sender, effect)
}

pub fn count() -> Rc<Cell<u32>> {
    Rc::new(Cell::new(0))
}

pub fn result_of<T: Any + Clone>(task: &ValueTask) -> Option<T> {
    task.result()?.get::<T>()
}
