use crate::computation::{Resume, Sequence};
use crate::context::ExecutionContext;
use crate::effect::{Effect, Mutator};
use crate::error::Error;
use crate::interpreter::Driver;
use crate::value::Value;
use std::rc::Rc;
use strand_task::Task;

/// A user-extensible effect.
///
/// The interpreter hands the operator an [`OperatorApi`] and does nothing
/// else: the computation stays suspended until the operator either resumes
/// it with [`OperatorApi::next`] or delegates to another effect with
/// [`OperatorApi::interpret`]. Both consume the api, so a computation is
/// resumed at most once per operator.
pub trait Operator<C: ExecutionContext> {
    fn run(self: Box<Self>, api: OperatorApi<C>);
}

impl<C, F> Operator<C> for F
where
    C: ExecutionContext,
    F: FnOnce(OperatorApi<C>),
{
    fn run(self: Box<Self>, api: OperatorApi<C>) {
        (*self)(api)
    }
}

/// Capabilities available to an [`Operator`].
pub struct OperatorApi<C: ExecutionContext> {
    driver: Rc<Driver<C>>,
}

impl<C: ExecutionContext> OperatorApi<C> {
    pub(crate) fn new(driver: Rc<Driver<C>>) -> Self {
        Self { driver }
    }

    /// Resumes the suspended computation with `value`.
    pub fn next(self, value: Value) {
        self.driver.feed(Resume::Value(value));
    }

    /// Resumes the suspended computation by raising `error` into it.
    pub fn throw(self, error: Error) {
        self.driver.feed(Resume::Error(error));
    }

    /// Interprets `effect` as if the computation had yielded it.
    pub fn interpret(self, effect: Effect<C>) {
        self.driver.interpret(effect);
    }

    /// Invokes a sequence through the execution context, which starts it.
    pub fn call(&self, sequence: &Sequence<C>, event: Value) -> Task<Value, Error> {
        self.driver.context.call(sequence, event)
    }

    pub fn state(&self) -> C::State {
        self.driver.context.state()
    }

    pub fn set_state(&self, mutator: Mutator<C::State>) -> Option<C::State> {
        self.driver.context.set_state(mutator)
    }

    pub fn dependencies(&self) -> C::Dependencies {
        self.driver.context.dependencies()
    }

    pub fn context(&self) -> &C {
        &self.driver.context
    }

    /// The task running the suspended computation.
    pub fn task(&self) -> Task<Value, Error> {
        self.driver.resolver.task()
    }
}
