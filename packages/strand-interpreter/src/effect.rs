use crate::computation::Sequence;
use crate::context::ExecutionContext;
use crate::error::Error;
use crate::operator::Operator;
use crate::value::Value;
use futures::future::LocalBoxFuture;
use std::fmt;
use std::future::Future;
use strand_task::Task;

/// State transition applied by the execution context.
///
/// Receives a draft of the state. Returning `Some` replaces the draft
/// wholesale; returning `None` commits the mutated draft.
pub type Mutator<S> = Box<dyn FnOnce(&mut S) -> Option<S>>;

/// Something a computation yields to the interpreter.
pub enum Effect<C: ExecutionContext> {
    /// Resumes with the future's output once it completes.
    Future(LocalBoxFuture<'static, Result<Value, Error>>),
    /// Runs a nested sequence through the context and awaits it.
    Sequence(Sequence<C>, Value),
    /// Applies a state transition and resumes with the new state.
    Mutator(Mutator<C::State>),
    /// Hands control to a user-supplied operator.
    Operator(Box<dyn Operator<C>>),
    /// Runs the task and resumes with its outcome.
    Task(Task<Value, Error>),
    /// A dynamically typed effect, classified when interpreted.
    Value(Value),
}

impl<C: ExecutionContext> Effect<C> {
    pub fn future<F>(future: F) -> Self
    where
        F: Future<Output = Result<Value, Error>> + 'static,
    {
        Effect::Future(Box::pin(future))
    }

    pub fn nested(sequence: &Sequence<C>, event: Value) -> Self {
        Effect::Sequence(sequence.clone(), event)
    }

    /// Mutates a draft of the state in place.
    pub fn update(f: impl FnOnce(&mut C::State) + 'static) -> Self {
        Effect::Mutator(Box::new(move |draft| {
            f(draft);
            None
        }))
    }

    /// Replaces the state with the value computed from the current one.
    pub fn replace(f: impl FnOnce(&C::State) -> C::State + 'static) -> Self {
        Effect::Mutator(Box::new(move |draft| Some(f(draft))))
    }

    pub fn operator(operator: impl Operator<C> + 'static) -> Self {
        Effect::Operator(Box::new(operator))
    }

    pub fn task(task: Task<Value, Error>) -> Self {
        Effect::Task(task)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Effect::Future(_) => "future",
            Effect::Sequence(..) => "sequence",
            Effect::Mutator(_) => "mutator",
            Effect::Operator(_) => "operator",
            Effect::Task(_) => "task",
            Effect::Value(_) => "value",
        }
    }

    /// Resolves a dynamically typed effect to a concrete one.
    ///
    /// Sequences are recognised before tasks; any other payload is an
    /// [`Error::InvalidYieldable`].
    pub fn classify(value: Value) -> Result<Self, Error> {
        if let Some(sequence) = value.downcast_ref::<Sequence<C>>() {
            return Ok(Effect::Sequence(sequence.clone(), Value::unit()));
        }
        if let Some(task) = value.downcast_ref::<Task<Value, Error>>() {
            return Ok(Effect::Task(task.clone()));
        }
        Err(Error::InvalidYieldable(value.type_name()))
    }
}

impl<C: ExecutionContext> fmt::Debug for Effect<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::Sequence(sequence, event) => f
                .debug_tuple("Sequence")
                .field(sequence)
                .field(event)
                .finish(),
            Effect::Task(task) => f.debug_tuple("Task").field(task).finish(),
            Effect::Value(value) => f.debug_tuple("Value").field(value).finish(),
            other => write!(f, "Effect::{}", other.kind()),
        }
    }
}
