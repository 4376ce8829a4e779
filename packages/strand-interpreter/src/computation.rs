use crate::context::ExecutionContext;
use crate::effect::Effect;
use crate::error::Error;
use crate::value::Value;
use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use strand_task::Strategy;

/// What a computation produced when resumed.
pub enum Step<C: ExecutionContext> {
    Yielded(Effect<C>),
    Done(Value),
}

/// Input a computation is resumed with.
#[derive(Debug, Clone)]
pub enum Resume {
    Value(Value),
    Error(Error),
}

/// A resumable, step-producing computation.
///
/// The first `resume` starts it (with the unit value). Returning `Err`
/// raises out of the computation and rejects its task.
pub trait Computation<C: ExecutionContext> {
    fn resume(&mut self, value: Value) -> Result<Step<C>, Error>;

    /// Injects an error at the current suspension point. Computations that
    /// cannot catch simply re-raise it.
    fn resume_with_error(&mut self, error: Error) -> Result<Step<C>, Error> {
        Err(error)
    }
}

/// Computation driven by a single closure over [`Resume`].
pub struct StepFn<C, F> {
    step: F,
    _context: PhantomData<fn() -> C>,
}

pub fn from_fn<C, F>(step: F) -> StepFn<C, F>
where
    C: ExecutionContext,
    F: FnMut(Resume) -> Result<Step<C>, Error>,
{
    StepFn {
        step,
        _context: PhantomData,
    }
}

impl<C, F> Computation<C> for StepFn<C, F>
where
    C: ExecutionContext,
    F: FnMut(Resume) -> Result<Step<C>, Error>,
{
    fn resume(&mut self, value: Value) -> Result<Step<C>, Error> {
        (self.step)(Resume::Value(value))
    }

    fn resume_with_error(&mut self, error: Error) -> Result<Step<C>, Error> {
        (self.step)(Resume::Error(error))
    }
}

static NEXT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Identity of a sequence, shared by all its clones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SequenceKey(u64);

type Factory<C> = dyn Fn(Value) -> Box<dyn Computation<C>>;

struct SequenceInner<C: ExecutionContext> {
    key: SequenceKey,
    name: Cow<'static, str>,
    factory: Box<Factory<C>>,
    strategy: Option<Rc<dyn Strategy<Value, Error>>>,
}

/// A named computation factory: the logical task of the binding layer.
///
/// Every invocation builds a fresh computation from the triggering event.
pub struct Sequence<C: ExecutionContext> {
    inner: Rc<SequenceInner<C>>,
}

impl<C: ExecutionContext> Sequence<C> {
    pub fn new<F, P>(name: impl Into<Cow<'static, str>>, factory: F) -> Self
    where
        F: Fn(Value) -> P + 'static,
        P: Computation<C> + 'static,
    {
        Self::build(name.into(), factory, None)
    }

    /// A sequence whose concurrent invocations are reconciled by `strategy`.
    pub fn with_strategy<F, P, S>(name: impl Into<Cow<'static, str>>, strategy: S, factory: F) -> Self
    where
        F: Fn(Value) -> P + 'static,
        P: Computation<C> + 'static,
        S: Strategy<Value, Error> + 'static,
    {
        Self::build(name.into(), factory, Some(Rc::new(strategy)))
    }

    fn build<F, P>(
        name: Cow<'static, str>,
        factory: F,
        strategy: Option<Rc<dyn Strategy<Value, Error>>>,
    ) -> Self
    where
        F: Fn(Value) -> P + 'static,
        P: Computation<C> + 'static,
    {
        let factory: Box<Factory<C>> =
            Box::new(move |event| Box::new(factory(event)) as Box<dyn Computation<C>>);
        Self {
            inner: Rc::new(SequenceInner {
                key: SequenceKey(NEXT_SEQUENCE.fetch_add(1, Ordering::Relaxed)),
                name,
                factory,
                strategy,
            }),
        }
    }

    pub fn key(&self) -> SequenceKey {
        self.inner.key
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn strategy(&self) -> Option<&dyn Strategy<Value, Error>> {
        self.inner.strategy.as_deref()
    }

    /// Builds a fresh computation for one invocation.
    pub fn start(&self, event: Value) -> Box<dyn Computation<C>> {
        (self.inner.factory)(event)
    }
}

impl<C: ExecutionContext> Clone for Sequence<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<C: ExecutionContext> PartialEq for Sequence<C> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<C: ExecutionContext> Eq for Sequence<C> {}

impl<C: ExecutionContext> fmt::Debug for Sequence<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequence")
            .field("key", &self.inner.key)
            .field("name", &self.inner.name)
            .field("strategy", &self.inner.strategy.is_some())
            .finish()
    }
}
