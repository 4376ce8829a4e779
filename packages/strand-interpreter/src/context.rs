use crate::computation::Sequence;
use crate::effect::Mutator;
use crate::error::Error;
use crate::value::Value;
use futures::task::LocalSpawn;
use strand_task::Task;

/// Host services a computation runs against.
///
/// Implementations are cheap handles: the interpreter clones the context
/// into every task it creates.
pub trait ExecutionContext: Clone + 'static {
    type State: Clone + 'static;
    type Dependencies: Clone + 'static;

    /// Snapshot of the latest state.
    fn state(&self) -> Self::State;

    /// Applies a transition. Returns the committed state, or `None` if the
    /// context does not report it.
    fn set_state(&self, mutator: Mutator<Self::State>) -> Option<Self::State>;

    fn dependencies(&self) -> Self::Dependencies;

    /// Invokes another sequence under this context.
    ///
    /// The context is responsible for starting the invocation: the returned
    /// task is observed, never run, by the caller. It may still be idle when
    /// returned, for instance when it is queued behind an earlier invocation.
    fn call(&self, sequence: &Sequence<Self>, event: Value) -> Task<Value, Error>;

    /// Executor awaited futures are spawned onto.
    fn spawner(&self) -> &dyn LocalSpawn;
}
