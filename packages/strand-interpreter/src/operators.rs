//! Built-in operators.

use crate::computation::Sequence;
use crate::context::ExecutionContext;
use crate::effect::Effect;
use crate::operator::{Operator, OperatorApi};
use crate::value::Value;

/// Resumes with a snapshot of the latest state.
pub fn get_state<C: ExecutionContext>() -> Effect<C> {
    Effect::operator(GetState)
}

/// Resumes with the context's dependencies.
pub fn get_dependencies<C: ExecutionContext>() -> Effect<C> {
    Effect::operator(GetDependencies)
}

/// Runs `sequence` through the context and resumes with its outcome.
pub fn call<C: ExecutionContext>(sequence: &Sequence<C>, event: Value) -> Effect<C> {
    Effect::operator(Call {
        sequence: sequence.clone(),
        event,
    })
}

struct GetState;

impl<C: ExecutionContext> Operator<C> for GetState {
    fn run(self: Box<Self>, api: OperatorApi<C>) {
        let state = api.state();
        api.next(Value::new(state));
    }
}

struct GetDependencies;

impl<C: ExecutionContext> Operator<C> for GetDependencies {
    fn run(self: Box<Self>, api: OperatorApi<C>) {
        let dependencies = api.dependencies();
        api.next(Value::new(dependencies));
    }
}

struct Call<C: ExecutionContext> {
    sequence: Sequence<C>,
    event: Value,
}

impl<C: ExecutionContext> Operator<C> for Call<C> {
    fn run(self: Box<Self>, api: OperatorApi<C>) {
        let Call { sequence, event } = *self;
        api.interpret(Effect::Sequence(sequence, event));
    }
}
