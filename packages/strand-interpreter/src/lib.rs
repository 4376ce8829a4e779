pub mod computation;
pub mod context;
pub mod effect;
pub mod error;
pub mod interpreter;
pub mod operator;
pub mod operators;
pub mod value;

pub use computation::{Computation, Resume, Sequence, SequenceKey, Step, StepFn, from_fn};
pub use context::ExecutionContext;
pub use effect::{Effect, Mutator};
pub use error::{Error, Interrupt};
pub use interpreter::interpret;
pub use operator::{Operator, OperatorApi};
pub use operators::{call, get_dependencies, get_state};
pub use value::Value;

/// Task handle produced by the interpreter.
pub type ValueTask = strand_task::Task<Value, Error>;
