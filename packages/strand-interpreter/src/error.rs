use crate::value::Value;
use futures::task::SpawnError;
use std::any::Any;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_INTERRUPT: AtomicU64 = AtomicU64::new(1);

/// Unique signal injected into a computation when its task is cancelled.
///
/// A computation that lets the interrupt propagate has unwound cleanly; any
/// other error raised in response is a cleanup failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interrupt(u64);

impl Interrupt {
    pub fn new() -> Self {
        Self(NEXT_INTERRUPT.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for Interrupt {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Interrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "interrupt #{}", self.0)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("cancelled ({0})")]
    Cancelled(Interrupt),

    #[error("cannot interpret a yielded {0}")]
    InvalidYieldable(&'static str),

    #[error("failed to spawn future: {0}")]
    Spawn(Rc<SpawnError>),

    #[error("{0}")]
    Custom(Rc<dyn std::error::Error>),

    #[error("computation raised {0:?}")]
    Thrown(Value),
}

impl Error {
    pub fn custom<E: std::error::Error + 'static>(error: E) -> Self {
        Error::Custom(Rc::new(error))
    }

    /// Raises an arbitrary value, for computations whose failures are not
    /// `std::error::Error`s.
    pub fn thrown<T: Any>(value: T) -> Self {
        Error::Thrown(Value::new(value))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled(_))
    }

    /// True if this error is exactly the given interrupt.
    pub fn is_interrupt(&self, interrupt: Interrupt) -> bool {
        matches!(self, Error::Cancelled(i) if *i == interrupt)
    }

    pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            Error::Custom(error) => error.downcast_ref::<E>(),
            _ => None,
        }
    }

    pub fn thrown_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Error::Thrown(value) => value.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl From<SpawnError> for Error {
    fn from(error: SpawnError) -> Self {
        Error::Spawn(Rc::new(error))
    }
}
