use std::any::{Any, type_name};
use std::fmt;
use std::rc::Rc;

/// Dynamically typed value a computation is resumed with.
///
/// Every effect resumes its computation with a `Value`: the output of a
/// future, the result of a subtask, a state snapshot. Cloning is cheap and
/// shares the payload. The unit value stands for "no value".
#[derive(Clone)]
pub struct Value {
    payload: Option<Rc<dyn Any>>,
    type_name: &'static str,
}

impl Value {
    pub fn new<T: Any>(value: T) -> Self {
        Self {
            payload: Some(Rc::new(value)),
            type_name: type_name::<T>(),
        }
    }

    pub fn unit() -> Self {
        Self {
            payload: None,
            type_name: "()",
        }
    }

    pub fn is_unit(&self) -> bool {
        self.payload.is_none()
    }

    /// Name of the payload type, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is<T: Any>(&self) -> bool {
        self.downcast_ref::<T>().is_some()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.as_ref()?.downcast_ref::<T>()
    }

    /// Clones the payload out if it is a `T`.
    pub fn get<T: Any + Clone>(&self) -> Option<T> {
        self.downcast_ref::<T>().cloned()
    }

    /// True if both values share the same payload allocation.
    pub fn ptr_eq(&self, other: &Value) -> bool {
        match (&self.payload, &other.payload) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::unit()
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value<{}>", self.type_name)
    }
}

impl<T: Any> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Value::new).unwrap_or_default()
    }
}
