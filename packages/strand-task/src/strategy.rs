use crate::task::Task;

/// Reconciles two invocations of the same logical task.
///
/// `compose` receives the currently active task and the newly created one and
/// returns the task that is authoritative from now on. Implementations may
/// cancel one of their inputs but must not otherwise touch them.
pub trait Strategy<T, E> {
    fn compose(&self, old: Task<T, E>, new: Task<T, E>) -> Task<T, E>;
}

impl<T, E, F> Strategy<T, E> for F
where
    F: Fn(Task<T, E>, Task<T, E>) -> Task<T, E>,
{
    fn compose(&self, old: Task<T, E>, new: Task<T, E>) -> Task<T, E> {
        self(old, new)
    }
}

/// Lets every invocation run concurrently.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultStrategy;

impl<T, E> Strategy<T, E> for DefaultStrategy {
    fn compose(&self, _old: Task<T, E>, new: Task<T, E>) -> Task<T, E> {
        new
    }
}

/// Queues the new invocation behind the old one.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChainStrategy;

impl<T, E> Strategy<T, E> for ChainStrategy
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    fn compose(&self, old: Task<T, E>, new: Task<T, E>) -> Task<T, E> {
        old.chain(move |_| new)
    }
}

/// Cancels the old invocation in favour of the new one.
#[derive(Debug, Default, Clone, Copy)]
pub struct SwitchStrategy;

impl<T, E> Strategy<T, E> for SwitchStrategy
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    fn compose(&self, old: Task<T, E>, new: Task<T, E>) -> Task<T, E> {
        old.cancel();
        new
    }
}

/// Keeps a running old invocation and cancels the new one.
#[derive(Debug, Default, Clone, Copy)]
pub struct DropStrategy;

impl<T, E> Strategy<T, E> for DropStrategy
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    fn compose(&self, old: Task<T, E>, new: Task<T, E>) -> Task<T, E> {
        if old.is_running() {
            new.cancel();
            return old;
        }
        new
    }
}
