use crate::task::{Notifications, Task, WeakTask};
use futures::channel::oneshot;
use std::cell::Cell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

/// Why a task did not produce a value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskFailure<E> {
    #[error("task rejected: {0:?}")]
    Rejected(E),
    #[error("task cancelled")]
    Cancelled,
    /// The task was cancelled and its cleanup raised an unrelated error.
    #[error("task cancelled, cleanup failed: {0:?}")]
    CleanupFailed(E),
}

/// Future resolving with the terminal outcome of a task.
///
/// Created by [`Task::to_future`].
pub struct TaskFuture<T, E> {
    receiver: oneshot::Receiver<Result<T, TaskFailure<E>>>,
    task: WeakTask<T, E>,
}

impl<T, E> TaskFuture<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    // A cleanup failure can be recorded after the cancellation was
    // delivered, so it is looked up when the outcome is taken.
    fn cancelled(&self) -> TaskFailure<E> {
        match self.task.upgrade().and_then(|task| task.cleanup_error()) {
            Some(error) => TaskFailure::CleanupFailed(error),
            None => TaskFailure::Cancelled,
        }
    }
}

impl<T, E> Future for TaskFuture<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    type Output = Result<T, TaskFailure<E>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let polled = Pin::new(&mut self.receiver).poll(cx);
        match polled {
            Poll::Ready(Ok(Err(TaskFailure::Cancelled))) => Poll::Ready(Err(self.cancelled())),
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            // The task was dropped before it ever finished.
            Poll::Ready(Err(oneshot::Canceled)) => Poll::Ready(Err(TaskFailure::Cancelled)),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T, E> Task<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    /// Bridges the task's terminal outcome into a future.
    ///
    /// Does not start the task.
    pub fn to_future(&self) -> TaskFuture<T, E> {
        let (sender, receiver) = oneshot::channel();
        let sender = Rc::new(Cell::new(Some(sender)));

        let resolved = sender.clone();
        let rejected = sender.clone();
        self.listen(
            Notifications::new()
                .on_resolved(move |value: &T| {
                    if let Some(sender) = resolved.take() {
                        let _ = sender.send(Ok(value.clone()));
                    }
                })
                .on_rejected(move |error: &E| {
                    if let Some(sender) = rejected.take() {
                        let _ = sender.send(Err(TaskFailure::Rejected(error.clone())));
                    }
                })
                .on_cancelled(move || {
                    if let Some(sender) = sender.take() {
                        let _ = sender.send(Err(TaskFailure::Cancelled));
                    }
                }),
        );

        TaskFuture {
            receiver,
            task: self.downgrade(),
        }
    }
}
