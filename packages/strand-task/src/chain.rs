use crate::task::{Notifications, Task, TaskResolver};
use std::cell::RefCell;
use std::rc::Rc;

impl<T, E> Task<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    /// Returns a task that runs `self`, then the task produced by `lift`.
    ///
    /// `lift` receives the result of `self`. If `self` is cancelled, `lift` is
    /// called with `None` and the task it returns is cancelled without being
    /// run; the chained task is cancelled as well. If `self` rejects, `lift` is
    /// never called and the chained task rejects with the same error.
    ///
    /// Cancelling the chained task cancels whichever link is live.
    pub fn chain<U, F>(&self, lift: F) -> Task<U, E>
    where
        U: Clone + 'static,
        F: FnOnce(Option<&T>) -> Task<U, E> + 'static,
    {
        let base = self.clone();
        Task::new(move |resolver: TaskResolver<U, E>| {
            let lift = Rc::new(RefCell::new(Some(lift)));
            let next: Rc<RefCell<Option<Task<U, E>>>> = Rc::default();

            resolver.on_cancelled({
                let base = base.clone();
                let next = next.clone();
                move || {
                    base.cancel();
                    let next = next.borrow_mut().take();
                    if let Some(next) = next {
                        next.cancel();
                    }
                }
            });

            let on_resolved = {
                let lift = lift.clone();
                let resolver = resolver.clone();
                move |value: &T| {
                    let lift = lift.borrow_mut().take();
                    let Some(lift) = lift else {
                        return;
                    };
                    let task = lift(Some(value));
                    *next.borrow_mut() = Some(task.clone());
                    follow(&task, resolver);
                }
            };
            let on_rejected = {
                let resolver = resolver.clone();
                move |error: &E| resolver.reject(error.clone())
            };
            let on_cancelled = move || {
                let lift = lift.borrow_mut().take();
                if let Some(lift) = lift {
                    lift(None).cancel();
                }
                resolver.cancel();
            };

            base.run_with(
                Notifications::new()
                    .on_resolved(on_resolved)
                    .on_rejected(on_rejected)
                    .on_cancelled(on_cancelled),
            );
        })
    }
}

/// Runs `task` and mirrors its outcome onto `resolver`.
fn follow<U, E>(task: &Task<U, E>, resolver: TaskResolver<U, E>)
where
    U: Clone + 'static,
    E: Clone + 'static,
{
    let resolved = resolver.clone();
    let rejected = resolver.clone();
    task.run_with(
        Notifications::new()
            .on_resolved(move |value: &U| resolved.resolve(value.clone()))
            .on_rejected(move |error: &E| rejected.reject(error.clone()))
            .on_cancelled(move || resolver.cancel()),
    );
}
