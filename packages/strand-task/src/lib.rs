pub mod chain;
pub mod future;
pub mod strategy;
pub mod task;

pub use future::{TaskFailure, TaskFuture};
pub use strategy::{ChainStrategy, DefaultStrategy, DropStrategy, Strategy, SwitchStrategy};
pub use task::{Notifications, Task, TaskId, TaskResolver, TaskStatus};
