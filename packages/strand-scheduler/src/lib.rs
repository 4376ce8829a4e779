pub mod config;
pub mod queue;
pub mod scheduler;
mod waker;

use futures::task::LocalSpawn;

/// The host event queue that suspended computations resume on.
///
/// Everything runs on one thread: futures are spawned locally and polled only
/// from `tick`. Runtimes other than [`LocalScheduler`] can implement this to
/// drive strand tasks from their own loop.
pub trait Scheduler: LocalSpawn {
    /// Polls ready futures once. Returns true if more work is ready.
    fn tick(&self) -> bool;

    /// True when no spawned future is waiting to be polled.
    fn is_idle(&self) -> bool;

    /// Ticks until nothing is ready. Returns the number of ticks taken.
    fn run_until_stalled(&self) -> usize {
        let mut ticks = 1;
        while self.tick() {
            ticks += 1;
        }
        ticks
    }
}

pub use config::SchedulerConfig;
pub use scheduler::LocalScheduler;
