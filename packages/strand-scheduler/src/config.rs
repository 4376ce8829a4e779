/// Tuning knobs for [`LocalScheduler`](crate::LocalScheduler).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Upper bound on futures polled by a single `tick`, so that futures which
    /// keep waking themselves cannot starve the host loop.
    pub poll_budget: usize,
}

impl SchedulerConfig {
    pub const DEFAULT_POLL_BUDGET: usize = 1024;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_poll_budget(mut self, poll_budget: usize) -> Self {
        self.poll_budget = poll_budget.max(1);
        self
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_budget: Self::DEFAULT_POLL_BUDGET,
        }
    }
}
