use slotmap::{SlotMap, new_key_type};
use smallvec::SmallVec;
use rustc_hash::FxHashMap;
use std::rc::Rc;
use strand_interpreter::{SequenceKey, ValueTask};

new_key_type! {
    pub struct LiveKey;
    pub struct WatchKey;
    pub struct SubscriptionKey;
}

pub(crate) type Watcher = Rc<dyn Fn(&ValueTask)>;

/// Every task started through a store that has not finished yet.
#[derive(Default)]
pub(crate) struct LiveTasks {
    tasks: SlotMap<LiveKey, ValueTask>,
}

impl LiveTasks {
    pub(crate) fn insert(&mut self, task: ValueTask) -> LiveKey {
        self.tasks.insert(task)
    }

    pub(crate) fn remove(&mut self, key: LiveKey) {
        self.tasks.remove(key);
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.len()
    }

    pub(crate) fn drain(&mut self) -> Vec<ValueTask> {
        self.tasks.drain().map(|(_, task)| task).collect()
    }
}

/// Per-sequence bookkeeping: the active composed task, the last task
/// announced to watchers, and the watchers themselves.
#[derive(Default)]
pub(crate) struct TaskMap {
    active: FxHashMap<SequenceKey, ValueTask>,
    latest: FxHashMap<SequenceKey, ValueTask>,
    watchers: SlotMap<WatchKey, (SequenceKey, Watcher)>,
}

impl TaskMap {
    pub(crate) fn active(&self, sequence: SequenceKey) -> Option<ValueTask> {
        self.active.get(&sequence).cloned()
    }

    pub(crate) fn set_active(&mut self, sequence: SequenceKey, task: ValueTask) {
        self.active.insert(sequence, task);
    }

    /// Forgets `task` if it is still the active one for `sequence`.
    pub(crate) fn clear_active(&mut self, sequence: SequenceKey, task: &ValueTask) {
        if self
            .active
            .get(&sequence)
            .is_some_and(|active| active.ptr_eq(task))
        {
            self.active.remove(&sequence);
        }
    }

    pub(crate) fn latest(&self, sequence: SequenceKey) -> Option<ValueTask> {
        self.latest.get(&sequence).cloned()
    }

    /// Records `task` as the latest for `sequence` and returns the watchers
    /// to notify.
    pub(crate) fn announce(&mut self, sequence: SequenceKey, task: ValueTask) -> SmallVec<[Watcher; 2]> {
        self.latest.insert(sequence, task);
        self.watchers
            .values()
            .filter(|(key, _)| *key == sequence)
            .map(|(_, watcher)| watcher.clone())
            .collect()
    }

    pub(crate) fn watch(&mut self, sequence: SequenceKey, watcher: Watcher) -> WatchKey {
        self.watchers.insert((sequence, watcher))
    }

    pub(crate) fn unwatch(&mut self, key: WatchKey) -> bool {
        self.watchers.remove(key).is_some()
    }
}
