use crate::signal::Value;
use crate::task::Task;

use std::collections::VecDeque;
use std::time::Instant;

/// A queued task together with its scheduling state.
pub(crate) struct Entry {
    pub(crate) task: Task,

    /// Value the task is resumed with next time it is selected.
    pub(crate) resume: Value,

    /// The task asked to sleep until this instant.
    pub(crate) wake_at: Option<Instant>,
}

impl Entry {
    pub(crate) fn new(task: Task) -> Self {
        Self {
            task,
            resume: Value::Null,
            wake_at: None,
        }
    }

    /// Returns `true` if the entry may be resumed at `now`.
    pub(crate) fn is_ready(&self, now: Instant) -> bool {
        self.wake_at.is_none_or(|wake_at| wake_at <= now)
    }
}

/// Ordered collection of pending tasks.
///
/// Tasks are enqueued at the tail and drained from the head, so insertion
/// order decides who runs first. The queue does not reject duplicates:
/// every enqueue is an independent entry, and [`remove`](Self::remove)
/// drops the first entry holding that very task.
#[derive(Default)]
pub struct TaskQueue {
    entries: VecDeque<Entry>,
}

impl TaskQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes `task` at the tail of the queue.
    pub fn enqueue(&mut self, task: Task) {
        self.entries.push_back(Entry::new(task));
    }

    /// Removes the first entry holding `task`.
    ///
    /// Comparison is by identity. Returns `false` if the task was not
    /// queued.
    pub fn remove(&mut self, task: &Task) -> bool {
        self.take(task).is_some()
    }

    /// Returns `true` if `task` has an entry in the queue.
    pub fn contains(&self, task: &Task) -> bool {
        self.entries.iter().any(|e| e.task.same(task))
    }

    /// Number of queued entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the queued tasks, head first.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.entries.iter().map(|e| &e.task)
    }

    /// Empties the queue, returning the tasks in order.
    pub fn drain(&mut self) -> Vec<Task> {
        self.entries.drain(..).map(|e| e.task).collect()
    }

    /// Removes and returns the entry holding `task`, scheduling state
    /// included.
    pub(crate) fn take(&mut self, task: &Task) -> Option<Entry> {
        let index = self.entries.iter().position(|e| e.task.same(task))?;
        self.entries.remove(index)
    }

    pub(crate) fn push_back(&mut self, entry: Entry) {
        self.entries.push_back(entry);
    }

    /// Removes the entry closest to the head that is ready at `now`.
    ///
    /// Sleeping entries ahead of it keep their place.
    pub(crate) fn pop_ready(&mut self, now: Instant) -> Option<Entry> {
        let index = self.entries.iter().position(|e| e.is_ready(now))?;
        self.entries.remove(index)
    }

    /// Earliest instant at which some sleeping entry wakes up.
    pub(crate) fn earliest_wake(&self) -> Option<Instant> {
        self.entries.iter().filter_map(|e| e.wake_at).min()
    }
}
