use crate::signal::{Signal, Value};
use crate::task::Task;

use std::cell::Cell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};
use std::time::Duration;

/// Exchange slot shared by a task body and its driver.
///
/// The body deposits the value it yields, the driver deposits the value
/// the body is resumed with. Each slot is emptied by its reader.
#[derive(Default)]
pub(crate) struct Airlock {
    pub(crate) yielded: Cell<Option<Value>>,
    pub(crate) resume: Cell<Option<Value>>,
}

impl Airlock {
    pub(crate) fn clear(&self) {
        self.yielded.take();
        self.resume.take();
    }
}

/// Task-side handle to the scheduler.
///
/// A `Co` is passed to the body of every [`Task`]. Its methods return
/// [`Suspend`] futures which must be awaited right away: awaiting one
/// suspends the task, and its output is the value the driver resumed the
/// task with.
///
/// # Examples
///
/// ```rust,ignore
/// let task = Task::new(|co| async move {
///     co.await_time(Duration::from_millis(10)).await;
///     42
/// });
/// ```
pub struct Co {
    airlock: Rc<Airlock>,
}

impl Co {
    pub(crate) fn new(airlock: Rc<Airlock>) -> Self {
        Self { airlock }
    }

    /// Yields an arbitrary value to the driver.
    ///
    /// The driver expects the value to decode as a [`Signal`]; anything
    /// else aborts the run with a signal format error.
    pub fn yield_value(&self, value: impl Into<Value>) -> Suspend {
        Suspend {
            airlock: self.airlock.clone(),
            value: Some(value.into()),
        }
    }

    /// Yields a signal and resolves to the command's result.
    pub fn signal(&self, signal: Signal) -> Suspend {
        self.yield_value(signal)
    }

    /// Suspends once and resumes with `null`.
    pub fn none(&self) -> Suspend {
        self.signal(Signal::none())
    }

    /// Sleeps for `time`. Inside a batch, other tasks run meanwhile.
    pub fn await_time(&self, time: Duration) -> Suspend {
        self.signal(Signal::await_time(time))
    }

    /// Runs `target` to completion before this task continues.
    pub fn await_coroutine(&self, target: Task) -> Suspend {
        self.signal(Signal::await_coroutine(target))
    }

    /// Queues `target` without starting it.
    pub fn create_task(&self, target: Task) -> Suspend {
        self.signal(Signal::create_task(target))
    }

    /// Removes `target` from the queue if it is waiting there.
    pub fn remove_task(&self, target: &Task) -> Suspend {
        self.signal(Signal::remove_task(target))
    }

    /// Waits for `target` alone, leaving other queued tasks in place.
    pub fn await_task(&self, target: Task) -> Suspend {
        self.signal(Signal::await_task(target))
    }

    /// Drains every queued task and returns their results in completion
    /// order.
    pub async fn await_all_tasks(&self) -> Vec<Value> {
        self.signal(Signal::await_all_tasks()).await.into_list()
    }

    /// Like [`await_all_tasks`](Self::await_all_tasks), but gives up after
    /// `time`. Tasks that did not finish stay queued.
    pub async fn await_all_tasks_within(&self, time: Duration) -> Vec<Value> {
        self.signal(Signal::await_all_tasks_within(time))
            .await
            .into_list()
    }
}

/// A single suspension point.
///
/// The first poll hands the yielded value to the driver and returns
/// `Pending`. The next poll, which only happens when the driver resumes
/// the task, completes with the resume value.
pub struct Suspend {
    airlock: Rc<Airlock>,
    value: Option<Value>,
}

impl Future for Suspend {
    type Output = Value;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        if let Some(value) = this.value.take() {
            this.airlock.yielded.set(Some(value));
            return Poll::Pending;
        }

        Poll::Ready(this.airlock.resume.take().unwrap_or_default())
    }
}
