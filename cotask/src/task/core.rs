use super::co::{Airlock, Co};
use super::state::TaskState;
use crate::error::{LoopError, SignalFormatError};
use crate::signal::Value;

use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll, Waker};

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    fn next() -> Self {
        TaskId(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw counter value.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Outcome of one resumption.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// The task suspended and handed this value to its driver.
    Yielded(Value),

    /// The task finished with this result.
    Completed(Value),
}

type Body = Pin<Box<dyn Future<Output = Value>>>;

struct TaskCore {
    id: TaskId,
    name: Option<String>,
    state: Cell<TaskState>,

    /// The pinned body. Dropped as soon as the task completes.
    body: RefCell<Option<Body>>,

    airlock: Rc<Airlock>,
}

/// A resumable computation driven by the scheduler.
///
/// `Task` is a reference-counted handle: clones refer to the same
/// computation, and equality is identity. A task is `!Send`; it lives and
/// dies on the thread of the loop that drives it.
#[derive(Clone)]
pub struct Task {
    core: Rc<TaskCore>,
}

impl Task {
    /// Creates a task from a task-defining function.
    ///
    /// `body` is called immediately with the task's [`Co`] handle, but the
    /// future it returns is not polled until the first
    /// [`resume`](Self::resume).
    pub fn new<F, Fut, T>(body: F) -> Self
    where
        F: FnOnce(Co) -> Fut,
        Fut: Future<Output = T> + 'static,
        T: Into<Value>,
    {
        Self::build(None, body)
    }

    /// Creates a named task. The name only shows up in logs and
    /// diagnostics.
    pub fn named<F, Fut, T>(name: impl Into<String>, body: F) -> Self
    where
        F: FnOnce(Co) -> Fut,
        Fut: Future<Output = T> + 'static,
        T: Into<Value>,
    {
        Self::build(Some(name.into()), body)
    }

    fn build<F, Fut, T>(name: Option<String>, body: F) -> Self
    where
        F: FnOnce(Co) -> Fut,
        Fut: Future<Output = T> + 'static,
        T: Into<Value>,
    {
        let airlock = Rc::new(Airlock::default());
        let future = body(Co::new(airlock.clone()));

        Self {
            core: Rc::new(TaskCore {
                id: TaskId::next(),
                name,
                state: Cell::new(TaskState::NotStarted),
                body: RefCell::new(Some(Box::pin(async move { future.await.into() }))),
                airlock,
            }),
        }
    }

    /// Returns the task's process-unique identifier.
    pub fn id(&self) -> TaskId {
        self.core.id
    }

    /// Returns the name given to [`Task::named`], if any.
    pub fn name(&self) -> Option<&str> {
        self.core.name.as_deref()
    }

    /// Returns the current lifecycle state.
    ///
    /// A task whose yielded command is still being dispatched reports
    /// [`TaskState::Running`].
    pub fn state(&self) -> TaskState {
        self.core.state.get()
    }

    /// Returns `true` once the task has returned its result.
    pub fn is_completed(&self) -> bool {
        self.state() == TaskState::Completed
    }

    /// Returns `true` if both handles refer to the same task.
    pub fn same(&self, other: &Task) -> bool {
        Rc::ptr_eq(&self.core, &other.core)
    }

    /// Resumes the task with `value` and runs it to its next suspension
    /// point.
    ///
    /// The value of the first resumption is discarded, since the body has
    /// no pending await to receive it.
    ///
    /// # Errors
    ///
    /// - [`LoopError::TaskBusy`] if the task is already being driven.
    /// - [`LoopError::TaskFinished`] if the task already completed.
    /// - [`SignalFormatError::NothingYielded`] if the body suspended on a
    ///   future that is not a [`Suspend`](super::Suspend).
    pub fn resume(&self, value: Value) -> Result<Step, LoopError> {
        let core = &*self.core;

        match core.state.get() {
            TaskState::Running => return Err(LoopError::TaskBusy(core.id)),
            TaskState::Completed => return Err(LoopError::TaskFinished(core.id)),
            TaskState::NotStarted => {}
            TaskState::Suspended => core.airlock.resume.set(Some(value)),
        }

        let Ok(mut slot) = core.body.try_borrow_mut() else {
            return Err(LoopError::TaskBusy(core.id));
        };
        let Some(body) = slot.as_mut() else {
            return Err(LoopError::TaskFinished(core.id));
        };

        core.state.set(TaskState::Running);

        let mut cx = Context::from_waker(Waker::noop());
        let poll = body.as_mut().poll(&mut cx);

        match poll {
            Poll::Ready(result) => {
                *slot = None;
                core.airlock.clear();
                core.state.set(TaskState::Completed);

                Ok(Step::Completed(result))
            }
            Poll::Pending => {
                core.airlock.resume.take();
                core.state.set(TaskState::Suspended);

                match core.airlock.yielded.take() {
                    Some(value) => Ok(Step::Yielded(value)),
                    None => Err(SignalFormatError::NothingYielded { task: core.id }.into()),
                }
            }
        }
    }

    /// Marks a suspended task as busy while the command it yielded is
    /// being dispatched.
    ///
    /// Any other driver that tries to resume the task before the guard is
    /// dropped gets [`LoopError::TaskBusy`].
    pub(crate) fn dispatching(&self) -> Dispatching<'_> {
        if self.core.state.get() == TaskState::Suspended {
            self.core.state.set(TaskState::Running);
        }

        Dispatching { task: self }
    }
}

/// Guard returned by [`Task::dispatching`]. Puts the task back into
/// [`TaskState::Suspended`] on drop.
pub(crate) struct Dispatching<'a> {
    task: &'a Task,
}

impl Drop for Dispatching<'_> {
    fn drop(&mut self) {
        let state = &self.task.core.state;

        if state.get() == TaskState::Running {
            state.set(TaskState::Suspended);
        }
    }
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl Eq for Task {}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.core.id)
            .field("name", &self.core.name)
            .field("state", &self.core.state.get())
            .finish()
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.core.name {
            Some(name) => write!(f, "{} ({name})", self.core.id),
            None => write!(f, "{}", self.core.id),
        }
    }
}
