//! Resumable tasks.
//!
//! A task is an `async` body that talks to the scheduler through a [`Co`]
//! handle. Each `co.signal(..).await` is a suspension point: the signal is
//! handed to whoever is driving the task, and the await resolves to the
//! value the driver resumes the task with.
//!
//! Tasks are plain state machines. Nothing here knows about event loops;
//! the runtime only relies on [`Task::resume`].

mod co;
mod core;
mod queue;
mod state;

pub use co::{Co, Suspend};
pub use self::core::{Step, Task, TaskId};
pub use queue::TaskQueue;
pub use state::TaskState;

pub(crate) use queue::Entry;
