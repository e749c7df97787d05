//! Error taxonomy of the scheduler.
//!
//! Errors come in two channels:
//! - [`LoopError`] is fatal. It aborts the driving operation and is
//!   returned to whoever called [`EventLoop::run`](crate::EventLoop::run)
//!   or [`EventLoop::run_tasks`](crate::EventLoop::run_tasks).
//! - [`CommandExecutionError`] is recoverable. It is raised by a command
//!   handler, reported by the driver, and the task that issued the command
//!   is resumed with [`Value::Null`](crate::Value::Null).

use crate::signal::Value;
use crate::task::TaskId;

/// A task yielded something that is not a `(command, params)` pair.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignalFormatError {
    /// The yielded value is not a list at all.
    #[error("signal must be a (command, params) pair, found {found}")]
    NotAPair { found: &'static str },

    /// The yielded list does not have exactly two elements.
    #[error("signal must have exactly 2 elements, found {len}")]
    WrongArity { len: usize },

    /// The first element is not a command name.
    #[error("signal command must be a string, found {found}")]
    CommandNotString { found: &'static str },

    /// The second element is not a parameter mapping.
    #[error("signal params must be a map, found {found}")]
    ParamsNotMap { found: &'static str },

    /// The task suspended on something other than a signal.
    #[error("task {task} suspended without yielding a signal")]
    NothingYielded { task: TaskId },
}

/// The command named by a signal is not registered in the dispatch table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("command `{command}` is not part of the protocol")]
pub struct ProtocolError {
    pub command: String,
}

/// A handler did not find a parameter it requires.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("command `{command}` requires parameter `{parameter}`")]
pub struct MissingParameterError {
    pub command: String,
    pub parameter: String,
}

/// Failure raised while executing a dispatched command.
///
/// These never abort the task that issued the command.
#[derive(Debug, thiserror::Error)]
pub enum CommandExecutionError {
    #[error(transparent)]
    MissingParameter(#[from] MissingParameterError),

    /// A parameter is present but holds the wrong kind of value.
    #[error("parameter `{parameter}` of `{command}` expected {expected}, found {found}")]
    InvalidParameter {
        command: String,
        parameter: String,
        expected: &'static str,
        found: &'static str,
    },

    /// The target task has already run to completion.
    #[error("`{command}` target {task} has already completed")]
    TargetFinished { command: String, task: TaskId },

    /// A nested loop driving an awaited task failed fatally.
    #[error("awaited coroutine failed")]
    Coroutine(#[source] Box<LoopError>),

    /// A queued task failed fatally while the queue was being drained.
    ///
    /// The failing task is dropped and its siblings stay queued. Results of
    /// the tasks that completed before the failure are kept in `completed`.
    #[error("queued task failed while draining")]
    Batch {
        #[source]
        source: Box<LoopError>,
        completed: Vec<Value>,
    },

    /// Free-form failure raised by a custom handler.
    #[error("{0}")]
    Failed(String),
}

impl CommandExecutionError {
    /// The value the issuing task is resumed with once the failure has
    /// been reported.
    ///
    /// This is `null`, except for a drain that completed some tasks before
    /// failing: their results are handed over instead of being lost.
    pub fn into_resume_value(self) -> Value {
        match self {
            CommandExecutionError::Batch { completed, .. } if !completed.is_empty() => {
                Value::List(completed)
            }
            _ => Value::Null,
        }
    }
}

/// Fatal scheduler error.
#[derive(Debug, thiserror::Error)]
pub enum LoopError {
    #[error(transparent)]
    SignalFormat(#[from] SignalFormatError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A task was resumed while it was already being driven.
    #[error("task {0} is already being driven")]
    TaskBusy(TaskId),

    /// A task was resumed after it completed.
    #[error("task {0} has already completed")]
    TaskFinished(TaskId),
}

/// Result of a driving operation.
pub type LoopResult<T> = Result<T, LoopError>;
