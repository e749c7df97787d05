use crate::error::CommandExecutionError;
use crate::signal::{Params, Signal};
use crate::task::{Task, TaskId};

use log::{debug, error};
use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error;
use std::fmt::Write;

/// A command failure that the driver recovered from.
///
/// The issuing task was resumed with `null` and kept running.
#[derive(Debug, Clone)]
pub struct CommandFailure {
    /// The task that issued the command.
    pub task: TaskId,
    pub command: String,
    pub params: Params,

    /// Command-specific context registered with the handler.
    pub context: &'static str,

    /// The error, with its source chain flattened into one line.
    pub error: String,
}

/// Logs the diagnostic report for a failed command and returns the
/// journal entry.
pub(crate) fn report(
    task: &Task,
    signal: &Signal,
    context: &'static str,
    err: &CommandExecutionError,
) -> CommandFailure {
    let mut chain = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let _ = write!(chain, ": {cause}");
        source = cause.source();
    }

    error!(
        "command `{}` failed in task {task}; args: {}; {context}: {chain}",
        signal.command(),
        signal.params(),
    );

    let backtrace = Backtrace::capture();
    if backtrace.status() == BacktraceStatus::Captured {
        debug!("backtrace for failed command `{}`:\n{backtrace}", signal.command());
    }

    CommandFailure {
        task: task.id(),
        command: signal.command().to_owned(),
        params: signal.params().clone(),
        context,
        error: chain,
    }
}
