//! The signal protocol.
//!
//! A task talks to the scheduler by yielding signals: a command name and a
//! set of named parameters. On the wire (which never leaves the process) a
//! signal is the value `[command, {params}]`; anything else a task yields
//! is rejected with a [`SignalFormatError`].
//!
//! | command           | params            | resumes with           |
//! |-------------------|-------------------|------------------------|
//! | `none`            | —                 | `null`                 |
//! | `await_time`      | `time`            | `null`                 |
//! | `await_coroutine` | `target`          | the target's result    |
//! | `create_task`     | `target`          | `null`                 |
//! | `remove_task`     | `target`          | `null`                 |
//! | `await_all_tasks` | `time` (optional) | list of results        |
//! | `await_task`      | `target`          | the target's result    |

mod params;
mod value;

pub use params::Params;
pub use value::Value;

use crate::error::SignalFormatError;
use crate::task::Task;

use std::time::Duration;

/// Resumes immediately with `null`.
pub const NONE: &str = "none";
/// Suspends the issuing task for `time`.
pub const AWAIT_TIME: &str = "await_time";
/// Runs `target` to completion on a nested loop.
pub const AWAIT_COROUTINE: &str = "await_coroutine";
/// Queues `target` without starting it.
pub const CREATE_TASK: &str = "create_task";
/// Drops `target` from the queue.
pub const REMOVE_TASK: &str = "remove_task";
/// Drains the queue, optionally bounded by `time`.
pub const AWAIT_ALL_TASKS: &str = "await_all_tasks";
/// Waits for `target` alone.
pub const AWAIT_TASK: &str = "await_task";

/// Parameter naming the task a command operates on.
pub const TARGET: &str = "target";

/// Parameter naming a duration.
pub const TIME: &str = "time";

/// A `(command, params)` message yielded by a task at a suspension point.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    command: String,
    params: Params,
}

impl Signal {
    /// Creates a signal for `command` with `params`.
    pub fn new(command: impl Into<String>, params: Params) -> Self {
        Self {
            command: command.into(),
            params,
        }
    }

    /// The command name.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// The named parameters.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Splits the signal into its command name and parameters.
    pub fn into_parts(self) -> (String, Params) {
        (self.command, self.params)
    }

    /// `none`: a plain suspension point.
    pub fn none() -> Self {
        Self::new(NONE, Params::new())
    }

    /// `await_time` for `time`.
    pub fn await_time(time: Duration) -> Self {
        Self::new(AWAIT_TIME, Params::new().with(TIME, time))
    }

    /// `await_coroutine` on `target`.
    pub fn await_coroutine(target: Task) -> Self {
        Self::new(AWAIT_COROUTINE, Params::new().with(TARGET, target))
    }

    /// `create_task` for `target`.
    pub fn create_task(target: Task) -> Self {
        Self::new(CREATE_TASK, Params::new().with(TARGET, target))
    }

    /// `remove_task` for `target`.
    pub fn remove_task(target: &Task) -> Self {
        Self::new(REMOVE_TASK, Params::new().with(TARGET, target.clone()))
    }

    /// `await_all_tasks` without a time limit.
    pub fn await_all_tasks() -> Self {
        Self::new(AWAIT_ALL_TASKS, Params::new())
    }

    /// `await_all_tasks` bounded by `time`.
    pub fn await_all_tasks_within(time: Duration) -> Self {
        Self::new(AWAIT_ALL_TASKS, Params::new().with(TIME, time))
    }

    /// `await_task` on `target`.
    pub fn await_task(target: Task) -> Self {
        Self::new(AWAIT_TASK, Params::new().with(TARGET, target))
    }
}

impl From<Signal> for Value {
    fn from(signal: Signal) -> Self {
        Value::List(vec![
            Value::Str(signal.command),
            Value::Map(signal.params.into_map()),
        ])
    }
}

impl TryFrom<Value> for Signal {
    type Error = SignalFormatError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let Value::List(items) = value else {
            return Err(SignalFormatError::NotAPair {
                found: value.type_name(),
            });
        };

        let [command, params]: [Value; 2] = items
            .try_into()
            .map_err(|items: Vec<Value>| SignalFormatError::WrongArity { len: items.len() })?;

        let Value::Str(command) = command else {
            return Err(SignalFormatError::CommandNotString {
                found: command.type_name(),
            });
        };

        let Value::Map(params) = params else {
            return Err(SignalFormatError::ParamsNotMap {
                found: params.type_name(),
            });
        };

        Ok(Signal::new(command, params.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_form_decodes() {
        let signal = Signal::await_time(Duration::from_millis(5));
        let decoded = Signal::try_from(Value::from(signal.clone())).unwrap();

        assert_eq!(decoded, signal);
    }

    #[test]
    fn rejects_malformed_values() {
        assert_eq!(
            Signal::try_from(Value::from("none")),
            Err(SignalFormatError::NotAPair { found: "string" })
        );
        assert_eq!(
            Signal::try_from(Value::List(vec![Value::from("none")])),
            Err(SignalFormatError::WrongArity { len: 1 })
        );
        assert_eq!(
            Signal::try_from(Value::List(vec![Value::Int(1), Value::Map(Default::default())])),
            Err(SignalFormatError::CommandNotString { found: "int" })
        );
        assert_eq!(
            Signal::try_from(Value::List(vec![Value::from("none"), Value::Null])),
            Err(SignalFormatError::ParamsNotMap { found: "null" })
        );
    }
}
