use super::Value;
use crate::error::{CommandExecutionError, MissingParameterError};
use crate::task::Task;

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Named arguments carried by a [`Signal`](super::Signal).
///
/// The typed accessors (`task`, `duration`, ...) are meant for command
/// handlers: they produce the errors the driver knows how to report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    entries: BTreeMap<String, Value>,
}

impl Params {
    /// Creates an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter, builder style.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Inserts a parameter, returning the previous value under that name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(name.into(), value.into())
    }

    /// Returns the parameter `name`, if present.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    /// Returns `true` if a parameter `name` is present.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the parameters in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the parameter `name`, or a [`MissingParameterError`]
    /// naming `command`.
    pub fn require(&self, command: &str, name: &str) -> Result<&Value, MissingParameterError> {
        self.entries.get(name).ok_or_else(|| MissingParameterError {
            command: command.to_owned(),
            parameter: name.to_owned(),
        })
    }

    /// Returns the task handle stored under `name`.
    pub fn task(&self, command: &str, name: &str) -> Result<Task, CommandExecutionError> {
        match self.require(command, name)? {
            Value::Task(task) => Ok(task.clone()),
            other => Err(invalid(command, name, "a task", other)),
        }
    }

    /// Returns the duration stored under `name`.
    ///
    /// Integer and float values are read as seconds.
    pub fn duration(&self, command: &str, name: &str) -> Result<Duration, CommandExecutionError> {
        let value = self.require(command, name)?;

        value
            .as_duration()
            .ok_or_else(|| invalid(command, name, "a non-negative duration", value))
    }

    /// Like [`duration`](Self::duration), but an absent or `null`
    /// parameter yields `None`.
    pub fn optional_duration(
        &self,
        command: &str,
        name: &str,
    ) -> Result<Option<Duration>, CommandExecutionError> {
        match self.entries.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.duration(command, name).map(Some),
        }
    }

    /// Consumes the set and returns the underlying map.
    pub fn into_map(self) -> BTreeMap<String, Value> {
        self.entries
    }
}

fn invalid(command: &str, name: &str, expected: &'static str, found: &Value) -> CommandExecutionError {
    CommandExecutionError::InvalidParameter {
        command: command.to_owned(),
        parameter: name.to_owned(),
        expected,
        found: found.type_name(),
    }
}

impl From<BTreeMap<String, Value>> for Params {
    fn from(entries: BTreeMap<String, Value>) -> Self {
        Self { entries }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_parameter_names_command() {
        let params = Params::new();
        let err = params.require("create_task", "target").unwrap_err();

        assert_eq!(err.command, "create_task");
        assert_eq!(err.parameter, "target");
    }

    #[test]
    fn wrong_kind_is_invalid() {
        let params = Params::new().with("target", 7);
        let err = params.task("await_coroutine", "target").unwrap_err();

        assert!(matches!(
            err,
            CommandExecutionError::InvalidParameter { found: "int", .. }
        ));
    }

    #[test]
    fn optional_duration_accepts_null() {
        let params = Params::new().with("time", Value::Null);
        assert_eq!(params.optional_duration("await_all_tasks", "time").unwrap(), None);

        let params = Params::new().with("time", 2);
        assert_eq!(
            params.optional_duration("await_all_tasks", "time").unwrap(),
            Some(Duration::from_secs(2))
        );
    }
}
