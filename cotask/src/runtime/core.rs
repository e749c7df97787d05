use super::builder::{EventLoopBuilder, LoopConfig, NestedQueue};
use super::deadline::Deadline;
use super::diagnostics::{CommandFailure, report};
use super::handler::CommandHandler;
use crate::error::LoopResult;
use crate::signal::{Signal, Value};
use crate::task::{Step, Task, TaskQueue};

use log::{debug, trace};
use std::cell::RefCell;
use std::rc::Rc;

/// The scheduler.
///
/// An `EventLoop` drives tasks by resuming them, decoding the signal each
/// one yields, and dispatching it through its [`CommandHandler`]. The
/// handler's result becomes the task's next resume value.
///
/// The loop owns its dispatch table and, through it, the task queue of
/// its lineage. Loops created to service `await_coroutine` are
/// independent unless configured with [`NestedQueue::Shared`].
///
/// # Examples
///
/// ```rust,ignore
/// let mut event_loop = EventLoop::new();
///
/// let result = event_loop.run(Task::new(|co| async move {
///     co.await_time(Duration::from_millis(5)).await;
///     "done"
/// }))?;
/// ```
pub struct EventLoop {
    handler: CommandHandler,
    config: LoopConfig,

    /// Recovered command failures, oldest first.
    failures: Vec<CommandFailure>,

    /// How many `await_coroutine` levels deep this loop sits.
    depth: usize,
}

impl EventLoop {
    /// Creates a loop with the default configuration.
    pub fn new() -> Self {
        EventLoopBuilder::new().build()
    }

    /// Returns a builder for a loop with custom options or commands.
    pub fn builder() -> EventLoopBuilder {
        EventLoopBuilder::new()
    }

    /// Creates a loop over `queue`, installing the configured commands.
    pub(crate) fn with_config(
        config: LoopConfig,
        queue: Rc<RefCell<TaskQueue>>,
        depth: usize,
    ) -> Self {
        let mut handler = CommandHandler::new(queue);
        for (name, command) in &config.commands {
            handler.register(name.clone(), command.handler, command.context);
        }

        Self {
            handler,
            config,
            failures: Vec::new(),
            depth,
        }
    }

    /// Drives `entry` to completion and returns its result.
    ///
    /// Command failures are reported and recovered: the task is resumed
    /// with `null` and keeps running. See [`failures`](Self::failures).
    ///
    /// # Errors
    ///
    /// Fails if `entry` yields a malformed signal or an unknown command,
    /// or if it is already running or completed.
    pub fn run(&mut self, entry: Task) -> LoopResult<Value> {
        self.drive(&entry, Value::Null)
    }

    /// The single-task driver, starting from `resume`.
    pub(crate) fn drive(&mut self, task: &Task, mut resume: Value) -> LoopResult<Value> {
        debug!("driving task {task} at depth {}", self.depth);

        loop {
            match task.resume(resume)? {
                Step::Completed(result) => {
                    debug!("task {task} completed");
                    return Ok(result);
                }
                Step::Yielded(raw) => {
                    let signal = Signal::try_from(raw)?;
                    let _busy = task.dispatching();
                    resume = self.execute(task, signal)?;
                }
            }
        }
    }

    /// Dispatches `signal` on behalf of `task`.
    ///
    /// Unknown commands are fatal. A failing handler is reported and
    /// yields [`CommandExecutionError::into_resume_value`], normally
    /// `null`.
    ///
    /// [`CommandExecutionError::into_resume_value`]: crate::CommandExecutionError::into_resume_value
    pub(crate) fn execute(&mut self, task: &Task, signal: Signal) -> LoopResult<Value> {
        let command = self.handler.lookup(signal.command())?;

        trace!(
            "task {task} -> {} {}",
            signal.command(),
            signal.params()
        );

        match (command.handler)(self, signal.params()) {
            Ok(value) => Ok(value),
            Err(err) => {
                let failure = report(task, &signal, command.context, &err);
                self.record(failure);
                Ok(err.into_resume_value())
            }
        }
    }

    /// Appends a recovered failure to the journal.
    pub(crate) fn record(&mut self, failure: CommandFailure) {
        self.failures.push(failure);
    }

    /// Runs `target` on a fresh loop nested under this one, starting from
    /// `resume`.
    ///
    /// With an isolated queue, tasks the target created but never awaited
    /// are drained before its result is handed back, so nothing it started
    /// is lost with the nested loop.
    pub(crate) fn run_nested(&mut self, target: Task, resume: Value) -> LoopResult<Value> {
        let policy = self.config.nested_queue;
        let queue = match policy {
            NestedQueue::Isolated => Rc::default(),
            NestedQueue::Shared => self.handler.queue().clone(),
        };

        let mut nested = EventLoop::with_config(self.config.clone(), queue, self.depth + 1);

        let result = nested.drive(&target, resume).and_then(|result| {
            if policy == NestedQueue::Isolated && nested.queued() > 0 {
                debug!(
                    "draining {} task(s) left queued by awaited task {target}",
                    nested.queued()
                );
                nested
                    .drain(Deadline::unbounded())
                    .map_err(|failed| failed.error)?;
            }
            Ok(result)
        });

        self.failures.append(&mut nested.failures);
        result
    }

    /// Recovered command failures, oldest first. Failures inside nested
    /// loops are included.
    pub fn failures(&self) -> &[CommandFailure] {
        &self.failures
    }

    /// Returns the recovered failures and clears the journal.
    pub fn take_failures(&mut self) -> Vec<CommandFailure> {
        std::mem::take(&mut self.failures)
    }

    /// Number of tasks waiting in this loop's queue.
    pub fn queued(&self) -> usize {
        self.handler.queue().borrow().len()
    }

    /// The tasks waiting in this loop's queue, head first.
    pub fn pending_tasks(&self) -> Vec<Task> {
        self.handler.queue().borrow().tasks().cloned().collect()
    }

    /// Appends `task` to this loop's queue without running it.
    pub fn enqueue(&mut self, task: Task) {
        self.handler.queue().borrow_mut().enqueue(task);
    }

    /// The dispatch table of this loop.
    pub fn handler(&self) -> &CommandHandler {
        &self.handler
    }

    /// The queue of this loop's lineage.
    pub(crate) fn queue(&self) -> &Rc<RefCell<TaskQueue>> {
        self.handler.queue()
    }

    pub(crate) fn config(&self) -> &LoopConfig {
        &self.config
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CommandExecutionError, LoopError, ProtocolError};
    use crate::signal::Params;

    #[test]
    fn returns_terminal_value() {
        let mut event_loop = EventLoop::new();
        let result = event_loop
            .run(Task::new(|co| async move {
                let echoed = co.none().await;
                assert!(echoed.is_null());
                7
            }))
            .unwrap();

        assert_eq!(result, Value::Int(7));
    }

    #[test]
    fn missing_parameter_is_recovered() {
        let mut event_loop = EventLoop::new();
        let result = event_loop
            .run(Task::new(|co| async move {
                let resumed = co.signal(Signal::new("create_task", Params::new())).await;
                assert!(resumed.is_null());
                "still running"
            }))
            .unwrap();

        assert_eq!(result, Value::from("still running"));

        let failures = event_loop.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].command, "create_task");
        assert!(failures[0].error.contains("target"));
    }

    #[test]
    fn unknown_command_aborts() {
        let mut event_loop = EventLoop::new();
        let err = event_loop
            .run(Task::new(|co| async move {
                co.signal(Signal::new("teleport", Params::new())).await;
            }))
            .unwrap_err();

        assert!(matches!(
            err,
            LoopError::Protocol(ProtocolError { ref command }) if command == "teleport"
        ));
    }

    #[test]
    fn custom_command_is_dispatched() {
        fn double(_: &mut EventLoop, params: &Params) -> Result<Value, CommandExecutionError> {
            let n = params
                .require("double", "n")?
                .as_int()
                .ok_or_else(|| CommandExecutionError::Failed("n must be an int".into()))?;
            Ok(Value::Int(n * 2))
        }

        let mut event_loop = EventLoop::builder()
            .command("double", double, "could not double")
            .build();

        let result = event_loop
            .run(Task::new(|co| async move {
                co.signal(Signal::new("double", Params::new().with("n", 21)))
                    .await
            }))
            .unwrap();

        assert_eq!(result, Value::Int(42));
    }

    #[test]
    fn nested_failures_reach_the_parent_journal() {
        let mut event_loop = EventLoop::new();

        event_loop
            .run(Task::new(|co| async move {
                let inner = Task::new(|co| async move {
                    co.signal(Signal::new("remove_task", Params::new())).await;
                });
                co.await_coroutine(inner).await;
            }))
            .unwrap();

        assert_eq!(event_loop.failures().len(), 1);
        assert_eq!(event_loop.take_failures()[0].command, "remove_task");
        assert!(event_loop.failures().is_empty());
    }
}
