//! The command dispatch table and the built-in commands.

use super::EventLoop;
use super::deadline::{Deadline, sleep_until};
use crate::error::{CommandExecutionError, ProtocolError};
use crate::signal::{
    AWAIT_ALL_TASKS, AWAIT_COROUTINE, AWAIT_TASK, AWAIT_TIME, CREATE_TASK, NONE, Params,
    REMOVE_TASK, TARGET, TIME, Value,
};
use crate::task::{Task, TaskQueue};

use log::debug;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Instant;

/// Signature of a command handler.
///
/// A handler receives the loop that dispatched the command and the
/// signal's parameters. The value it returns is moved into the task as
/// its resume value.
pub type HandlerFn = fn(&mut EventLoop, &Params) -> Result<Value, CommandExecutionError>;

/// Context message reported when an awaited coroutine fails.
pub const COROUTINE_FAILED: &str = "the awaited coroutine failed to run";

/// A registered command.
#[derive(Clone, Copy)]
pub(crate) struct Command {
    pub(crate) handler: HandlerFn,

    /// Reported alongside the error when the handler fails.
    pub(crate) context: &'static str,
}

/// Dispatch table of one loop, plus the queue of its lineage.
///
/// The queue is reference-counted so that nested loops can opt into
/// sharing it.
pub struct CommandHandler {
    table: HashMap<String, Command>,
    queue: Rc<RefCell<TaskQueue>>,
}

impl CommandHandler {
    /// Creates a handler with every built-in command registered.
    pub(crate) fn new(queue: Rc<RefCell<TaskQueue>>) -> Self {
        let mut handler = Self {
            table: HashMap::new(),
            queue,
        };

        handler.register(NONE, none, "no-op failed");
        handler.register(AWAIT_TIME, await_time, "could not suspend for the requested time");
        handler.register(AWAIT_COROUTINE, await_coroutine, COROUTINE_FAILED);
        handler.register(CREATE_TASK, create_task, "could not queue the task");
        handler.register(REMOVE_TASK, remove_task, "could not remove the task");
        handler.register(AWAIT_ALL_TASKS, await_all_tasks, "could not drain the task queue");
        handler.register(AWAIT_TASK, await_task, COROUTINE_FAILED);

        handler
    }

    /// Registers `handler` under `name`, replacing any previous entry.
    pub(crate) fn register(
        &mut self,
        name: impl Into<String>,
        handler: HandlerFn,
        context: &'static str,
    ) {
        self.table.insert(name.into(), Command { handler, context });
    }

    /// Returns `true` if `command` is part of the protocol.
    pub fn contains(&self, command: &str) -> bool {
        self.table.contains_key(command)
    }

    /// Names of every registered command, in no particular order.
    pub fn commands(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(String::as_str)
    }

    /// Finds the handler registered for `command`.
    pub(crate) fn lookup(&self, command: &str) -> Result<Command, ProtocolError> {
        self.table.get(command).copied().ok_or_else(|| ProtocolError {
            command: command.to_owned(),
        })
    }

    /// The queue shared by every loop of this lineage.
    pub(crate) fn queue(&self) -> &Rc<RefCell<TaskQueue>> {
        &self.queue
    }
}

fn none(_: &mut EventLoop, _: &Params) -> Result<Value, CommandExecutionError> {
    Ok(Value::Null)
}

/// Reads the `time` parameter of `await_time` as an instant from now.
///
/// A duration past what the clock can represent is rejected as an invalid
/// parameter rather than sleeping forever.
pub(crate) fn wake_instant(params: &Params) -> Result<Instant, CommandExecutionError> {
    let time = params.duration(AWAIT_TIME, TIME)?;

    Instant::now()
        .checked_add(time)
        .ok_or_else(|| CommandExecutionError::InvalidParameter {
            command: AWAIT_TIME.to_owned(),
            parameter: TIME.to_owned(),
            expected: "a duration the clock can represent",
            found: params.get(TIME).map_or("null", Value::type_name),
        })
}

fn await_time(event_loop: &mut EventLoop, params: &Params) -> Result<Value, CommandExecutionError> {
    let wake_at = wake_instant(params)?;

    if event_loop.config().drain_on_sleep && event_loop.queued() > 0 {
        event_loop.drain(Deadline::at(wake_at))?;
    }

    sleep_until(wake_at);
    Ok(Value::Null)
}

fn await_coroutine(
    event_loop: &mut EventLoop,
    params: &Params,
) -> Result<Value, CommandExecutionError> {
    let target = params.task(AWAIT_COROUTINE, TARGET)?;

    if target.is_completed() {
        return Err(CommandExecutionError::TargetFinished {
            command: AWAIT_COROUTINE.to_owned(),
            task: target.id(),
        });
    }

    // A queued target would otherwise be resumed again by the next drain.
    let resume = take_queued(event_loop, &target);

    event_loop
        .run_nested(target, resume)
        .map_err(|e| CommandExecutionError::Coroutine(Box::new(e)))
}

/// Takes `target` out of the lineage queue and returns the value it is to
/// be resumed with, sleeping out any pending `await_time` first.
fn take_queued(event_loop: &mut EventLoop, target: &Task) -> Value {
    let entry = event_loop.queue().borrow_mut().take(target);

    match entry {
        Some(entry) => {
            if let Some(wake_at) = entry.wake_at {
                sleep_until(wake_at);
            }
            entry.resume
        }
        None => Value::Null,
    }
}

fn create_task(event_loop: &mut EventLoop, params: &Params) -> Result<Value, CommandExecutionError> {
    let target = params.task(CREATE_TASK, TARGET)?;

    if target.is_completed() {
        return Err(CommandExecutionError::TargetFinished {
            command: CREATE_TASK.to_owned(),
            task: target.id(),
        });
    }

    debug!("queueing task {target}");
    event_loop.queue().borrow_mut().enqueue(target);

    Ok(Value::Null)
}

fn remove_task(event_loop: &mut EventLoop, params: &Params) -> Result<Value, CommandExecutionError> {
    let target = params.task(REMOVE_TASK, TARGET)?;

    if event_loop.queue().borrow_mut().remove(&target) {
        debug!("removed task {target} from the queue");
    } else {
        debug!("task {target} was not queued, nothing to remove");
    }

    Ok(Value::Null)
}

fn await_all_tasks(
    event_loop: &mut EventLoop,
    params: &Params,
) -> Result<Value, CommandExecutionError> {
    // A zero `time` means no limit, like an absent one.
    let timeout = params
        .optional_duration(AWAIT_ALL_TASKS, TIME)?
        .filter(|time| !time.is_zero());

    let results = event_loop.drain(Deadline::from_timeout(timeout))?;

    Ok(Value::List(results))
}

/// Waits for one task without draining its siblings.
///
/// A queued target is taken out of the queue along with its pending
/// resume value and wake-up instant, then driven on this loop.
fn await_task(event_loop: &mut EventLoop, params: &Params) -> Result<Value, CommandExecutionError> {
    let target = params.task(AWAIT_TASK, TARGET)?;

    if target.is_completed() {
        return Err(CommandExecutionError::TargetFinished {
            command: AWAIT_TASK.to_owned(),
            task: target.id(),
        });
    }

    let resume = take_queued(event_loop, &target);

    event_loop
        .drive(&target, resume)
        .map_err(|e| CommandExecutionError::Coroutine(Box::new(e)))
}
