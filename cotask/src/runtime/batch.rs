use super::EventLoop;
use super::deadline::{Deadline, sleep_until};
use super::diagnostics::report;
use super::handler::wake_instant;
use crate::error::{CommandExecutionError, LoopError, LoopResult};
use crate::signal::{AWAIT_TIME, Signal, Value};
use crate::task::{Entry, Step, Task};

use log::{debug, warn};
use std::time::{Duration, Instant};

/// Outcome of resuming one queued task once.
enum Turn {
    /// The task suspended and goes back to the tail of the queue.
    Requeue(Entry),

    /// The task finished with this result.
    Done(Value),

    /// The entry held a task that already completed elsewhere.
    Stale,
}

/// A drain stopped by a fatal error.
pub(crate) struct DrainError {
    /// Results of the tasks that completed before the failure.
    pub(crate) completed: Vec<Value>,
    pub(crate) error: LoopError,
}

impl From<DrainError> for CommandExecutionError {
    fn from(failed: DrainError) -> Self {
        CommandExecutionError::Batch {
            source: Box::new(failed.error),
            completed: failed.completed,
        }
    }
}

impl EventLoop {
    /// Queues `tasks` and drains the queue, interleaving every queued task
    /// round-robin.
    ///
    /// Results are returned in completion order. Tasks already waiting in
    /// the queue take part in the batch.
    ///
    /// # Errors
    ///
    /// Fails on the first fatal error raised by any task; the failing task
    /// is dropped and the others stay queued.
    pub fn run_tasks<I>(&mut self, tasks: I) -> LoopResult<Vec<Value>>
    where
        I: IntoIterator<Item = Task>,
    {
        for task in tasks {
            self.enqueue(task);
        }

        self.drain(Deadline::unbounded()).map_err(|failed| failed.error)
    }

    /// Like [`run_tasks`](Self::run_tasks), but stops selecting tasks once
    /// `time` has elapsed.
    ///
    /// The returned results may be partial. Unfinished tasks stay queued,
    /// along with their pending sleep, for a later drain.
    pub fn run_tasks_within<I>(&mut self, tasks: I, time: Duration) -> LoopResult<Vec<Value>>
    where
        I: IntoIterator<Item = Task>,
    {
        for task in tasks {
            self.enqueue(task);
        }

        self.drain(Deadline::after(time)).map_err(|failed| failed.error)
    }

    /// Drains whatever is already queued, for instance tasks left behind
    /// by a drain that hit its deadline.
    pub fn run_queued(&mut self) -> LoopResult<Vec<Value>> {
        self.drain(Deadline::unbounded()).map_err(|failed| failed.error)
    }

    /// Like [`run_queued`](Self::run_queued), bounded by `time`.
    pub fn run_queued_within(&mut self, time: Duration) -> LoopResult<Vec<Value>> {
        self.drain(Deadline::after(time)).map_err(|failed| failed.error)
    }

    /// The batch driver.
    ///
    /// Each turn picks the first queued task that is not sleeping, resumes
    /// it once and puts it back at the tail. An `await_time` does not block
    /// the batch; it only marks the task as sleeping. When every queued
    /// task sleeps, the thread sleeps until the earliest of them wakes up
    /// or the deadline passes.
    ///
    /// Tasks created while the batch runs land in the same queue and are
    /// drained by this pass. Entries whose task already completed, for
    /// instance through `await_coroutine`, are dropped.
    ///
    /// A fatal error stops the drain. The failing task is dropped, its
    /// siblings stay queued, and the results gathered so far travel with
    /// the error.
    pub(crate) fn drain(&mut self, deadline: Deadline) -> Result<Vec<Value>, DrainError> {
        let mut results = Vec::new();

        debug!(
            "draining {} queued task(s){}",
            self.queued(),
            if deadline.is_bounded() { " under a deadline" } else { "" }
        );

        while self.queued() > 0 {
            if deadline.expired() {
                warn!(
                    "batch deadline reached, {} task(s) left queued",
                    self.queued()
                );
                break;
            }

            let next = self.queue().borrow_mut().pop_ready(Instant::now());
            let Some(entry) = next else {
                let earliest = self.queue().borrow().earliest_wake();
                if let Some(wake_at) = earliest {
                    sleep_until(deadline.clamp(wake_at));
                }
                continue;
            };

            match self.turn(entry) {
                Ok(Turn::Requeue(entry)) => self.queue().borrow_mut().push_back(entry),
                Ok(Turn::Done(result)) => results.push(result),
                Ok(Turn::Stale) => {}
                Err(error) => {
                    return Err(DrainError {
                        completed: results,
                        error,
                    });
                }
            }
        }

        debug!("batch finished with {} result(s)", results.len());
        Ok(results)
    }

    /// Resumes a queued task once and handles what it yields.
    fn turn(&mut self, entry: Entry) -> LoopResult<Turn> {
        let Entry { task, resume, .. } = entry;

        if task.is_completed() {
            debug!("dropping queued task {task}, it already completed");
            return Ok(Turn::Stale);
        }

        let raw = match task.resume(resume)? {
            Step::Completed(result) => {
                debug!("task {task} completed in batch");
                return Ok(Turn::Done(result));
            }
            Step::Yielded(raw) => raw,
        };

        let signal = Signal::try_from(raw)?;

        if signal.command() != AWAIT_TIME {
            let resume = {
                let _busy = task.dispatching();
                self.execute(&task, signal)?
            };
            return Ok(Turn::Requeue(Entry {
                task,
                resume,
                wake_at: None,
            }));
        }

        let command = self.handler().lookup(AWAIT_TIME)?;
        let wake_at = match wake_instant(signal.params()) {
            Ok(instant) => Some(instant),
            Err(err) => {
                let failure = report(&task, &signal, command.context, &err);
                self.record(failure);
                None
            }
        };

        Ok(Turn::Requeue(Entry {
            task,
            resume: Value::Null,
            wake_at,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{LoopError, SignalFormatError};

    use std::cell::RefCell;
    use std::rc::Rc;

    fn sleeper(log: Rc<RefCell<Vec<String>>>, name: &'static str, ms: u64) -> Task {
        Task::named(name, move |co| async move {
            log.borrow_mut().push(format!("{name} start"));
            co.await_time(Duration::from_millis(ms)).await;
            log.borrow_mut().push(format!("{name} end"));
            name
        })
    }

    #[test]
    fn interleaves_and_orders_by_completion() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut event_loop = EventLoop::new();

        let results = event_loop
            .run_tasks([
                sleeper(log.clone(), "slow", 40),
                sleeper(log.clone(), "fast", 10),
            ])
            .unwrap();

        assert_eq!(results, vec![Value::from("fast"), Value::from("slow")]);
        assert_eq!(
            *log.borrow(),
            ["slow start", "fast start", "fast end", "slow end"]
        );
    }

    #[test]
    fn deadline_leaves_unfinished_tasks_queued() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut event_loop = EventLoop::new();
        let slow = sleeper(log.clone(), "slow", 200);

        let start = Instant::now();
        let results = event_loop
            .run_tasks_within([slow.clone()], Duration::from_millis(30))
            .unwrap();

        assert!(results.is_empty());
        assert!(start.elapsed() < Duration::from_millis(150));
        assert_eq!(event_loop.pending_tasks(), vec![slow]);

        let results = event_loop.run_queued().unwrap();
        assert_eq!(results, vec![Value::from("slow")]);
        assert_eq!(event_loop.queued(), 0);
    }

    #[test]
    fn malformed_await_time_is_recovered() {
        let mut event_loop = EventLoop::new();
        let task = Task::new(|co| async move {
            co.signal(Signal::new(AWAIT_TIME, Default::default())).await;
            "woke"
        });

        let results = event_loop.run_tasks([task]).unwrap();

        assert_eq!(results, vec![Value::from("woke")]);
        assert_eq!(event_loop.failures()[0].command, AWAIT_TIME);
    }

    #[test]
    fn fatal_error_keeps_siblings_queued() {
        let mut event_loop = EventLoop::new();
        let bad = Task::new(|co| async move {
            co.yield_value(3).await;
        });
        let good = Task::new(|co| async move {
            co.none().await;
        });

        let err = event_loop.run_tasks([bad, good.clone()]).unwrap_err();

        assert!(matches!(
            err,
            LoopError::SignalFormat(SignalFormatError::NotAPair { found: "int" })
        ));
        assert_eq!(event_loop.pending_tasks(), vec![good]);
    }
}
