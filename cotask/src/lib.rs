//! # cotask
//!
//! **cotask** is a cooperative task scheduler built from nothing but
//! resumable computations and a command dispatcher.
//!
//! A task is an `async` body that never touches a reactor or a waker. It
//! suspends by yielding a *signal*, a command name plus named parameters,
//! and the event loop answers by running the matching handler and resuming
//! the task with the handler's result. Everything runs on one thread;
//! tasks interleave only at the points where they yield.
//!
//! The scheduler offers:
//!
//! - a **single-task driver** that runs an entry task to completion,
//! - **nested loops** that await a sub-task synchronously,
//! - a **fair batch driver** that interleaves queued tasks round-robin,
//! - **deadline-bounded batches** that leave unfinished tasks queued,
//! - an **extensible dispatch table** for custom commands.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cotask::{Co, Task};
//! use std::time::Duration;
//!
//! fn worker(name: &'static str) -> Task {
//!     Task::named(name, move |co| async move {
//!         println!("Starting {name}...");
//!         co.await_time(Duration::from_millis(100)).await;
//!         println!("Ending {name}...");
//!     })
//! }
//!
//! #[cotask::main]
//! async fn main(co: Co) {
//!     co.create_task(worker("task1")).await;
//!     co.create_task(worker("task2")).await;
//!     co.await_all_tasks().await;
//! }
//! ```
//!
//! ## Modules
//!
//! - [`signal`] — Signals, parameters and dynamic values
//! - [`task`] — Resumable tasks and the task queue
//! - [`error`] — Fatal and recoverable errors

mod runtime;

pub mod error;
pub mod signal;
pub mod task;

pub use error::{
    CommandExecutionError, LoopError, LoopResult, MissingParameterError, ProtocolError,
    SignalFormatError,
};
pub use runtime::{
    COROUTINE_FAILED, CommandFailure, CommandHandler, EventLoop, EventLoopBuilder, HandlerFn,
    NestedQueue,
};
pub use signal::{Params, Signal, Value};
pub use task::{Co, Step, Task, TaskId, TaskQueue, TaskState};

pub use cotask_macros::*;
