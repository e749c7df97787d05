//! The event loop and its command dispatch.
//!
//! This module contains the driving side of the scheduler:
//! - the single-task driver ([`EventLoop::run`]),
//! - the fair batch driver behind `await_all_tasks`,
//! - the dispatch table mapping command names to handlers,
//! - deadlines for bounded batches,
//! - the journal of recovered command failures.

mod batch;
mod core;
mod deadline;
mod diagnostics;

pub(crate) mod builder;
pub(crate) mod handler;

pub use self::core::EventLoop;
pub use builder::{EventLoopBuilder, NestedQueue};
pub use diagnostics::CommandFailure;
pub use handler::{COROUTINE_FAILED, CommandHandler, HandlerFn};
