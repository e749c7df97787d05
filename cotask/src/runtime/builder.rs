use super::EventLoop;
use super::handler::{Command, HandlerFn};

/// Which queue a loop created for `await_coroutine` uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NestedQueue {
    /// The nested loop gets a fresh queue of its own. Tasks the awaited
    /// coroutine leaves in it are drained before its result is returned.
    #[default]
    Isolated,

    /// The nested loop shares the queue of its parent, so tasks created
    /// by the awaited coroutine stay visible to the caller.
    Shared,
}

/// Configuration shared by a loop and every loop nested under it.
#[derive(Clone, Default)]
pub(crate) struct LoopConfig {
    pub(crate) nested_queue: NestedQueue,

    /// Let a sleeping entry task drain the queue instead of blocking idle.
    pub(crate) drain_on_sleep: bool,

    /// Extra commands, installed on top of the built-ins.
    pub(crate) commands: Vec<(String, Command)>,
}

/// Builder for configuring and creating an [`EventLoop`].
///
/// # Examples
///
/// ```rust,ignore
/// let mut event_loop = EventLoopBuilder::new()
///     .nested_queue(NestedQueue::Shared)
///     .drain_on_sleep(true)
///     .build();
/// ```
pub struct EventLoopBuilder {
    config: LoopConfig,
}

impl EventLoopBuilder {
    /// Creates a builder with the default configuration: isolated nested
    /// queues, blocking sleeps, built-in commands only.
    pub fn new() -> Self {
        Self {
            config: LoopConfig::default(),
        }
    }

    /// Sets the queue policy for loops created by `await_coroutine`.
    pub fn nested_queue(mut self, policy: NestedQueue) -> Self {
        self.config.nested_queue = policy;
        self
    }

    /// When enabled, an `await_time` issued by the entry task runs the
    /// queued tasks until the requested time is up, then sleeps whatever
    /// remains.
    pub fn drain_on_sleep(mut self, enabled: bool) -> Self {
        self.config.drain_on_sleep = enabled;
        self
    }

    /// Registers an additional command, or overrides a built-in one.
    ///
    /// `context` is reported alongside the error whenever the handler
    /// fails.
    ///
    /// # Panics
    ///
    /// Panics if `name` is empty.
    pub fn command(
        mut self,
        name: impl Into<String>,
        handler: HandlerFn,
        context: &'static str,
    ) -> Self {
        let name = name.into();
        assert!(!name.is_empty(), "command name must not be empty");

        self.config
            .commands
            .push((name, Command { handler, context }));
        self
    }

    /// Builds the loop with the configured options.
    pub fn build(self) -> EventLoop {
        EventLoop::with_config(self.config, Default::default(), 0)
    }
}

impl Default for EventLoopBuilder {
    fn default() -> Self {
        Self::new()
    }
}
