/// Lifecycle state of a [`Task`](super::Task).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Created but never resumed.
    ///
    /// The value passed to the first resumption is discarded.
    NotStarted,

    /// Parked at a suspension point, waiting for its resume value.
    Suspended,

    /// Currently being driven.
    ///
    /// At most one driver may observe this state at a time.
    Running,

    /// Returned its terminal value and will not be resumed again.
    Completed,
}
