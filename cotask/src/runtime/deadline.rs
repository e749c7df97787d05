use std::thread;
use std::time::{Duration, Instant};

/// Wall-clock bound on a batch drain.
///
/// A deadline is only ever consulted between two task switches. A task
/// segment that never yields, or a handler that blocks, runs past it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Deadline {
    /// `None` means the drain is unbounded.
    at: Option<Instant>,
}

impl Deadline {
    /// A deadline that never expires.
    pub(crate) fn unbounded() -> Self {
        Self { at: None }
    }

    pub(crate) fn at(instant: Instant) -> Self {
        Self { at: Some(instant) }
    }

    /// A deadline `duration` from now. A duration too large for the clock
    /// to represent never expires.
    pub(crate) fn after(duration: Duration) -> Self {
        Instant::now()
            .checked_add(duration)
            .map_or_else(Self::unbounded, Self::at)
    }

    /// `None` means unbounded.
    pub(crate) fn from_timeout(timeout: Option<Duration>) -> Self {
        timeout.map_or_else(Self::unbounded, Self::after)
    }

    pub(crate) fn is_bounded(&self) -> bool {
        self.at.is_some()
    }

    /// Returns `true` once the deadline has passed.
    pub(crate) fn expired(&self) -> bool {
        self.at.is_some_and(|at| Instant::now() >= at)
    }

    /// Caps a wake-up instant so that a sleep never overshoots the
    /// deadline.
    pub(crate) fn clamp(&self, wake_at: Instant) -> Instant {
        match self.at {
            Some(at) => wake_at.min(at),
            None => wake_at,
        }
    }
}

/// Blocks the current thread until `instant`. Returns immediately if it
/// already passed.
pub(crate) fn sleep_until(instant: Instant) {
    let now = Instant::now();

    if instant > now {
        thread::sleep(instant - now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbounded_never_expires() {
        let deadline = Deadline::from_timeout(None);

        assert!(!deadline.is_bounded());
        assert!(!deadline.expired());

        let far = Instant::now() + Duration::from_secs(3600);
        assert_eq!(deadline.clamp(far), far);
    }

    #[test]
    fn zero_timeout_is_already_expired() {
        assert!(Deadline::from_timeout(Some(Duration::ZERO)).expired());
    }

    #[test]
    fn unrepresentable_timeout_is_unbounded() {
        let deadline = Deadline::after(Duration::MAX);

        assert!(!deadline.is_bounded());
        assert!(!deadline.expired());
    }

    #[test]
    fn clamp_caps_at_deadline() {
        let at = Instant::now() + Duration::from_millis(10);
        let deadline = Deadline::at(at);

        assert_eq!(deadline.clamp(at + Duration::from_secs(1)), at);
        assert_eq!(deadline.clamp(at - Duration::from_millis(5)), at - Duration::from_millis(5));
    }

    #[test]
    fn sleep_until_waits() {
        let start = Instant::now();
        sleep_until(start + Duration::from_millis(20));

        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
