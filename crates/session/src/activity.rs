//! User-activity observation.
//!
//! The heartbeat samples an [`ActivityObserver`] on every tick. The
//! observer itself is fed by the application: [`IdleTracker::touch`] on
//! every bit of user input.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use wsmux_core::ActivityState;

/// Reports whether the user is currently active.
pub trait ActivityObserver: Send + Sync {
    fn current(&self) -> ActivityState;
}

impl<F> ActivityObserver for F
where
    F: Fn() -> ActivityState + Send + Sync,
{
    fn current(&self) -> ActivityState {
        self()
    }
}

/// Active until `idle_timeout` passes without a [`touch`](Self::touch).
///
/// Starts out active, as if touched at construction.
#[derive(Debug)]
pub struct IdleTracker {
    idle_timeout: Duration,
    last_input: Mutex<Instant>,
}

impl IdleTracker {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            idle_timeout,
            last_input: Mutex::new(Instant::now()),
        }
    }

    /// Record user input now.
    pub fn touch(&self) {
        *self.last_input.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Time since the last recorded input.
    pub fn since_last_input(&self) -> Duration {
        self.last_input
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .elapsed()
    }
}

impl ActivityObserver for IdleTracker {
    fn current(&self) -> ActivityState {
        if self.since_last_input() < self.idle_timeout {
            ActivityState::Active
        } else {
            ActivityState::Idle
        }
    }
}

/// Always reports the same state.
#[derive(Debug, Clone, Copy)]
pub struct FixedActivity(pub ActivityState);

impl ActivityObserver for FixedActivity {
    fn current(&self) -> ActivityState {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn idle_after_timeout_and_active_after_touch() {
        let tracker = IdleTracker::new(Duration::from_secs(60));
        assert_eq!(tracker.current(), ActivityState::Active);

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(tracker.current(), ActivityState::Active);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(tracker.current(), ActivityState::Idle);

        tracker.touch();
        assert_eq!(tracker.current(), ActivityState::Active);
        assert_eq!(tracker.since_last_input(), Duration::ZERO);
    }

    #[test]
    fn closures_are_observers() {
        let observer = || ActivityState::Idle;
        assert_eq!(observer.current(), ActivityState::Idle);
        assert_eq!(FixedActivity(ActivityState::Active).current(), ActivityState::Active);
    }
}
