//! Bounded retry schedule for pages that render media late.

use std::time::Duration;

/// Where a [`RetrySchedule`] stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// Not started.
    Idle,
    /// Waiting for the next attempt.
    Armed {
        /// When the next attempt is due.
        next_at: Duration,
    },
    /// Media was found; no more attempts.
    Satisfied,
    /// Attempt budget spent.
    Exhausted,
}

/// Fixed-interval retry with an attempt budget.
///
/// Armed once after an initial scan that found nothing. Each due attempt
/// either finds media (stop) or consumes budget.
#[derive(Debug, Clone)]
pub struct RetrySchedule {
    interval: Duration,
    max_attempts: u32,
    attempts: u32,
    state: RetryState,
}

impl RetrySchedule {
    /// Create an idle schedule.
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
            attempts: 0,
            state: RetryState::Idle,
        }
    }

    /// Start retrying. Ignored unless idle.
    pub fn arm(&mut self, now: Duration) {
        if self.state == RetryState::Idle {
            self.state = if self.max_attempts == 0 {
                RetryState::Exhausted
            } else {
                RetryState::Armed {
                    next_at: now + self.interval,
                }
            };
        }
    }

    /// Whether an attempt is due at `now`.
    pub fn is_due(&self, now: Duration) -> bool {
        matches!(self.state, RetryState::Armed { next_at } if now >= next_at)
    }

    /// Record the outcome of an attempt made at `now`.
    pub fn record(&mut self, now: Duration, found_media: bool) {
        if !matches!(self.state, RetryState::Armed { .. }) {
            return;
        }
        self.attempts += 1;
        self.state = if found_media {
            RetryState::Satisfied
        } else if self.attempts >= self.max_attempts {
            RetryState::Exhausted
        } else {
            RetryState::Armed {
                next_at: now + self.interval,
            }
        };
    }

    /// Stop retrying because media turned up some other way.
    pub fn satisfy(&mut self) {
        if matches!(self.state, RetryState::Armed { .. }) {
            self.state = RetryState::Satisfied;
        }
    }

    /// Attempts made so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Current state.
    pub fn state(&self) -> RetryState {
        self.state
    }

    /// Whether attempts are still scheduled.
    pub fn is_active(&self) -> bool {
        matches!(self.state, RetryState::Armed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEC: Duration = Duration::from_secs(1);

    #[test]
    fn stops_after_budget() {
        let mut r = RetrySchedule::new(SEC, 3);
        r.arm(Duration::ZERO);
        let mut now = Duration::ZERO;
        while r.is_active() {
            now += SEC;
            assert!(r.is_due(now));
            r.record(now, false);
        }
        assert_eq!(r.attempts(), 3);
        assert_eq!(r.state(), RetryState::Exhausted);
    }

    #[test]
    fn stops_when_media_found() {
        let mut r = RetrySchedule::new(SEC, 10);
        r.arm(Duration::ZERO);
        r.record(SEC, false);
        r.record(2 * SEC, true);
        assert_eq!(r.state(), RetryState::Satisfied);
        assert_eq!(r.attempts(), 2);
        assert!(!r.is_due(10 * SEC));
    }

    #[test]
    fn not_due_before_interval() {
        let mut r = RetrySchedule::new(SEC, 10);
        r.arm(Duration::from_millis(100));
        assert!(!r.is_due(Duration::from_millis(900)));
        assert!(r.is_due(Duration::from_millis(1100)));
    }

    #[test]
    fn arm_is_once() {
        let mut r = RetrySchedule::new(SEC, 1);
        r.arm(Duration::ZERO);
        r.record(SEC, false);
        r.arm(5 * SEC);
        assert_eq!(r.state(), RetryState::Exhausted);
    }

    #[test]
    fn zero_budget_never_runs() {
        let mut r = RetrySchedule::new(SEC, 0);
        r.arm(Duration::ZERO);
        assert!(!r.is_active());
    }
}
