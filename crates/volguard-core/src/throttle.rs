//! Report throttling.
//!
//! The tick loop runs at display-ish rates; outbound level reports only need a
//! fraction of that. [`ReportThrottle`] gates reports on elapsed time so the two
//! cadences stay independent.

use core::time::Duration;

/// Default spacing between outbound reports.
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_millis(50);

/// Time gate for outbound reports.
///
/// Timestamps are caller-supplied monotonic offsets, so the throttle works the
/// same under a real clock and under a test clock.
#[derive(Debug, Clone, Copy)]
pub struct ReportThrottle {
    interval: Duration,
    last: Option<Duration>,
}

impl ReportThrottle {
    /// Create a throttle allowing one report per `interval`.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Configured spacing.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns `true` (and records `now`) when more than one interval has
    /// passed since the last accepted report. The first call always passes.
    pub fn should_report(&mut self, now: Duration) -> bool {
        let due = match self.last {
            None => true,
            Some(last) => now.saturating_sub(last) > self.interval,
        };
        if due {
            self.last = Some(now);
        }
        due
    }

    /// Forget the last report time.
    pub fn reset(&mut self) {
        self.last = None;
    }
}

impl Default for ReportThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_REPORT_INTERVAL)
    }
}
