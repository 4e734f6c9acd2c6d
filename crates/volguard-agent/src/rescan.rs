//! One-off delayed rescans.

use std::time::Duration;

/// Pending full-document rescans, by deadline.
#[derive(Debug, Default, Clone)]
pub struct RescanQueue {
    deadlines: Vec<Duration>,
}

impl RescanQueue {
    /// Empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a rescan at `at`.
    pub fn schedule(&mut self, at: Duration) {
        self.deadlines.push(at);
    }

    /// Remove every deadline at or before `now`; returns whether any were due.
    ///
    /// Several due rescans collapse into one.
    pub fn take_due(&mut self, now: Duration) -> bool {
        let before = self.deadlines.len();
        self.deadlines.retain(|&at| at > now);
        self.deadlines.len() != before
    }

    /// Number of rescans still pending.
    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_rescans_collapse() {
        let mut q = RescanQueue::new();
        q.schedule(Duration::from_millis(500));
        q.schedule(Duration::from_millis(700));
        q.schedule(Duration::from_millis(2000));

        assert!(!q.take_due(Duration::from_millis(400)));
        assert!(q.take_due(Duration::from_millis(800)));
        assert_eq!(q.len(), 1);
        assert!(!q.take_due(Duration::from_millis(800)));
        assert!(q.take_due(Duration::from_secs(2)));
        assert!(q.is_empty());
    }
}
