//! Per-tab level statistics.

use std::collections::VecDeque;

use volguard_protocol::LevelStats;

/// Rolling statistics for one tab.
///
/// `current` takes every report as-is. Only finite reports enter the bounded
/// history, feed the average, and can raise the peak.
#[derive(Debug, Clone)]
pub struct TabStateRecord {
    current: f32,
    history: VecDeque<f32>,
    capacity: usize,
    alpha: f32,
    average: f32,
    peak: f32,
}

impl TabStateRecord {
    /// Empty record keeping at most `capacity` samples (minimum one),
    /// averaging with smoothing factor `alpha`.
    pub fn new(capacity: usize, alpha: f32) -> Self {
        let capacity = capacity.max(1);
        Self {
            current: f32::NEG_INFINITY,
            history: VecDeque::with_capacity(capacity),
            capacity,
            alpha,
            average: f32::NEG_INFINITY,
            peak: f32::NEG_INFINITY,
        }
    }

    /// Take one level report.
    pub fn ingest(&mut self, db: f32) {
        // NaN carries no level; treat it as silence
        self.current = if db.is_nan() { f32::NEG_INFINITY } else { db };
        if !db.is_finite() {
            return;
        }

        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(db);
        self.average = ema(&self.history, self.alpha);

        if db > self.peak {
            self.peak = db;
        }
    }

    /// Last reported level.
    pub fn current(&self) -> f32 {
        self.current
    }

    /// EMA over the history, seeded with the oldest sample. `-∞` when empty.
    pub fn average(&self) -> f32 {
        self.average
    }

    /// Highest finite level since the last reset.
    pub fn peak(&self) -> f32 {
        self.peak
    }

    /// Forget the peak. History and current level are untouched.
    pub fn reset_peak(&mut self) {
        self.peak = f32::NEG_INFINITY;
    }

    /// Finite samples, oldest first.
    pub fn history(&self) -> impl ExactSizeIterator<Item = f32> + '_ {
        self.history.iter().copied()
    }

    /// History bound.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshot for queries and pushes.
    pub fn stats(&self) -> LevelStats {
        LevelStats {
            db: self.current,
            average_db: self.average,
            peak_db: self.peak,
        }
    }
}

/// `avg₀ = h₀`, `avgᵢ = avgᵢ₋₁ + α·(hᵢ - avgᵢ₋₁)`. Exact for a constant history.
fn ema(history: &VecDeque<f32>, alpha: f32) -> f32 {
    let mut samples = history.iter().copied();
    let Some(seed) = samples.next() else {
        return f32::NEG_INFINITY;
    };
    samples.fold(seed, |avg, s| avg + alpha * (s - avg))
}
