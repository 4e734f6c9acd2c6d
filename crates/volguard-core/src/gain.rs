//! Adaptive gain controller.
//!
//! Converts a per-tick RMS measurement into a corrective gain so the bound
//! media never plays louder than the configured ceiling.
//!
//! # Algorithm
//!
//! With `limit = 10^(limit_db/20)`:
//!
//! 1. **Attack**: if `rms > limit`, gain jumps straight to
//!    `max(MIN_GAIN, limit / rms)`. No smoothing, so the current tick is never
//!    allowed over the ceiling.
//! 2. **Release**: otherwise gain climbs as `min(1.0, gain * RELEASE_FACTOR)`,
//!    roughly 1% per tick back toward unity.
//! 3. **Disabled**: gain is forced to exactly 1.0.
//!
//! The asymmetry mirrors the instant-attack / exponential-release ballistics of
//! a brickwall limiter, but at tick rate instead of sample rate.

use crate::math::dbfs_to_amplitude;

/// Lowest gain the controller will ever apply (-40 dB).
pub const MIN_GAIN: f32 = 0.01;

/// Unity gain.
pub const UNITY_GAIN: f32 = 1.0;

/// Per-tick release multiplier.
pub const RELEASE_FACTOR: f32 = 1.01;

/// Default ceiling in dBFS.
pub const DEFAULT_LIMIT_DB: f32 = -20.0;

/// Tick-rate gain controller.
///
/// # Example
///
/// ```rust
/// use volguard_core::{GainController, MIN_GAIN};
///
/// let mut gc = GainController::new();
/// gc.set_enabled(true);
/// gc.set_limit_db(-20.0);
///
/// // 0 dBFS into a -20 dBFS ceiling: instant 20 dB cut
/// let g = gc.tick(1.0);
/// assert!((g - 0.1).abs() < 1e-6);
///
/// // Quiet again: release by 1%
/// let g2 = gc.tick(0.01);
/// assert!((g2 - 0.101).abs() < 1e-6);
/// assert!(g2 >= MIN_GAIN);
/// ```
#[derive(Debug, Clone)]
pub struct GainController {
    enabled: bool,
    limit_db: f32,
    /// Cached `dbfs_to_amplitude(limit_db)`.
    limit_rms: f32,
    gain: f32,
}

impl GainController {
    /// Create a disabled controller at unity gain with the default ceiling.
    pub fn new() -> Self {
        Self {
            enabled: false,
            limit_db: DEFAULT_LIMIT_DB,
            limit_rms: dbfs_to_amplitude(DEFAULT_LIMIT_DB),
            gain: UNITY_GAIN,
        }
    }

    /// Create a controller with the given enablement and ceiling.
    pub fn with_config(enabled: bool, limit_db: f32) -> Self {
        let mut gc = Self::new();
        gc.set_enabled(enabled);
        gc.set_limit_db(limit_db);
        gc
    }

    /// Enable or disable limiting.
    ///
    /// Disabling takes effect on the next [`tick`](Self::tick), which returns
    /// exactly 1.0.
    pub fn set_enabled(&mut self, enabled: bool) {
        #[cfg(feature = "tracing")]
        if enabled != self.enabled {
            tracing::debug!(enabled, "gain controller toggled");
        }
        self.enabled = enabled;
    }

    /// Whether limiting is active.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Set the ceiling in dBFS.
    ///
    /// Non-finite values are ignored and the previous ceiling is kept.
    /// Positive values are clamped to 0 dBFS.
    pub fn set_limit_db(&mut self, limit_db: f32) {
        if !limit_db.is_finite() {
            return;
        }
        self.limit_db = limit_db.min(0.0);
        self.limit_rms = dbfs_to_amplitude(self.limit_db);
    }

    /// Current ceiling in dBFS.
    pub fn limit_db(&self) -> f32 {
        self.limit_db
    }

    /// Current ceiling as a linear RMS amplitude.
    pub fn limit_rms(&self) -> f32 {
        self.limit_rms
    }

    /// Gain computed by the most recent tick.
    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Advance one tick with the measured RMS and return the new gain.
    ///
    /// The result is always in `[MIN_GAIN, 1.0]`.
    #[inline]
    pub fn tick(&mut self, rms: f32) -> f32 {
        if !self.enabled {
            self.gain = UNITY_GAIN;
            return self.gain;
        }

        self.gain = if rms > self.limit_rms {
            (self.limit_rms / rms).max(MIN_GAIN)
        } else {
            (self.gain * RELEASE_FACTOR).min(UNITY_GAIN)
        };
        self.gain
    }

    /// Return to unity gain without touching configuration.
    pub fn reset(&mut self) {
        self.gain = UNITY_GAIN;
    }
}

impl Default for GainController {
    fn default() -> Self {
        Self::new()
    }
}
