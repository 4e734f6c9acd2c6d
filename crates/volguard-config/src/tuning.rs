//! Tunable timing and aggregation constants.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::ConfigError;

/// Timing and aggregation constants shared by the page agent and aggregator.
///
/// None of these are correctness invariants; they trade responsiveness against
/// message volume and CPU. Every field has a default, so a tuning file only
/// needs to list what it changes.
///
/// # TOML Format
///
/// ```toml
/// tick_interval_ms = 33
/// report_interval_ms = 50
/// history_capacity = 100
/// ema_alpha = 0.3
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Gain loop period (≈30 ticks/s).
    pub tick_interval_ms: u64,
    /// Minimum spacing between outbound level reports.
    pub report_interval_ms: u64,
    /// Samples the analyser hands the meter per tick.
    pub analysis_buffer_len: usize,
    /// Finite samples kept per tab for the rolling average.
    pub history_capacity: usize,
    /// EMA smoothing factor in (0, 1].
    pub ema_alpha: f32,
    /// Delay between discovery retries while a page shows no media.
    pub retry_interval_ms: u64,
    /// Discovery retries before giving up.
    pub retry_max_attempts: u32,
    /// Deepest element/shadow nesting a scan will descend into.
    pub max_traversal_depth: usize,
    /// One-off rescan after the page finishes loading.
    pub rescan_after_load_ms: u64,
    /// One-off rescan after a user gesture.
    pub rescan_after_gesture_ms: u64,
    /// Re-check period while the observed root does not exist yet.
    pub observer_install_retry_ms: u64,
    /// How long the agent waits for a `getConfig` reply.
    pub config_timeout_ms: u64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            tick_interval_ms: 33,
            report_interval_ms: 50,
            analysis_buffer_len: 2048,
            history_capacity: 100,
            ema_alpha: 0.3,
            retry_interval_ms: 1000,
            retry_max_attempts: 10,
            max_traversal_depth: 64,
            rescan_after_load_ms: 2000,
            rescan_after_gesture_ms: 500,
            observer_install_retry_ms: 500,
            config_timeout_ms: 500,
        }
    }
}

impl Tuning {
    /// Load tuning from a TOML file and validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml(&content)
    }

    /// Load tuning from `path`, falling back to defaults when the file is absent.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no tuning file, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Parse and validate tuning from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let tuning: Tuning = toml::from_str(toml_str)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject values that would stall or break the loops.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("tick_interval_ms", self.tick_interval_ms),
            ("report_interval_ms", self.report_interval_ms),
            ("retry_interval_ms", self.retry_interval_ms),
            ("observer_install_retry_ms", self.observer_install_retry_ms),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::tuning(field, "must be greater than zero"));
            }
        }
        if self.analysis_buffer_len == 0 {
            return Err(ConfigError::tuning("analysis_buffer_len", "must be at least 1"));
        }
        if self.history_capacity == 0 {
            return Err(ConfigError::tuning("history_capacity", "must be at least 1"));
        }
        if self.max_traversal_depth == 0 {
            return Err(ConfigError::tuning("max_traversal_depth", "must be at least 1"));
        }
        if !(self.ema_alpha > 0.0 && self.ema_alpha <= 1.0) {
            return Err(ConfigError::tuning(
                "ema_alpha",
                format!("{} is outside (0, 1]", self.ema_alpha),
            ));
        }
        Ok(())
    }

    /// Tick period.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Report spacing.
    pub fn report_interval(&self) -> Duration {
        Duration::from_millis(self.report_interval_ms)
    }

    /// Discovery retry period.
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    /// Delay before the post-load rescan.
    pub fn rescan_after_load(&self) -> Duration {
        Duration::from_millis(self.rescan_after_load_ms)
    }

    /// Delay before the post-gesture rescan.
    pub fn rescan_after_gesture(&self) -> Duration {
        Duration::from_millis(self.rescan_after_gesture_ms)
    }

    /// Observer install re-check period.
    pub fn observer_install_retry(&self) -> Duration {
        Duration::from_millis(self.observer_install_retry_ms)
    }

    /// `getConfig` reply timeout.
    pub fn config_timeout(&self) -> Duration {
        Duration::from_millis(self.config_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        Tuning::default().validate().unwrap();
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let tuning = Tuning::from_toml("history_capacity = 20\nema_alpha = 0.5").unwrap();
        assert_eq!(tuning.history_capacity, 20);
        assert_eq!(tuning.ema_alpha, 0.5);
        assert_eq!(tuning.tick_interval_ms, 33);
        assert_eq!(tuning.retry_max_attempts, 10);
    }

    #[test]
    fn zero_interval_rejected() {
        let err = Tuning::from_toml("tick_interval_ms = 0").unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidTuning { field: "tick_interval_ms", .. }),
            "got {err}"
        );
    }

    #[test]
    fn alpha_out_of_range_rejected() {
        assert!(Tuning::from_toml("ema_alpha = 0.0").is_err());
        assert!(Tuning::from_toml("ema_alpha = 1.5").is_err());
        assert!(Tuning::from_toml("ema_alpha = 1.0").is_ok());
    }

    #[test]
    fn zero_capacity_rejected() {
        assert!(Tuning::from_toml("history_capacity = 0").is_err());
    }

    #[test]
    fn roundtrip_through_toml() {
        let tuning = Tuning {
            retry_max_attempts: 3,
            ..Tuning::default()
        };
        let text = tuning.to_toml().unwrap();
        assert_eq!(Tuning::from_toml(&text).unwrap(), tuning);
    }

    #[test]
    fn duration_helpers() {
        let tuning = Tuning::default();
        assert_eq!(tuning.tick_interval(), Duration::from_millis(33));
        assert_eq!(tuning.retry_interval(), Duration::from_secs(1));
    }
}
