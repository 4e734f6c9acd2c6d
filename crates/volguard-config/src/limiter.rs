//! Per-tab limiter configuration.

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Lowest ceiling the status surface offers, in dBFS.
pub const LIMIT_MIN_DB: f32 = -60.0;

/// Highest ceiling, in dBFS.
pub const LIMIT_MAX_DB: f32 = 0.0;

/// Limiter settings for one tab.
///
/// Serialized with the same field names the message protocol uses, so the
/// stored entry and the `getConfig` reply look identical.
///
/// ```toml
/// enabled = true
/// limitDB = -18.0
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LimiterConfig {
    /// Whether limiting is active.
    #[serde(default)]
    pub enabled: bool,

    /// Ceiling in dBFS.
    #[serde(rename = "limitDB", alias = "limit_db", default = "default_limit_db")]
    pub limit_db: f32,
}

fn default_limit_db() -> f32 {
    -20.0
}

impl LimiterConfig {
    /// Create a config without validation.
    pub fn new(enabled: bool, limit_db: f32) -> Self {
        Self { enabled, limit_db }
    }

    /// Check the ceiling and clamp it into [`LIMIT_MIN_DB`]..=[`LIMIT_MAX_DB`].
    ///
    /// Non-finite ceilings are rejected outright.
    pub fn validated(self) -> Result<Self, ConfigError> {
        if !self.limit_db.is_finite() {
            return Err(ConfigError::InvalidLimit(self.limit_db));
        }
        Ok(Self {
            enabled: self.enabled,
            limit_db: self.limit_db.clamp(LIMIT_MIN_DB, LIMIT_MAX_DB),
        })
    }

    /// Apply a partial update in place.
    pub fn apply(&mut self, patch: ConfigPatch) {
        patch.apply_to(self);
    }
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            limit_db: default_limit_db(),
        }
    }
}

/// A partial config update.
///
/// Fields that are `None` leave the previous value in place. A ceiling that is
/// present but not a finite number is treated as absent, so a malformed update
/// never overwrites a good value.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ConfigPatch {
    /// New enablement, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// New ceiling in dBFS, if any.
    #[serde(
        rename = "limitDB",
        alias = "limit_db",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub limit_db: Option<f32>,
}

impl ConfigPatch {
    /// Patch that changes nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether applying this patch would change nothing.
    pub fn is_empty(&self) -> bool {
        self.enabled.is_none() && self.limit_db.is_none()
    }

    /// Set enablement.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// Set the ceiling.
    pub fn with_limit_db(mut self, limit_db: f32) -> Self {
        self.limit_db = Some(limit_db);
        self
    }

    /// Write the present, well-formed fields into `config`.
    pub fn apply_to(&self, config: &mut LimiterConfig) {
        if let Some(enabled) = self.enabled {
            config.enabled = enabled;
        }
        if let Some(limit_db) = self.limit_db
            && limit_db.is_finite()
        {
            config.limit_db = limit_db.clamp(LIMIT_MIN_DB, LIMIT_MAX_DB);
        }
    }
}

impl From<LimiterConfig> for ConfigPatch {
    fn from(config: LimiterConfig) -> Self {
        Self {
            enabled: Some(config.enabled),
            limit_db: Some(config.limit_db),
        }
    }
}
