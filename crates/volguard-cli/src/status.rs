//! Status-line presentation of per-tab levels.

use std::fmt;

use volguard_config::{LIMIT_MAX_DB, LIMIT_MIN_DB, TabId};
use volguard_protocol::LevelStats;

/// Above this level the meter shows danger regardless of the ceiling.
pub const DANGER_DB: f32 = -10.0;

const BAR_WIDTH: usize = 20;

/// Meter colour band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    /// At or under the ceiling.
    Normal,
    /// Over the configured ceiling.
    Over,
    /// Over [`DANGER_DB`].
    Danger,
}

impl Zone {
    /// Classify `db` against the configured ceiling.
    pub fn classify(db: f32, limit_db: f32) -> Self {
        if db > DANGER_DB {
            Zone::Danger
        } else if db > limit_db {
            Zone::Over
        } else {
            Zone::Normal
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Zone::Normal => "ok",
            Zone::Over => "OVER",
            Zone::Danger => "DANGER",
        })
    }
}

/// Meter fill, 0–100, from `db` clamped to the slider range.
pub fn meter_fill(db: f32) -> u8 {
    if !db.is_finite() {
        return if db > 0.0 { 100 } else { 0 };
    }
    let clamped = db.clamp(LIMIT_MIN_DB, LIMIT_MAX_DB);
    let span = LIMIT_MAX_DB - LIMIT_MIN_DB;
    ((clamped - LIMIT_MIN_DB) / span * 100.0).round() as u8
}

/// `-12.3 dBFS`, or `-∞ dBFS` for silence.
pub fn format_db(db: f32) -> String {
    if db.is_finite() {
        format!("{db:.1} dBFS")
    } else if db > 0.0 {
        "+∞ dBFS".to_string()
    } else {
        "-∞ dBFS".to_string()
    }
}

/// One rendered tab.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusLine {
    /// Tab shown.
    pub tab: TabId,
    /// Its stats.
    pub stats: LevelStats,
    /// Configured ceiling, for the zone.
    pub limit_db: f32,
}

impl StatusLine {
    /// Fill percentage for the current level.
    pub fn fill(&self) -> u8 {
        meter_fill(self.stats.db)
    }

    /// Zone for the current level.
    pub fn zone(&self) -> Zone {
        Zone::classify(self.stats.db, self.limit_db)
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let filled = usize::from(self.fill()) * BAR_WIDTH / 100;
        write!(
            f,
            "tab {:<4} [{}{}] {:>11}  avg {:>11}  peak {:>11}  {}",
            self.tab.to_string(),
            "#".repeat(filled),
            "-".repeat(BAR_WIDTH - filled),
            format_db(self.stats.db),
            format_db(self.stats.average_db),
            format_db(self.stats.peak_db),
            self.zone()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_maps_slider_range() {
        assert_eq!(meter_fill(-60.0), 0);
        assert_eq!(meter_fill(-30.0), 50);
        assert_eq!(meter_fill(0.0), 100);
        assert_eq!(meter_fill(-80.0), 0);
        assert_eq!(meter_fill(6.0), 100);
        assert_eq!(meter_fill(f32::NEG_INFINITY), 0);
    }

    #[test]
    fn zones() {
        assert_eq!(Zone::classify(-5.0, -20.0), Zone::Danger);
        assert_eq!(Zone::classify(-15.0, -20.0), Zone::Over);
        assert_eq!(Zone::classify(-25.0, -20.0), Zone::Normal);
        assert_eq!(Zone::classify(f32::NEG_INFINITY, -20.0), Zone::Normal);
        // danger wins even under a permissive ceiling
        assert_eq!(Zone::classify(-5.0, 0.0), Zone::Danger);
    }

    #[test]
    fn db_formatting() {
        assert_eq!(format_db(-12.34), "-12.3 dBFS");
        assert_eq!(format_db(-17.06), "-17.1 dBFS");
        assert_eq!(format_db(f32::NEG_INFINITY), "-∞ dBFS");
    }

    #[test]
    fn line_renders_bar_and_zone() {
        let line = StatusLine {
            tab: TabId(2),
            stats: LevelStats {
                db: -30.0,
                average_db: -31.25,
                peak_db: f32::NEG_INFINITY,
            },
            limit_db: -20.0,
        };
        let text = line.to_string();
        assert!(text.starts_with("tab 2    [##########----------]"));
        assert!(text.contains("-30.0 dBFS"));
        assert!(text.contains("peak     -∞ dBFS"));
        assert!(text.ends_with("ok"));
    }
}
