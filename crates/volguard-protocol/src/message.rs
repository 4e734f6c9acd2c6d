//! Message types.

use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};
use volguard_config::{ConfigPatch, LimiterConfig, TabId};

/// Sent by a page agent to the aggregator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AgentMessage {
    /// Ask for this tab's stored limiter config.
    GetConfig,
    /// Instantaneous level reading in dBFS (may be `-∞`).
    UpdateDb {
        /// Level at the moment of the report.
        db: f32,
    },
}

/// Sent by the aggregator to one page agent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AgentCommand {
    /// Config changed in the store; apply the present fields.
    SetConfig(ConfigPatch),
}

/// Sent by a status client to the aggregator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClientRequest {
    /// Current/average/peak for a tab.
    GetCurrentDb {
        /// Tab to query.
        tab: TabId,
    },
    /// Reset a tab's peak to `-∞`.
    ResetPeak {
        /// Tab to reset.
        tab: TabId,
    },
}

/// Point-in-time statistics for one tab.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelStats {
    /// Most recent reported level.
    #[serde(with = "crate::level", default = "silence")]
    pub db: f32,
    /// EMA over the finite history.
    #[serde(rename = "averageDB", with = "crate::level", default = "silence")]
    pub average_db: f32,
    /// Highest finite level since the last reset.
    #[serde(rename = "peakDB", with = "crate::level", default = "silence")]
    pub peak_db: f32,
}

fn silence() -> f32 {
    f32::NEG_INFINITY
}

impl LevelStats {
    /// Stats for a tab the aggregator knows nothing about.
    pub const SILENT: Self = Self {
        db: f32::NEG_INFINITY,
        average_db: f32::NEG_INFINITY,
        peak_db: f32::NEG_INFINITY,
    };
}

impl Default for LevelStats {
    fn default() -> Self {
        Self::SILENT
    }
}

/// Pushed to every status client after an accepted report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PushUpdate {
    /// Tab the stats belong to.
    #[serde(rename = "tabId")]
    pub tab: TabId,
    /// The tab's stats after the report.
    #[serde(flatten)]
    pub stats: LevelStats,
}

/// Answer to a request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reply {
    /// Answer to `getConfig`.
    Config {
        /// Tab the agent runs in.
        tab: TabId,
        /// Stored (or default) config.
        config: LimiterConfig,
    },
    /// Generic acknowledgement.
    Success,
    /// Answer to `getCurrentDB`.
    Levels(LevelStats),
    /// The request could not be served.
    Error(&'static str),
}

/// Everything the aggregator's inbox can receive.
#[derive(Debug, Clone)]
pub enum Inbound {
    /// A page agent came up and can receive commands.
    Register {
        /// The agent's tab.
        tab: TabId,
        /// Where to deliver `setConfig`.
        commands: Sender<AgentCommand>,
    },
    /// A message from a page agent.
    Agent {
        /// Sender's tab, stamped by the link.
        tab: TabId,
        /// Payload.
        message: AgentMessage,
    },
    /// A request from a status client.
    Client(ClientRequest),
    /// A status client wants push updates.
    Subscribe(Sender<PushUpdate>),
    /// Tab lifecycle: the tab is gone.
    TabClosed(TabId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_update_json_shape() {
        let update = PushUpdate {
            tab: TabId(3),
            stats: LevelStats {
                db: -6.0,
                average_db: -8.5,
                peak_db: f32::NEG_INFINITY,
            },
        };
        let value = serde_json::to_value(update).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"tabId": 3, "db": -6.0, "averageDB": -8.5, "peakDB": null})
        );
    }

    #[test]
    fn level_stats_missing_fields_are_silence() {
        let stats: LevelStats = serde_json::from_str(r#"{"db": -1.0}"#).unwrap();
        assert_eq!(stats.db, -1.0);
        assert_eq!(stats.average_db, f32::NEG_INFINITY);
        assert_eq!(stats.peak_db, f32::NEG_INFINITY);
    }

    #[test]
    fn default_stats_are_silent() {
        assert_eq!(LevelStats::default(), LevelStats::SILENT);
    }
}
