//! JSON wire format.
//!
//! Every frame is a flat object with a `type` tag:
//!
//! ```json
//! {"type": "updateDB", "db": -14.2}
//! {"type": "setConfig", "enabled": true, "limitDB": -18}
//! {"type": "updatePopup", "tabId": 4, "db": null, "averageDB": -20.5, "peakDB": -9.1}
//! ```
//!
//! Levels use `null` for silence. Decoding `setConfig` is lenient: a field of
//! the wrong type is dropped from the patch instead of failing the frame.

use serde_json::{Map, Value, json};
use volguard_config::{ConfigPatch, TabId};

use crate::ProtocolError;
use crate::level;
use crate::message::{AgentCommand, AgentMessage, ClientRequest, LevelStats, PushUpdate, Reply};

/// Any message that can travel on the wire.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Frame {
    /// `getConfig`
    GetConfig,
    /// `updateDB`
    UpdateDb {
        /// Reported level.
        db: f32,
    },
    /// `setConfig`
    SetConfig(ConfigPatch),
    /// `getCurrentDB`
    GetCurrentDb {
        /// Tab to query.
        tab: TabId,
    },
    /// `resetPeak`
    ResetPeak {
        /// Tab to reset.
        tab: TabId,
    },
    /// `updatePopup`
    UpdatePopup(PushUpdate),
}

impl Frame {
    /// The `type` tag for this frame.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Frame::GetConfig => "getConfig",
            Frame::UpdateDb { .. } => "updateDB",
            Frame::SetConfig(_) => "setConfig",
            Frame::GetCurrentDb { .. } => "getCurrentDB",
            Frame::ResetPeak { .. } => "resetPeak",
            Frame::UpdatePopup(_) => "updatePopup",
        }
    }
}

impl From<AgentMessage> for Frame {
    fn from(msg: AgentMessage) -> Self {
        match msg {
            AgentMessage::GetConfig => Frame::GetConfig,
            AgentMessage::UpdateDb { db } => Frame::UpdateDb { db },
        }
    }
}

impl From<AgentCommand> for Frame {
    fn from(cmd: AgentCommand) -> Self {
        match cmd {
            AgentCommand::SetConfig(patch) => Frame::SetConfig(patch),
        }
    }
}

impl From<ClientRequest> for Frame {
    fn from(req: ClientRequest) -> Self {
        match req {
            ClientRequest::GetCurrentDb { tab } => Frame::GetCurrentDb { tab },
            ClientRequest::ResetPeak { tab } => Frame::ResetPeak { tab },
        }
    }
}

impl From<PushUpdate> for Frame {
    fn from(update: PushUpdate) -> Self {
        Frame::UpdatePopup(update)
    }
}

fn level_value(db: f32) -> Value {
    if db.is_finite() {
        json!(db)
    } else {
        Value::Null
    }
}

/// Encode a frame as a JSON string.
pub fn encode(frame: &Frame) -> Result<String, ProtocolError> {
    let mut obj = Map::new();
    obj.insert("type".into(), json!(frame.type_tag()));
    match *frame {
        Frame::GetConfig => {}
        Frame::UpdateDb { db } => {
            obj.insert("db".into(), level_value(db));
        }
        Frame::SetConfig(patch) => {
            if let Some(enabled) = patch.enabled {
                obj.insert("enabled".into(), json!(enabled));
            }
            if let Some(limit) = patch.limit_db
                && limit.is_finite()
            {
                obj.insert("limitDB".into(), json!(limit));
            }
        }
        Frame::GetCurrentDb { tab } | Frame::ResetPeak { tab } => {
            obj.insert("tabId".into(), json!(tab.0));
        }
        Frame::UpdatePopup(update) => {
            obj.insert("tabId".into(), json!(update.tab.0));
            insert_stats(&mut obj, update.stats);
        }
    }
    Ok(serde_json::to_string(&Value::Object(obj))?)
}

fn insert_stats(obj: &mut Map<String, Value>, stats: LevelStats) {
    obj.insert("db".into(), level_value(stats.db));
    obj.insert("averageDB".into(), level_value(stats.average_db));
    obj.insert("peakDB".into(), level_value(stats.peak_db));
}

/// Decode a JSON frame.
pub fn decode(text: &str) -> Result<Frame, ProtocolError> {
    let value: Value = serde_json::from_str(text)?;
    let obj = value.as_object().ok_or(ProtocolError::MissingField("type"))?;
    let tag = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingField("type"))?;

    match tag {
        "getConfig" => Ok(Frame::GetConfig),
        "updateDB" => Ok(Frame::UpdateDb {
            db: level_field(obj, "db")?,
        }),
        "setConfig" => Ok(Frame::SetConfig(patch_from(obj))),
        "getCurrentDB" => Ok(Frame::GetCurrentDb {
            tab: tab_field(obj)?,
        }),
        "resetPeak" => Ok(Frame::ResetPeak {
            tab: tab_field(obj)?,
        }),
        "updatePopup" => Ok(Frame::UpdatePopup(PushUpdate {
            tab: tab_field(obj)?,
            stats: stats_from(obj)?,
        })),
        other => Err(ProtocolError::UnknownType(other.to_string())),
    }
}

/// Encode a reply the way the aggregator answers over the wire.
pub fn encode_reply(reply: &Reply) -> Result<String, ProtocolError> {
    let value = match *reply {
        Reply::Config { tab, config } => json!({
            "tabId": tab.0,
            "enabled": config.enabled,
            "limitDB": config.limit_db,
        }),
        Reply::Success => json!({ "success": true }),
        Reply::Levels(stats) => {
            let mut obj = Map::new();
            insert_stats(&mut obj, stats);
            Value::Object(obj)
        }
        Reply::Error(reason) => json!({ "error": reason }),
    };
    Ok(serde_json::to_string(&value)?)
}

/// Decode a `getCurrentDB` reply. Absent fields read as silence.
pub fn decode_levels(text: &str) -> Result<LevelStats, ProtocolError> {
    let value: Value = serde_json::from_str(text)?;
    let obj = value.as_object().ok_or(ProtocolError::MissingField("db"))?;
    stats_from(obj)
}

/// Absent or `null` is silence; any other non-number is malformed.
fn level_field(obj: &Map<String, Value>, key: &'static str) -> Result<f32, ProtocolError> {
    match obj.get(key) {
        None => Ok(f32::NEG_INFINITY),
        Some(v) => level::from_value(v).ok_or(ProtocolError::MissingField(key)),
    }
}

fn tab_field(obj: &Map<String, Value>) -> Result<TabId, ProtocolError> {
    obj.get("tabId")
        .and_then(Value::as_u64)
        .and_then(|id| u32::try_from(id).ok())
        .map(TabId)
        .ok_or(ProtocolError::MissingField("tabId"))
}

fn stats_from(obj: &Map<String, Value>) -> Result<LevelStats, ProtocolError> {
    Ok(LevelStats {
        db: level_field(obj, "db")?,
        average_db: level_field(obj, "averageDB")?,
        peak_db: level_field(obj, "peakDB")?,
    })
}

fn patch_from(obj: &Map<String, Value>) -> ConfigPatch {
    let mut patch = ConfigPatch::empty();
    if let Some(enabled) = obj.get("enabled").and_then(Value::as_bool) {
        patch = patch.with_enabled(enabled);
    }
    if let Some(limit) = obj.get("limitDB").and_then(Value::as_f64)
        && limit.is_finite()
    {
        patch = patch.with_limit_db(limit as f32);
    }
    patch
}
