//! Serde helpers for dBFS levels.
//!
//! JSON has no infinity, and silence is `-∞`. Non-finite levels are written as
//! `null` and `null` (or an absent field) reads back as `-∞`.

use serde::{Deserialize, Deserializer, Serializer};

/// Serialize a level, mapping non-finite values to `null`.
pub fn serialize<S: Serializer>(db: &f32, serializer: S) -> Result<S::Ok, S::Error> {
    if db.is_finite() {
        serializer.serialize_f32(*db)
    } else {
        serializer.serialize_none()
    }
}

/// Deserialize a level, mapping `null` to negative infinity.
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f32, D::Error> {
    Ok(Option::<f32>::deserialize(deserializer)?.unwrap_or(f32::NEG_INFINITY))
}

/// Read a level out of an untyped JSON value.
///
/// Numbers pass through, `null` is silence, anything else is malformed.
pub fn from_value(value: &serde_json::Value) -> Option<f32> {
    match value {
        serde_json::Value::Null => Some(f32::NEG_INFINITY),
        serde_json::Value::Number(n) => n.as_f64().map(|v| v as f32),
        _ => None,
    }
}
