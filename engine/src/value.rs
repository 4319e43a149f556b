//! Field values and their portable, JSON-safe representation.
//!
//! The store exposes three provider-specific value types on top of plain
//! JSON: timestamps, geographic points and document references. Backups are
//! plain JSON files, so these are marshaled into tagged JSON shapes on export
//! and reconstructed on import. The mapping is applied recursively through
//! arrays and maps.
//!
//! Timestamps travel as bare ISO-8601 strings (`YYYY-MM-DDTHH:MM:SS(.sss)?Z`),
//! which means a plain string field that happens to match that exact shape is
//! reinterpreted as a timestamp on restore. That ambiguity is inherited from
//! the backup format and pinned by a test rather than silently "fixed".

use crate::error::Result;
use crate::path::DocumentPath;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::collections::BTreeMap;

/// Marker key identifying tagged portable objects.
pub const TYPE_KEY: &str = "_type";

const GEOPOINT_TAG: &str = "geopoint";
const REFERENCE_TAG: &str = "reference";

/// A single field value as held by the live store.
///
/// `Plain` covers the JSON scalars (null, bool, number, string); arrays and
/// maps get their own variants so provider types can nest anywhere.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Plain(serde_json::Value),
    Array(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Timestamp(DateTime<Utc>),
    GeoPoint { latitude: f64, longitude: f64 },
    Reference(DocumentPath),
}

impl Value {
    /// Convenience constructor for string fields.
    pub fn string(s: impl Into<String>) -> Self {
        Value::Plain(serde_json::Value::String(s.into()))
    }

    /// The string payload, if this is a plain string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Plain(serde_json::Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Convert into the portable JSON representation.
    pub fn to_portable(&self) -> serde_json::Value {
        match self {
            Value::Plain(v) => v.clone(),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_portable).collect())
            }
            Value::Map(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_portable()))
                    .collect(),
            ),
            Value::Timestamp(t) => {
                serde_json::Value::String(t.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
            }
            Value::GeoPoint {
                latitude,
                longitude,
            } => serde_json::json!({
                TYPE_KEY: GEOPOINT_TAG,
                "latitude": latitude,
                "longitude": longitude,
            }),
            Value::Reference(path) => serde_json::json!({
                TYPE_KEY: REFERENCE_TAG,
                "path": path.as_str(),
                "id": path.id(),
            }),
        }
    }

    /// Reconstruct a value from its portable JSON representation.
    ///
    /// Reference targets are re-resolved by path only; whether the target
    /// document exists is not validated.
    pub fn from_portable(portable: &serde_json::Value) -> Result<Self> {
        match portable {
            serde_json::Value::String(s) => match parse_timestamp(s) {
                Some(t) => Ok(Value::Timestamp(t)),
                None => Ok(Value::Plain(portable.clone())),
            },
            serde_json::Value::Array(items) => Ok(Value::Array(
                items
                    .iter()
                    .map(Value::from_portable)
                    .collect::<Result<_>>()?,
            )),
            serde_json::Value::Object(map) => match map.get(TYPE_KEY).and_then(|t| t.as_str()) {
                Some(GEOPOINT_TAG) => {
                    let latitude = map.get("latitude").and_then(|v| v.as_f64());
                    let longitude = map.get("longitude").and_then(|v| v.as_f64());
                    match (latitude, longitude) {
                        (Some(latitude), Some(longitude)) => Ok(Value::GeoPoint {
                            latitude,
                            longitude,
                        }),
                        // Malformed tag: keep the object as data.
                        _ => Self::from_portable_object(map),
                    }
                }
                Some(REFERENCE_TAG) => match map.get("path").and_then(|v| v.as_str()) {
                    Some(path) => Ok(Value::Reference(DocumentPath::new(path)?)),
                    None => Self::from_portable_object(map),
                },
                _ => Self::from_portable_object(map),
            },
            _ => Ok(Value::Plain(portable.clone())),
        }
    }

    fn from_portable_object(map: &serde_json::Map<String, serde_json::Value>) -> Result<Self> {
        let entries = map
            .iter()
            .map(|(k, v)| Ok((k.clone(), Value::from_portable(v)?)))
            .collect::<Result<_>>()?;
        Ok(Value::Map(entries))
    }
}

/// Marshal a whole field map into portable JSON.
pub fn to_portable_fields(fields: &BTreeMap<String, Value>) -> BTreeMap<String, serde_json::Value> {
    fields
        .iter()
        .map(|(name, value)| (name.clone(), value.to_portable()))
        .collect()
}

/// Reconstruct a field map from portable JSON.
pub fn from_portable_fields(
    data: &BTreeMap<String, serde_json::Value>,
) -> Result<BTreeMap<String, Value>> {
    data.iter()
        .map(|(name, value)| Ok((name.clone(), Value::from_portable(value)?)))
        .collect()
}

/// Parse a string that exactly matches the backup timestamp pattern.
///
/// The shape check is strict (fixed positions, zero-padded digits, trailing
/// `Z`, optional exactly-three-digit fraction) so that lenient date parsing
/// cannot widen the set of strings treated as timestamps.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if !is_timestamp_shaped(s) {
        return None;
    }
    let format = if s.len() == 20 {
        "%Y-%m-%dT%H:%M:%SZ"
    } else {
        "%Y-%m-%dT%H:%M:%S%.3fZ"
    };
    NaiveDateTime::parse_from_str(s, format)
        .ok()
        .map(|naive| naive.and_utc())
}

fn is_timestamp_shaped(s: &str) -> bool {
    let bytes = s.as_bytes();
    match bytes.len() {
        // YYYY-MM-DDTHH:MM:SSZ
        20 => shape_matches(bytes, &[(4, b'-'), (7, b'-'), (10, b'T'), (13, b':'), (16, b':'), (19, b'Z')]),
        // YYYY-MM-DDTHH:MM:SS.sssZ
        24 => shape_matches(bytes, &[(4, b'-'), (7, b'-'), (10, b'T'), (13, b':'), (16, b':'), (19, b'.'), (23, b'Z')]),
        _ => false,
    }
}

fn shape_matches(bytes: &[u8], separators: &[(usize, u8)]) -> bool {
    bytes.iter().enumerate().all(|(i, b)| {
        match separators.iter().find(|(pos, _)| *pos == i) {
            Some((_, sep)) => b == sep,
            None => b.is_ascii_digit(),
        }
    })
}
