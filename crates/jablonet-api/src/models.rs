// Wire types
//
// The web frontend is PHP-backed: numbers arrive as JSON numbers or
// numeric strings, and an empty map is serialized as `[]`. Fields use
// `#[serde(default)]` and lenient deserializers liberally.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

// ── Status (stav.php) ────────────────────────────────────────────────

/// Body of a successful status fetch, envelope `status` already checked.
///
/// Each category (`teplomery`, `pgm`, `sekce`, `pir`, ...) is a map of
/// point id to [`RawPoint`]. Categories are kept generic because the set
/// depends on the panel configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusPayload {
    /// `stateName` → 1 if the account may control that point.
    #[serde(default, deserialize_with = "map_or_empty_array")]
    pub permissions: BTreeMap<String, Value>,

    /// Every other top-level key, including the categories.
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl StatusPayload {
    /// Iterate over the top-level keys that look like point categories:
    /// an object whose values are all objects, or an empty `[]`.
    pub fn categories(&self) -> impl Iterator<Item = (&str, BTreeMap<String, RawPoint>)> + '_ {
        self.rest.iter().filter_map(|(key, value)| {
            if key == "status" {
                return None;
            }
            match value {
                Value::Object(points) if points.values().all(Value::is_object) => {
                    let parsed = points
                        .iter()
                        .filter_map(|(id, raw)| {
                            match serde_json::from_value::<RawPoint>(raw.clone()) {
                                Ok(point) => Some((id.clone(), point)),
                                Err(err) => {
                                    warn!(
                                        category = %key,
                                        point = %id,
                                        error = %err,
                                        "skipping undecodable point"
                                    );
                                    None
                                }
                            }
                        })
                        .collect();
                    Some((key.as_str(), parsed))
                }
                Value::Array(items) if items.is_empty() => Some((key.as_str(), BTreeMap::new())),
                _ => None,
            }
        })
    }
}

/// One monitored or controllable point, as the server reports it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPoint {
    /// Display name.
    #[serde(default)]
    pub nazev: Option<String>,
    /// Protocol-level name used by control calls and permissions (`PGM_1`).
    #[serde(default, rename = "stateName")]
    pub state_name: Option<String>,
    /// Numeric reading (thermometers).
    #[serde(default, deserialize_with = "lenient_f64_opt")]
    pub value: Option<f64>,
    /// Discrete state (outputs, sections, detectors).
    #[serde(default, deserialize_with = "lenient_i64_opt")]
    pub stav: Option<i64>,
    /// Output reaction type, e.g. `pgorSwitchOnOff`.
    #[serde(default)]
    pub reaction: Option<String>,
    /// Last change, epoch seconds.
    #[serde(default, deserialize_with = "lenient_i64_opt")]
    pub ts: Option<i64>,
    /// Last change as preformatted text.
    #[serde(default)]
    pub time: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ── Control (ovladani2.php) ──────────────────────────────────────────

/// Body of a control call, envelope `status` already checked.
#[derive(Debug, Clone, Deserialize)]
pub struct ControlResponse {
    /// 200 when the control code was accepted.
    #[serde(deserialize_with = "lenient_i64_req")]
    pub authorization: i64,
    /// 200 when the panel executed the command.
    #[serde(rename = "responseCode", deserialize_with = "lenient_i64_req")]
    pub response_code: i64,
    /// Point that was addressed.
    #[serde(default, rename = "stateName")]
    pub state_name: Option<String>,
    /// State the point is in *after* the command. Authoritative.
    #[serde(default, deserialize_with = "lenient_i64_opt")]
    pub stav: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64_opt")]
    pub ts: Option<i64>,
}

/// Outcome code meaning "accepted" for both `authorization` and `responseCode`.
pub const OUTCOME_OK: i64 = 200;

// ── Lenient helpers ──────────────────────────────────────────────────

/// Accept `1`, `1.0`, `"1"`, `true`.
pub fn lenient_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

/// Accept `21.5`, `"21.5"`, `"21,5"`.
pub fn lenient_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse().ok(),
        _ => None,
    }
}

fn lenient_i64_opt<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.as_ref().and_then(lenient_i64))
}

fn lenient_i64_req<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    let value = Value::deserialize(d)?;
    lenient_i64(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("expected integer, got {value}")))
}

fn lenient_f64_opt<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.as_ref().and_then(lenient_f64))
}

fn map_or_empty_array<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<BTreeMap<String, Value>, D::Error> {
    match Value::deserialize(d)? {
        Value::Object(map) => Ok(map.into_iter().collect()),
        _ => Ok(BTreeMap::new()),
    }
}
