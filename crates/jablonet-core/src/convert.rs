// ── Wire → domain conversion ──
//
// `StatusPayload` is lenient and stringly; the domain model is not.
// Permissions are resolved onto each point here so consumers never look
// up `stateName` themselves.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use jablonet_api::models::lenient_i64;
use jablonet_api::{RawPoint, StatusPayload};

use crate::model::{Category, PointRecord, PointState, Snapshot};

impl From<RawPoint> for PointRecord {
    fn from(raw: RawPoint) -> Self {
        Self {
            name: raw.nazev,
            state_name: raw.state_name,
            value: raw.value,
            state: raw.stav.and_then(point_state),
            reaction: raw.reaction,
            last_change: raw.ts.and_then(epoch_to_utc),
            time: raw.time,
            controllable: false,
            extra: raw.extra,
        }
    }
}

/// Build a snapshot from one status payload.
pub(crate) fn snapshot_from_payload(payload: &StatusPayload, fetched_at: DateTime<Utc>) -> Snapshot {
    let permissions: BTreeMap<String, bool> = payload
        .permissions
        .iter()
        .map(|(name, flag)| (name.clone(), lenient_i64(flag) == Some(1)))
        .collect();

    let categories = payload
        .categories()
        .map(|(key, points)| {
            let points = points
                .into_iter()
                .map(|(id, raw)| {
                    let mut record = PointRecord::from(raw);
                    record.controllable = record
                        .state_name
                        .as_ref()
                        .and_then(|name| permissions.get(name))
                        .copied()
                        .unwrap_or(false);
                    (id, record)
                })
                .collect();
            (Category::from_key(key), points)
        })
        .collect();

    Snapshot {
        categories,
        permissions,
        fetched_at,
    }
}

pub(crate) fn point_state(raw: i64) -> Option<PointState> {
    u8::try_from(raw).ok().map(PointState)
}

pub(crate) fn epoch_to_utc(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn payload_becomes_typed_snapshot() {
        let payload: StatusPayload = serde_json::from_value(json!({
            "status": 200,
            "teplomery": { "1": { "value": "21,5", "stateName": "TEPLOMER_1", "ts": 1_700_000_000 } },
            "pgm": {
                "2": { "stav": "1", "nazev": "Garage", "stateName": "PGM_2", "reaction": "pgorSwitchOnOff" },
                "3": { "stav": 0, "nazev": "Bell", "stateName": "PGM_3", "reaction": "pgorSwitchOnOff" }
            },
            "pir": [],
            "permissions": { "PGM_2": "1", "PGM_3": 0 }
        }))
        .expect("payload");

        let snap = snapshot_from_payload(&payload, Utc::now());

        let thermo = snap.point(&Category::Thermometers, "1").expect("thermometer");
        assert_eq!(thermo.value, Some(21.5));
        assert_eq!(thermo.last_change, DateTime::from_timestamp(1_700_000_000, 0));

        let garage = snap.programmable_output("2").expect("garage");
        assert_eq!(garage.state, Some(PointState::ON));
        assert!(garage.controllable);
        assert!(!snap.programmable_output("3").expect("bell").controllable);

        assert!(snap.points(&Category::MotionSensors).is_some_and(BTreeMap::is_empty));
        assert_eq!(snap.switchable_outputs().len(), 1);
    }

    #[test]
    fn negative_state_is_dropped() {
        assert_eq!(point_state(-1), None);
        assert_eq!(point_state(1), Some(PointState::ON));
    }
}
