// ── Points and categories ──

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// Reaction type of a programmable output that latches on/off.
pub const SWITCH_REACTION: &str = "pgorSwitchOnOff";

/// A group of points in the status payload.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Thermometers,
    Sections,
    ProgrammableOutputs,
    MotionSensors,
    /// Any other object-of-objects key, kept under its wire name.
    Other(String),
}

impl Category {
    /// Map a wire key (`teplomery`, `pgm`, ...) to a category.
    pub fn from_key(key: &str) -> Self {
        match key {
            "teplomery" => Self::Thermometers,
            "sekce" => Self::Sections,
            "pgm" => Self::ProgrammableOutputs,
            "pir" => Self::MotionSensors,
            other => Self::Other(other.to_owned()),
        }
    }

    /// The key as the server spells it.
    pub fn wire_key(&self) -> &str {
        match self {
            Self::Thermometers => "teplomery",
            Self::Sections => "sekce",
            Self::ProgrammableOutputs => "pgm",
            Self::MotionSensors => "pir",
            Self::Other(key) => key,
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &str {
        match self {
            Self::Thermometers => "thermometers",
            Self::Sections => "sections",
            Self::ProgrammableOutputs => "outputs",
            Self::MotionSensors => "motion",
            Self::Other(key) => key,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Discrete state of a point. `0`/`1` for two-state outputs; sections and
/// detectors may report other ordinals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct PointState(pub u8);

impl PointState {
    pub const OFF: Self = Self(0);
    pub const ON: Self = Self(1);

    pub fn is_on(self) -> bool {
        self.0 != 0
    }
}

impl From<bool> for PointState {
    fn from(on: bool) -> Self {
        if on { Self::ON } else { Self::OFF }
    }
}

impl fmt::Display for PointState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::OFF => f.write_str("off"),
            Self::ON => f.write_str("on"),
            Self(other) => write!(f, "{other}"),
        }
    }
}

/// One monitored or controllable point.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PointRecord {
    pub name: Option<String>,
    /// Protocol-level name (`PGM_1`), distinct from the point id.
    pub state_name: Option<String>,
    /// Numeric reading, e.g. a temperature.
    pub value: Option<f64>,
    pub state: Option<PointState>,
    pub reaction: Option<String>,
    pub last_change: Option<DateTime<Utc>>,
    /// Last change as the server formats it.
    pub time: Option<String>,
    /// The account may send control commands to this point.
    pub controllable: bool,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl PointRecord {
    /// Latching on/off output the account may control.
    pub fn is_switchable(&self) -> bool {
        self.controllable && self.reaction.as_deref() == Some(SWITCH_REACTION)
    }

    /// Display name, falling back to the protocol name.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.state_name.as_deref())
            .unwrap_or("-")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_keys_round_trip_through_category() {
        for key in ["teplomery", "sekce", "pgm", "pir", "zony"] {
            assert_eq!(Category::from_key(key).wire_key(), key);
        }
        assert_eq!(Category::from_key("zony"), Category::Other("zony".into()));
    }

    #[test]
    fn point_state_display() {
        assert_eq!(PointState::ON.to_string(), "on");
        assert_eq!(PointState::OFF.to_string(), "off");
        assert_eq!(PointState(3).to_string(), "3");
    }

    #[test]
    fn only_permitted_switch_outputs_are_switchable() {
        let mut point = PointRecord {
            reaction: Some(SWITCH_REACTION.into()),
            ..PointRecord::default()
        };
        assert!(!point.is_switchable());
        point.controllable = true;
        assert!(point.is_switchable());
        point.reaction = Some("pgorPulse".into());
        assert!(!point.is_switchable());
    }
}
