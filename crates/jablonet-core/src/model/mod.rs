// ── Domain model ──
//
// What consumers see after a fetch: categories of points, each point a
// small record, plus the results of control commands.

pub mod control;
pub mod point;
pub mod snapshot;

pub use control::ControlResult;
pub use point::{Category, PointRecord, PointState, SWITCH_REACTION};
pub use snapshot::Snapshot;
