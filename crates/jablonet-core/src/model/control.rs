use serde::Serialize;

use super::point::PointState;

/// Outcome of a successful control command.
///
/// `state` is what the server reported after executing the command. It
/// can differ from what was requested (momentary outputs fall back to
/// off straight away) and always wins over the requested value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlResult {
    pub point_id: String,
    /// Protocol-level name the command was addressed to.
    pub state_name: String,
    /// Authoritative post-command state.
    pub state: PointState,
    pub authorization: i64,
    pub response_code: i64,
}
