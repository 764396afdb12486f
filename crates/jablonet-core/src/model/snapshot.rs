// ── Domain snapshot ──
//
// Produced wholesale by each successful fetch. The only in-place change
// ever applied is a single-point patch after a control command.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::point::{Category, PointRecord, PointState};

/// Full parsed panel state as of one fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub categories: BTreeMap<Category, BTreeMap<String, PointRecord>>,
    /// `stateName` → whether the account may control it.
    pub permissions: BTreeMap<String, bool>,
    pub fetched_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn points(&self, category: &Category) -> Option<&BTreeMap<String, PointRecord>> {
        self.categories.get(category)
    }

    pub fn point(&self, category: &Category, id: &str) -> Option<&PointRecord> {
        self.categories.get(category)?.get(id)
    }

    pub fn programmable_output(&self, id: &str) -> Option<&PointRecord> {
        self.point(&Category::ProgrammableOutputs, id)
    }

    /// Programmable outputs offered as on/off switches, by id.
    pub fn switchable_outputs(&self) -> Vec<(&str, &PointRecord)> {
        self.points(&Category::ProgrammableOutputs)
            .into_iter()
            .flatten()
            .filter(|(_, point)| point.is_switchable())
            .map(|(id, point)| (id.as_str(), point))
            .collect()
    }

    pub fn point_count(&self) -> usize {
        self.categories.values().map(BTreeMap::len).sum()
    }

    /// Overwrite the state of one output. Returns `false` if it is unknown.
    pub(crate) fn patch_output(
        &mut self,
        id: &str,
        state: PointState,
        changed_at: Option<DateTime<Utc>>,
    ) -> bool {
        let Some(point) = self
            .categories
            .get_mut(&Category::ProgrammableOutputs)
            .and_then(|points| points.get_mut(id))
        else {
            return false;
        };
        point.state = Some(state);
        if changed_at.is_some() {
            point.last_change = changed_at;
        }
        true
    }
}
