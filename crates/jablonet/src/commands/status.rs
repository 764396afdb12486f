//! Status command handler.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tabled::Tabled;

use jablonet_config::Profile;
use jablonet_core::{Category, Controller, PointRecord, PointState, Snapshot};

use crate::cli::{GlobalOpts, StatusArgs};
use crate::config;
use crate::error::CliError;
use crate::output;

// ── View model ──────────────────────────────────────────────────────

/// Flattened point, one per row, shared by `status` and `watch`.
#[derive(Debug, Serialize)]
pub struct PointView {
    pub category: String,
    pub id: String,
    pub name: String,
    pub state_name: Option<String>,
    pub value: Option<f64>,
    pub state: Option<PointState>,
    pub reaction: Option<String>,
    pub last_change: Option<DateTime<Utc>>,
    pub controllable: bool,
}

impl PointView {
    fn new(category: &Category, id: &str, point: &PointRecord, names: &Profile) -> Self {
        let name = names
            .point_name(&[category.label(), category.wire_key()], id)
            .unwrap_or_else(|| point.display_name());
        Self {
            category: category.label().to_owned(),
            id: id.to_owned(),
            name: name.to_owned(),
            state_name: point.state_name.clone(),
            value: point.value,
            state: point.state,
            reaction: point.reaction.clone(),
            last_change: point.last_change,
            controllable: point.controllable,
        }
    }
}

#[derive(Tabled)]
struct PointRow {
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Changed")]
    changed: String,
}

fn to_row(view: &PointView, color: bool) -> PointRow {
    PointRow {
        category: view.category.clone(),
        id: view.id.clone(),
        name: view.name.clone(),
        value: view.value.map(|v| format!("{v:.1}")).unwrap_or_default(),
        state: output::paint_state(view.state, color),
        changed: view
            .last_change
            .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default(),
    }
}

/// Flatten a snapshot into rows, optionally limited to one category.
/// Labels configured on the profile replace the server's names.
pub fn collect_views(snapshot: &Snapshot, filter: Option<&str>, names: &Profile) -> Vec<PointView> {
    snapshot
        .categories
        .iter()
        .filter(|(category, _)| {
            filter.is_none_or(|f| {
                f.eq_ignore_ascii_case(category.label()) || f.eq_ignore_ascii_case(category.wire_key())
            })
        })
        .flat_map(|(category, points)| {
            points
                .iter()
                .map(move |(id, point)| PointView::new(category, id, point, names))
        })
        .collect()
}

/// Render point views in the selected output format.
pub fn render_views(views: &[PointView], global: &GlobalOpts) -> String {
    let color = output::should_color(&global.color);
    output::render_list(
        &global.output,
        views,
        |v| to_row(v, color),
        |v| format!("{}/{}", v.category, v.id),
    )
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    controller: &Controller,
    args: StatusArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let names = config::active_profile(global);
    let snapshot = controller.fetch_snapshot().await?;
    let views = collect_views(&snapshot, args.category.as_deref(), &names);

    if views.is_empty() {
        if let Some(ref category) = args.category {
            return Err(CliError::Validation {
                field: "category".into(),
                reason: format!("no points in category '{category}'"),
            });
        }
    }

    output::print_output(&render_views(&views, global), global.quiet);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn snapshot() -> Snapshot {
        let thermometer = PointRecord {
            name: Some("Living room".into()),
            value: Some(21.5),
            ..PointRecord::default()
        };
        let output = PointRecord {
            state_name: Some("PGM_1".into()),
            state: Some(PointState::ON),
            ..PointRecord::default()
        };
        Snapshot {
            categories: BTreeMap::from([
                (
                    Category::Thermometers,
                    BTreeMap::from([("8".to_owned(), thermometer)]),
                ),
                (
                    Category::ProgrammableOutputs,
                    BTreeMap::from([("1".to_owned(), output)]),
                ),
            ]),
            permissions: BTreeMap::new(),
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn category_filter_accepts_label_or_wire_key() {
        let snap = snapshot();
        let names = Profile::default();
        assert_eq!(collect_views(&snap, None, &names).len(), 2);

        let by_label = collect_views(&snap, Some("outputs"), &names);
        let by_key = collect_views(&snap, Some("PGM"), &names);
        assert_eq!(by_label.len(), 1);
        assert_eq!(by_key.len(), 1);
        assert_eq!(by_key[0].name, "PGM_1");

        assert!(collect_views(&snap, Some("zony"), &names).is_empty());
    }

    #[test]
    fn configured_names_replace_server_names() {
        let snap = snapshot();
        let names = Profile {
            names: BTreeMap::from([
                ("8".to_owned(), "Upstairs".to_owned()),
                ("pgm/1".to_owned(), "Garage gate".to_owned()),
            ]),
            ..Profile::default()
        };

        let views = collect_views(&snap, None, &names);
        let name_of = |id: &str| {
            views
                .iter()
                .find(|v| v.id == id)
                .map(|v| v.name.as_str())
        };
        assert_eq!(name_of("8"), Some("Upstairs"));
        assert_eq!(name_of("1"), Some("Garage gate"));

        // Unconfigured points keep the server name.
        let plain = collect_views(&snap, Some("thermometers"), &Profile::default());
        assert_eq!(plain[0].name, "Living room");
    }
}
