//! Programmable output (PGM) command handlers.

use serde::Serialize;
use tabled::Tabled;

use jablonet_core::{Category, ControlResult, Controller, PointState};

use crate::cli::{GlobalOpts, PgmArgs, PgmCommand, SwitchArgs};
use crate::config;
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct OutputView {
    id: String,
    name: String,
    state_name: Option<String>,
    state: Option<PointState>,
    reaction: Option<String>,
    switchable: bool,
}

#[derive(Tabled)]
struct OutputRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Reaction")]
    reaction: String,
    #[tabled(rename = "Switch")]
    switchable: String,
}

fn detail(result: &ControlResult) -> String {
    format!(
        "Output:   {} ({})\nState:    {}",
        result.point_id, result.state_name, result.state
    )
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    controller: &Controller,
    args: PgmArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        PgmCommand::List => list(controller, global).await,
        PgmCommand::On(args) => switch(controller, args, PointState::ON, global).await,
        PgmCommand::Off(args) => switch(controller, args, PointState::OFF, global).await,
    }
}

async fn list(controller: &Controller, global: &GlobalOpts) -> Result<(), CliError> {
    let snapshot = controller.fetch_snapshot().await?;
    let views: Vec<OutputView> = snapshot
        .points(&Category::ProgrammableOutputs)
        .into_iter()
        .flatten()
        .map(|(id, point)| OutputView {
            id: id.clone(),
            name: point.display_name().to_owned(),
            state_name: point.state_name.clone(),
            state: point.state,
            reaction: point.reaction.clone(),
            switchable: point.is_switchable(),
        })
        .collect();

    let color = output::should_color(&global.color);
    let out = output::render_list(
        &global.output,
        &views,
        |v| OutputRow {
            id: v.id.clone(),
            name: v.name.clone(),
            state: output::paint_state(v.state, color),
            reaction: v.reaction.clone().unwrap_or_default(),
            switchable: if v.switchable { "yes" } else { "" }.into(),
        },
        |v| v.id.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

async fn switch(
    controller: &Controller,
    args: SwitchArgs,
    target: PointState,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    // Populate the snapshot so the command is addressed by its stateName.
    let snapshot = controller.fetch_snapshot().await?;
    match snapshot.programmable_output(&args.id) {
        None => tracing::warn!(id = %args.id, "output not listed by the panel, sending anyway"),
        Some(point) if !point.is_switchable() => {
            tracing::warn!(id = %args.id, "output is not an on/off switch for this account");
        }
        Some(_) => {}
    }

    let code = config::resolve_control_code(global, args.code)?;
    let result = controller.control(&args.id, target, &code).await?;

    if result.state != target && !global.quiet {
        eprintln!(
            "Output {} reports {} after the command (momentary output?)",
            result.point_id, result.state
        );
    }

    let out = output::render_single(&global.output, &result, detail, |r| r.state.to_string());
    output::print_output(&out, global.quiet);
    Ok(())
}
