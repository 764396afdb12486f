// Rendering of command results.
//
// `--output table` is for people, the rest for scripts: json and yaml
// dump the serde view, plain prints one key per line.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

use jablonet_core::PointState;

use crate::cli::{ColorMode, OutputFormat};

/// Color only when asked to, or on a terminal without `NO_COLOR`.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
    }
}

/// `on` in bold green, `off` dimmed, section ordinals in yellow.
pub fn paint_state(state: Option<PointState>, color: bool) -> String {
    let Some(state) = state else {
        return String::new();
    };
    let text = state.to_string();
    match state {
        _ if !color => text,
        PointState::ON => text.green().bold().to_string(),
        PointState::OFF => text.dimmed().to_string(),
        _ => text.yellow().to_string(),
    }
}

/// Rows through `to_row` for tables, `key` per item for plain output.
pub fn render_list<T, R>(
    format: &OutputFormat,
    items: &[T],
    to_row: impl Fn(&T) -> R,
    key: impl Fn(&T) -> String,
) -> String
where
    T: Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => Table::new(items.iter().map(to_row))
            .with(Style::rounded())
            .to_string(),
        OutputFormat::Plain => items.iter().map(key).collect::<Vec<_>>().join("\n"),
        structured => render_structured(structured, items),
    }
}

/// One item: `detail` for the table view, `key` for plain output.
pub fn render_single<T: Serialize>(
    format: &OutputFormat,
    item: &T,
    detail: impl Fn(&T) -> String,
    key: impl Fn(&T) -> String,
) -> String {
    match format {
        OutputFormat::Table => detail(item),
        OutputFormat::Plain => key(item),
        structured => render_structured(structured, item),
    }
}

fn render_structured<T: Serialize + ?Sized>(format: &OutputFormat, data: &T) -> String {
    let rendered = match format {
        OutputFormat::JsonCompact => serde_json::to_string(data).map_err(|e| e.to_string()),
        OutputFormat::Yaml => serde_yaml::to_string(data).map_err(|e| e.to_string()),
        _ => serde_json::to_string_pretty(data).map_err(|e| e.to_string()),
    };
    rendered.expect("serialization should not fail")
}

/// Write to stdout unless `--quiet` or there is nothing to say.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let _ = writeln!(io::stdout().lock(), "{output}");
}
