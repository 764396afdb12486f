//! Command dispatch: bridges CLI args -> controller calls -> output formatting.

pub mod config_cmd;
pub mod login;
pub mod pgm;
pub mod status;
pub mod watch;

use jablonet_core::Controller;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a connection-bound command to its handler.
pub async fn dispatch(
    cmd: Command,
    controller: &Controller,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Status(args) => status::handle(controller, args, global).await,
        Command::Pgm(args) => pgm::handle(controller, args, global).await,
        Command::Login => login::handle(controller, global).await,
        Command::Watch(args) => watch::handle(controller, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
