//! Login check.

use jablonet_core::Controller;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub async fn handle(controller: &Controller, global: &GlobalOpts) -> Result<(), CliError> {
    controller.verify_credentials().await?;
    if !global.quiet {
        eprintln!("✓ Login OK");
    }
    Ok(())
}
