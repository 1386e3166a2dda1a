//! fogbugz - command-line client for the FogBugz XML API.

use std::process::ExitCode;

use clap::Parser;

use fogbugz_client::cli::{self, Cli};
use fogbugz_client::logging;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init() {
        eprintln!("Warning: file logging disabled: {}", e);
    }

    match cli::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if e.is_critical() {
                tracing::warn!(error = %e, "Command needs setup");
            } else {
                tracing::error!(error = %e, "Command failed");
            }
            eprintln!("Error: {}", e.user_message());
            if let Some(action) = e.suggested_action() {
                eprintln!("{}", action);
            }
            ExitCode::from(e.exit_code())
        }
    }
}
