//! relaybot entry point.
//!
//! Binary name: `relaybot`
//!
//! Parses CLI arguments, initializes logging, then dispatches to the selected
//! command.

mod cli;
mod poller;
mod state;

use anyhow::anyhow;
use clap::Parser;
use relaybot_infra::config::resolve_data_dir;
use relaybot_observe::tracing_setup::{
    LogFormat, TracingOptions, filter_for_verbosity, init_tracing, shutdown_tracing,
};

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity
    let format = if cli.log_json { LogFormat::Json } else { LogFormat::Text };
    let options = TracingOptions::new(filter_for_verbosity(cli.verbose, cli.quiet))
        .format(format)
        .otel(cli.otel);
    init_tracing(&options).map_err(|e| anyhow!("failed to initialize tracing: {e}"))?;

    let result = dispatch(cli).await;
    shutdown_tracing();
    result
}

async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        // Printing the config needs neither the database nor secrets
        Commands::Config => {
            let data_dir = cli.data_dir.unwrap_or_else(resolve_data_dir);
            cli::config::show_config(&data_dir, cli.json).await
        }
        Commands::Run => {
            let state = AppState::init(cli.data_dir).await?;
            cli::run::run(state).await
        }
        Commands::Purge { older_than_hours } => {
            let state = AppState::init(cli.data_dir).await?;
            cli::purge::purge(&state, older_than_hours, cli.json).await
        }
    }
}
