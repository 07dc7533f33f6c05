//! CLI command definitions and dispatch for the `relaybot` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod config;
pub mod purge;
pub mod run;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Telegram chat bot backed by Gemini.
#[derive(Parser)]
#[command(name = "relaybot", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all log output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit log lines as JSON.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    /// Data directory holding config.toml and relaybot.db.
    #[arg(long, global = true, env = "RELAYBOT_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Connect to Telegram and answer messages until Ctrl+C.
    Run,

    /// Delete stored chat history older than the given age.
    Purge {
        /// Age threshold in hours.
        #[arg(long)]
        older_than_hours: u32,
    },

    /// Print the effective configuration.
    Config,
}
