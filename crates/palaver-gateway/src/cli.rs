//! CLI argument definitions for the `palaver` binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "palaver", about = "Chat relay engine for LLM backends", version)]
pub struct Cli {
    /// Data directory holding config.toml (default: ~/.palaver)
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,

    /// Increase log verbosity (-v: debug, -vv: trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Export spans via OpenTelemetry (stdout exporter)
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the model catalog
    Models,

    /// Chat on the console (stdin in, stdout out)
    Chat {
        /// Start the conversation on this model id
        #[arg(long)]
        model: Option<String>,

        /// Override the configured worker count
        #[arg(long)]
        workers: Option<usize>,
    },
}
