use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "loghub", version, about = "Log ingestion, search and analytics hub")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Search stored log entries
    Search(crate::commands::search::SearchArgs),

    /// Show aggregate statistics
    Stats {
        #[command(subcommand)]
        view: crate::commands::stats::StatsView,
    },

    /// Delete entries older than N days
    Cleanup(crate::commands::cleanup::CleanupArgs),

    /// Export matching entries as CSV
    Export(crate::commands::export::ExportArgs),

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Display the effective configuration
    Show,

    /// Validate configuration file
    Validate,
}

impl Cli {
    /// Get the command to execute, defaulting to Serve if none provided
    pub fn get_command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Serve)
    }
}
