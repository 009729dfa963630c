use anyhow::{Context, Result};
use clap::Parser;

mod cli;
mod commands;

use log_hub::{config, init_tracing};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let command = args.get_command();

    // Version needs no configuration
    if matches!(command, cli::Commands::Version) {
        print_version();
        return Ok(());
    }

    let cfg = config::load_config(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config.display()))?;

    init_tracing(&cfg.server.log_level, &cfg.server.log_format);

    match command {
        cli::Commands::Serve => commands::serve::execute(cfg).await?,
        cli::Commands::Search(search) => commands::search::execute(&cfg, search).await?,
        cli::Commands::Stats { view } => commands::stats::execute(&cfg, view).await?,
        cli::Commands::Cleanup(cleanup) => commands::cleanup::execute(&cfg, cleanup).await?,
        cli::Commands::Export(export) => commands::export::execute(&cfg, export).await?,
        cli::Commands::Config { action } => match action {
            cli::ConfigCommands::Show => commands::config::show(&cfg)?,
            cli::ConfigCommands::Validate => commands::config::validate(&cfg)?,
        },
        cli::Commands::Version => print_version(),
    }

    Ok(())
}

fn print_version() {
    println!("Log Hub v{}", env!("CARGO_PKG_VERSION"));
}
