//! Export command
//!
//! Writes one page of search results as CSV to a file or stdout.

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use log_hub::config::Config;
use std::path::PathBuf;

use super::search::SearchArgs;

#[derive(Debug, Clone, Parser)]
pub struct ExportArgs {
    #[command(flatten)]
    pub search: SearchArgs,

    /// Output file (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Execute the export command
pub async fn execute(cfg: &Config, args: ExportArgs) -> Result<()> {
    let filter = args.search.to_filter()?;
    let hub = super::open_hub(cfg).await?;

    let page = hub.search(&filter).await?;
    let csv = hub.to_csv(&page.items);

    match args.output {
        Some(path) => {
            std::fs::write(&path, &csv)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!(
                "{}",
                format!(
                    "✓ Exported {} of {} entries to {}",
                    page.items.len(),
                    page.total,
                    path.display()
                )
                .green()
            );
        }
        None => println!("{}", csv),
    }

    Ok(())
}
