//! Command implementations for the CLI
//!
//! - serve: Start the HTTP server
//! - search: Query stored log entries
//! - stats: Aggregate views (grouped, error-rate, services, hourly, top-errors)
//! - cleanup: Retention cleanup
//! - export: CSV export
//! - config: Configuration display and validation

pub mod cleanup;
pub mod config;
pub mod export;
pub mod search;
pub mod serve;
pub mod stats;

use anyhow::{Context, Result};
use log_hub::config::Config;
use log_hub::logstore::LogHub;

/// Open the configured log store for a one-shot command
pub(crate) async fn open_hub(cfg: &Config) -> Result<LogHub> {
    LogHub::connect(cfg)
        .await
        .with_context(|| format!("Failed to open log store at {}", cfg.database.url))
}
