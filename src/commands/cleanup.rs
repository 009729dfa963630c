//! Cleanup command
//!
//! Runs retention immediately, subject to `retention.min_days`.

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use log_hub::config::Config;
use log_hub::logstore::ValidationError;
use tracing::info;

#[derive(Debug, Clone, Parser)]
pub struct CleanupArgs {
    /// Delete entries older than this many days (default: retention.days)
    #[arg(short, long)]
    pub days: Option<u32>,
}

/// Resolve the requested window against the configured policy
pub fn resolve_days(cfg: &Config, requested: Option<u32>) -> Result<u32, ValidationError> {
    let days = requested.unwrap_or(cfg.retention.days);
    if days < cfg.retention.min_days {
        return Err(ValidationError::RetentionTooShort {
            requested: days,
            min: cfg.retention.min_days,
        });
    }
    Ok(days)
}

/// Execute the cleanup command
pub async fn execute(cfg: &Config, args: CleanupArgs) -> Result<()> {
    let days = resolve_days(cfg, args.days)?;
    let hub = super::open_hub(cfg).await?;

    println!(
        "{}",
        format!("Deleting log entries older than {} days...", days).yellow()
    );

    let report = hub.cleanup(days).await?;

    info!(days = days, deleted = report.deleted_count, "Manual cleanup completed");
    println!(
        "{}",
        format!("✓ Deleted {} log entries", report.deleted_count).green()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_days_defaults_to_configured_retention() {
        let cfg = Config::default();
        assert_eq!(resolve_days(&cfg, None).unwrap(), 30);
        assert_eq!(resolve_days(&cfg, Some(7)).unwrap(), 7);
    }

    #[test]
    fn test_resolve_days_enforces_minimum() {
        let cfg = Config::default();
        assert_eq!(
            resolve_days(&cfg, Some(3)),
            Err(ValidationError::RetentionTooShort {
                requested: 3,
                min: 7
            })
        );
    }
}
