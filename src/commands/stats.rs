//! Stats command
//!
//! Prints the aggregate views as tables, or as JSON with `--json`.

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use log_hub::config::Config;
use log_hub::logstore::{LogFilter, LogLevel, TimeRange};
use serde::Serialize;

#[derive(Subcommand, Debug, Clone)]
pub enum StatsView {
    /// Counts grouped by level, service and day
    Grouped {
        /// Filter by service name
        #[arg(short, long)]
        service: Option<String>,

        /// Filter by log level
        #[arg(short, long)]
        level: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Share of ERROR entries over a trailing window
    ErrorRate {
        /// Filter by service name
        #[arg(short, long)]
        service: Option<String>,

        /// Window: 1h, 6h, 24h or 7d
        #[arg(short, long, default_value = "1h")]
        range: String,
    },

    /// Services active in the last seven days
    Services {
        #[arg(long)]
        json: bool,
    },

    /// Entry counts per hour and level
    Hourly {
        /// Filter by service name
        #[arg(short, long)]
        service: Option<String>,

        /// Trailing window in hours
        #[arg(long, default_value = "24")]
        hours: u32,

        #[arg(long)]
        json: bool,
    },

    /// Most frequent error messages
    TopErrors {
        /// Maximum number of rows
        #[arg(short, long, default_value = "10")]
        limit: u32,

        /// Trailing window in hours
        #[arg(long, default_value = "24")]
        hours: u32,

        #[arg(long)]
        json: bool,
    },
}

/// Execute the stats command
pub async fn execute(cfg: &Config, view: StatsView) -> Result<()> {
    let hub = super::open_hub(cfg).await?;

    match view {
        StatsView::Grouped {
            service,
            level,
            json,
        } => {
            let filter = LogFilter {
                service,
                level: level.as_deref().map(str::parse::<LogLevel>).transpose()?,
                ..Default::default()
            };
            let rows = hub.grouped_stats(&filter).await?;
            if json {
                return print_json(&rows);
            }

            println!(
                "{:<12} {:<6} {:<24} {:>8} {:>10}",
                "Date".bold(),
                "Level".bold(),
                "Service".bold(),
                "Count".bold(),
                "Avg ms".bold()
            );
            for row in rows {
                println!(
                    "{:<12} {:<6} {:<24} {:>8} {:>10}",
                    row.date,
                    row.level.as_str(),
                    row.service_name,
                    row.count,
                    row.avg_response_time
                        .map(|ms| format!("{:.1}", ms))
                        .unwrap_or_else(|| "-".to_string())
                );
            }
        }
        StatsView::ErrorRate { service, range } => {
            let range: TimeRange = range.parse()?;
            let rate = hub.error_rate(service.as_deref(), range).await?;

            let label = service.as_deref().unwrap_or("all services");
            println!("{}", format!("Error rate ({}, last {})", label, range).bold());
            println!("  Errors: {}", rate.error_count);
            println!("  Total:  {}", rate.total_count);

            let percent = format!("{:.2}%", rate.error_rate);
            if rate.error_rate > 0.0 {
                println!("  Rate:   {}", percent.red());
            } else {
                println!("  Rate:   {}", percent.green());
            }
        }
        StatsView::Services { json } => {
            let services = hub.service_list().await?;
            if json {
                return print_json(&services);
            }

            if services.is_empty() {
                println!("{}", "No services active in the last 7 days".yellow());
                return Ok(());
            }
            println!(
                "{:<24} {:>10}  {}",
                "Service".bold(),
                "Logs".bold(),
                "Last seen".bold()
            );
            for service in services {
                println!(
                    "{:<24} {:>10}  {}",
                    service.service_name,
                    service.log_count,
                    service.last_seen.format("%Y-%m-%d %H:%M:%S")
                );
            }
        }
        StatsView::Hourly {
            service,
            hours,
            json,
        } => {
            let buckets = hub.hourly_distribution(service.as_deref(), hours).await?;
            if json {
                return print_json(&buckets);
            }

            for bucket in buckets {
                println!(
                    "{}  {:<6} {:>8}",
                    bucket.hour.dimmed(),
                    bucket.level.as_str(),
                    bucket.count
                );
            }
        }
        StatsView::TopErrors { limit, hours, json } => {
            let errors = hub.top_errors(limit, hours).await?;
            if json {
                return print_json(&errors);
            }

            if errors.is_empty() {
                println!("{}", format!("No errors in the last {} hours", hours).green());
                return Ok(());
            }
            for (rank, error) in errors.iter().enumerate() {
                println!(
                    "{:>3}. {} {} {}",
                    rank + 1,
                    format!("[{}x]", error.count).red().bold(),
                    error.service_name.cyan(),
                    error.message
                );
                println!(
                    "     {}",
                    format!(
                        "last seen {}",
                        error.last_occurrence.format("%Y-%m-%d %H:%M:%S")
                    )
                    .dimmed()
                );
            }
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
