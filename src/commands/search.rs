//! Search command
//!
//! Query stored log entries with the same filter fields as `GET /api/logs`.

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Parser;
use colored::Colorize;
use log_hub::config::Config;
use log_hub::logstore::{LogEntry, LogFilter, LogLevel, SearchPage, SortOrder, ValidationError};

/// Search log entries
#[derive(Debug, Clone, Parser)]
pub struct SearchArgs {
    /// Filter by log level (ERROR, WARN, INFO, DEBUG, TRACE)
    #[arg(short, long)]
    pub level: Option<String>,

    /// Filter by service name
    #[arg(short, long)]
    pub service: Option<String>,

    /// Free-text query against the message
    #[arg(short, long)]
    pub query: Option<String>,

    /// Filter by trace ID
    #[arg(long)]
    pub trace_id: Option<String>,

    /// Filter by user ID
    #[arg(long)]
    pub user_id: Option<String>,

    /// Inclusive lower bound (RFC 3339)
    #[arg(long)]
    pub from: Option<DateTime<Utc>>,

    /// Inclusive upper bound (RFC 3339)
    #[arg(long)]
    pub to: Option<DateTime<Utc>>,

    /// Required tag (repeatable; all must match)
    #[arg(short, long = "tag")]
    pub tags: Vec<String>,

    /// Sort order (timestamp.asc, timestamp.desc)
    #[arg(long, default_value = "timestamp.desc")]
    pub sort: String,

    /// Page size (clamped to 500)
    #[arg(long)]
    pub limit: Option<u32>,

    /// Page number, starting at 1
    #[arg(long)]
    pub page: Option<u32>,

    /// Output format (text, json)
    #[arg(short = 'f', long, default_value = "text")]
    pub format: String,
}

impl SearchArgs {
    pub fn to_filter(&self) -> Result<LogFilter, ValidationError> {
        let filter = LogFilter {
            level: self.level.as_deref().map(str::parse::<LogLevel>).transpose()?,
            service: self.service.clone(),
            q: self.query.clone(),
            trace_id: self.trace_id.clone(),
            user_id: self.user_id.clone(),
            from: self.from,
            to: self.to,
            tags: self.tags.clone(),
            sort: self.sort.parse::<SortOrder>()?,
            limit: self.limit,
            page: self.page,
        };
        filter.validate()?;

        Ok(filter)
    }
}

/// Execute the search command
pub async fn execute(cfg: &Config, args: SearchArgs) -> Result<()> {
    let filter = args.to_filter()?;
    let hub = super::open_hub(cfg).await?;

    let page = hub.search(&filter).await?;

    match args.format.as_str() {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&page)?);
        }
        _ => display_page_text(&page),
    }

    Ok(())
}

/// Display a result page in human-friendly text format
fn display_page_text(page: &SearchPage) {
    if page.items.is_empty() {
        println!("{}", "No logs found matching the criteria".yellow());
        return;
    }

    println!(
        "{}",
        format!(
            "Page {}/{} ({} matching entries)",
            page.page, page.total_pages, page.total
        )
        .bold()
    );
    println!();

    for entry in &page.items {
        println!("{}", format_entry(entry));

        if let Some(tags) = &entry.tags {
            println!("  {}", format!("tags: {}", tags.join(", ")).dimmed());
        }
        if let Some(stack) = &entry.stack_trace {
            for line in stack.lines() {
                println!("  {}", line.dimmed());
            }
        }
    }
}

fn format_entry(entry: &LogEntry) -> String {
    let timestamp = entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f").to_string();

    let level = entry.level.as_str();
    let level_colored = match entry.level {
        LogLevel::Error => level.red().bold(),
        LogLevel::Warn => level.yellow().bold(),
        LogLevel::Info => level.green(),
        LogLevel::Debug => level.blue(),
        LogLevel::Trace => level.normal(),
    };

    // Shortened trace ID
    let trace = entry
        .trace_id
        .as_ref()
        .map(|id| format!(" trace={}", id.chars().take(8).collect::<String>()))
        .unwrap_or_default();

    format!(
        "{} {} {}{} {}",
        timestamp.dimmed(),
        level_colored,
        entry.service_name.cyan(),
        trace.dimmed(),
        entry.message
    )
}
