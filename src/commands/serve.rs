use anyhow::Result;
use colored::Colorize;
use log_hub::{config::Config, server};
use tracing::info;

/// Execute the serve command (blocks until shutdown)
pub async fn execute(cfg: Config) -> Result<()> {
    println!(
        "{}",
        format!(
            "Starting log hub on {}:{}...",
            cfg.server.host, cfg.server.port
        )
        .green()
    );
    info!(database = %cfg.database.url, "Starting log hub");

    server::start_server(cfg).await
}
