use anyhow::Result;
use colored::Colorize;
use log_hub::config::Config;
use tracing::info;

/// Execute the config show command
///
/// Displays the effective configuration (file + environment + defaults)
pub fn show(cfg: &Config) -> Result<()> {
    println!("{}", "Current Configuration:".green().bold());
    println!();

    let toml_string = toml::to_string_pretty(cfg)?;
    println!("{}", toml_string);

    info!("Configuration displayed successfully");
    Ok(())
}

/// Execute the config validate command
///
/// Loading already ran validation; this prints a summary
pub fn validate(cfg: &Config) -> Result<()> {
    println!("{}", "✓ Configuration is valid".green());
    println!();
    println!("{}", "Summary:".bold());
    println!("  Listen: {}:{}", cfg.server.host, cfg.server.port);
    println!("  Database: {}", cfg.database.url);
    println!(
        "  Cache TTLs: search {}s, services {}s",
        cfg.cache.search_ttl_seconds, cfg.cache.service_list_ttl_seconds
    );
    println!(
        "  Retention: {} days (min {}), {}",
        cfg.retention.days,
        cfg.retention.min_days,
        if cfg.retention.enabled {
            format!("daily at {:02}:00 UTC", cfg.retention.cleanup_hour)
        } else {
            "scheduled cleanup disabled".to_string()
        }
    );

    info!("Configuration validation successful");
    Ok(())
}
