use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    config::Config,
    handlers::{self, logs_api::LogsState},
    logstore::{cache::spawn_purge_task, spawn_cleanup_task, CleanupSchedule, LogHub},
    metrics,
};

/// Start the log hub server
///
/// This function:
/// 1. Initializes metrics
/// 2. Opens the log store and runs migrations
/// 3. Spawns cache purging and scheduled retention
/// 4. Serves requests until Ctrl+C / SIGTERM
pub async fn start_server(config: Config) -> Result<()> {
    let metrics_handle = if config.metrics.enabled {
        info!("Initializing Prometheus metrics...");
        Some(Arc::new(metrics::init_metrics()?))
    } else {
        None
    };

    let hub = Arc::new(
        LogHub::connect(&config)
            .await
            .context("Failed to open log store")?,
    );

    let purge_task = spawn_purge_task(
        hub.cache().clone(),
        Duration::from_secs(config.cache.purge_interval_seconds),
    );

    let cleanup_task = if config.retention.enabled {
        info!(
            retention_days = config.retention.days,
            cleanup_hour = config.retention.cleanup_hour,
            "Scheduled log cleanup enabled"
        );
        Some(spawn_cleanup_task(
            hub.retention().clone(),
            cleanup_schedule(&config),
        ))
    } else {
        None
    };

    let state = LogsState {
        hub,
        min_retention_days: config.retention.min_days,
        default_retention_days: config.retention.days,
    };
    let app = create_router(&config, state, metrics_handle);

    let addr = SocketAddr::from((
        config
            .server
            .host
            .parse::<std::net::IpAddr>()
            .with_context(|| format!("Invalid server.host: {}", config.server.host))?,
        config.server.port,
    ));

    info!("Starting log hub on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    purge_task.abort();
    if let Some(task) = cleanup_task {
        task.abort();
    }

    info!("Server stopped gracefully");
    Ok(())
}

/// Create the Axum router with all routes and middleware
pub fn create_router(
    config: &Config,
    state: LogsState,
    metrics_handle: Option<Arc<PrometheusHandle>>,
) -> Router {
    let api_routes = Router::new()
        .route(
            "/api/logs",
            post(handlers::logs_api::ingest_one).get(handlers::logs_api::search),
        )
        .route("/api/logs/batch", post(handlers::logs_api::ingest_batch))
        .route("/api/logs/export", get(handlers::logs_api::export_csv))
        .route("/api/logs/stats", get(handlers::logs_api::grouped_stats))
        .route(
            "/api/logs/stats/error-rate",
            get(handlers::logs_api::error_rate),
        )
        .route(
            "/api/logs/stats/hourly",
            get(handlers::logs_api::hourly_distribution),
        )
        .route(
            "/api/logs/stats/top-errors",
            get(handlers::logs_api::top_errors),
        )
        .route("/api/logs/services", get(handlers::logs_api::services))
        .route("/api/logs/cleanup", delete(handlers::logs_api::cleanup))
        .route("/health", get(handlers::logs_api::health))
        .with_state(state);

    let router = match metrics_handle {
        Some(handle) => api_routes.merge(
            Router::new()
                .route(
                    &config.metrics.endpoint,
                    get(handlers::metrics_handler::metrics),
                )
                .with_state(handle),
        ),
        None => api_routes,
    };

    router
        .layer(DefaultBodyLimit::max(config.server.body_limit_bytes))
        .layer(TraceLayer::new_for_http())
}

fn cleanup_schedule(config: &Config) -> CleanupSchedule {
    CleanupSchedule {
        retention_days: config.retention.days,
        cleanup_hour: config.retention.cleanup_hour,
        ..Default::default()
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections...");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logstore::{HubOptions, SqliteStorage};

    #[test]
    fn test_cleanup_schedule_from_config() {
        let mut config = Config::default();
        config.retention.days = 14;
        config.retention.cleanup_hour = 5;

        let schedule = cleanup_schedule(&config);
        assert_eq!(schedule.retention_days, 14);
        assert_eq!(schedule.cleanup_hour, 5);
        assert_eq!(schedule.check_interval, Duration::from_secs(3600));
    }

    #[tokio::test]
    async fn test_create_router() {
        let config = Config::default();
        let storage = Arc::new(SqliteStorage::in_memory().await.unwrap());
        let state = LogsState {
            hub: Arc::new(LogHub::new(storage, HubOptions::default())),
            min_retention_days: 7,
            default_retention_days: 30,
        };

        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let metrics_handle = Arc::new(recorder.handle());

        let _app = create_router(&config, state, Some(metrics_handle));
        // Router created successfully - no panic
    }
}
