//! Log ingestion, query and analytics engine
//!
//! Centralizes structured logs from many services in a single relational
//! store and serves filtered searches and derived statistics over them.
//!
//! ## Architecture
//!
//! ```text
//! LogIngester ──┐
//!               ├─> LogStorage (SQLite)
//! QueryEngine ──┤        ^
//!    │          │        │
//!    └─> ResultCache <── RetentionManager (flush after delete)
//!               ^
//! StatsAggregator (service list only)
//! ```
//!
//! `LogHub` wires one instance of each component around a shared storage
//! adapter and cache.

pub mod cache;
pub mod error;
pub mod export;
pub mod filter;
pub mod ingest;
pub mod model;
pub mod query;
pub mod retention;
pub mod self_log;
pub mod stats;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_support;

pub use cache::{CacheKey, CachedResult, ResultCache};
pub use error::{LogHubError, StorageError, ValidationError};
pub use export::to_csv;
pub use filter::{FilterKey, LogFilter, Predicate, SortOrder, DEFAULT_LIMIT, MAX_LIMIT};
pub use ingest::{IngestReport, LogIngester};
pub use model::{LogEntry, LogLevel, NewLogEntry, NormalizedEntry};
pub use query::{QueryEngine, SearchPage};
pub use retention::{spawn_cleanup_task, CleanupReport, CleanupSchedule, RetentionManager};
pub use self_log::{FailureContext, SelfLogger};
pub use stats::{ErrorRate, GroupedStat, HourlyBucket, ServiceSummary, StatsAggregator, TimeRange, TopError};
pub use storage::{LogStorage, SqlValue, SqliteStorage, Statement};

use crate::config::Config;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

/// Tunables for assembling a `LogHub`
#[derive(Debug, Clone)]
pub struct HubOptions {
    pub search_ttl: Duration,
    pub service_list_ttl: Duration,
    /// Service name used for self-logged failures
    pub self_service_name: String,
}

impl Default for HubOptions {
    fn default() -> Self {
        Self {
            search_ttl: cache::DEFAULT_SEARCH_TTL,
            service_list_ttl: cache::DEFAULT_SERVICE_LIST_TTL,
            self_service_name: "log-hub".to_string(),
        }
    }
}

impl From<&Config> for HubOptions {
    fn from(config: &Config) -> Self {
        Self {
            search_ttl: Duration::from_secs(config.cache.search_ttl_seconds),
            service_list_ttl: Duration::from_secs(config.cache.service_list_ttl_seconds),
            self_service_name: config.self_log.service_name.clone(),
        }
    }
}

/// Facade over the engine components
///
/// This is the surface the HTTP and CLI layers call.
pub struct LogHub {
    cache: Arc<ResultCache>,
    ingester: Arc<LogIngester>,
    query: QueryEngine,
    stats: StatsAggregator,
    retention: Arc<RetentionManager>,
    self_logger: SelfLogger,
}

impl LogHub {
    pub fn new(storage: Arc<dyn LogStorage>, options: HubOptions) -> Self {
        let cache = Arc::new(ResultCache::new(options.search_ttl, options.service_list_ttl));
        let ingester = Arc::new(LogIngester::new(storage.clone()));

        Self {
            query: QueryEngine::new(storage.clone(), cache.clone()),
            stats: StatsAggregator::new(storage.clone(), cache.clone()),
            retention: Arc::new(RetentionManager::new(storage, cache.clone())),
            self_logger: SelfLogger::new(ingester.clone(), options.self_service_name),
            ingester,
            cache,
        }
    }

    /// Open the configured SQLite database and assemble the engine
    pub async fn connect(config: &Config) -> Result<Self, StorageError> {
        let storage = SqliteStorage::connect(
            &config.database.url,
            config.database.max_connections,
        )
        .await?;

        tracing::info!(database = %config.database.url, "Log store opened");

        Ok(Self::new(Arc::new(storage), HubOptions::from(config)))
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    pub fn retention(&self) -> &Arc<RetentionManager> {
        &self.retention
    }

    pub async fn ingest_batch(
        &self,
        entries: Vec<NewLogEntry>,
    ) -> Result<IngestReport, ValidationError> {
        self.ingester.insert_many(entries).await
    }

    pub async fn ingest_one(&self, entry: NewLogEntry) -> IngestReport {
        self.ingester.insert_one(entry).await
    }

    pub async fn search(&self, filter: &LogFilter) -> Result<SearchPage, LogHubError> {
        self.query.search(filter).await
    }

    pub async fn grouped_stats(&self, filter: &LogFilter) -> Result<Vec<GroupedStat>, LogHubError> {
        self.stats.grouped_stats(filter).await
    }

    pub async fn error_rate(
        &self,
        service: Option<&str>,
        range: TimeRange,
    ) -> Result<ErrorRate, LogHubError> {
        self.stats.error_rate(service, range).await
    }

    pub async fn service_list(&self) -> Result<Vec<ServiceSummary>, LogHubError> {
        self.stats.service_list().await
    }

    pub async fn hourly_distribution(
        &self,
        service: Option<&str>,
        hours: u32,
    ) -> Result<Vec<HourlyBucket>, LogHubError> {
        self.stats.hourly_distribution(service, hours).await
    }

    pub async fn top_errors(&self, limit: u32, hours: u32) -> Result<Vec<TopError>, LogHubError> {
        self.stats.top_errors(limit, hours).await
    }

    pub async fn cleanup(&self, days: u32) -> Result<CleanupReport, LogHubError> {
        self.retention.cleanup(days).await
    }

    pub fn to_csv(&self, entries: &[LogEntry]) -> String {
        export::to_csv(entries)
    }

    pub async fn log_failure(
        &self,
        error: &(dyn Error + Send + Sync + 'static),
        context: FailureContext,
    ) {
        self.self_logger.log_failure(error, context).await
    }
}
