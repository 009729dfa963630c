//! Retention cleanup
//!
//! Deletes entries older than a horizon and then flushes the whole result
//! cache. The flush is sequenced after the delete completes, so any search
//! issued after `cleanup` returns reads fresh data.

use super::cache::ResultCache;
use super::error::{Result, ValidationError};
use super::model::window_start;
use super::storage::{LogStorage, SqlValue, Statement};
use crate::metrics;
use chrono::{Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    #[serde(rename = "deletedCount")]
    pub deleted_count: u64,
}

/// Retention executor
pub struct RetentionManager {
    storage: Arc<dyn LogStorage>,
    cache: Arc<ResultCache>,
}

impl RetentionManager {
    pub fn new(storage: Arc<dyn LogStorage>, cache: Arc<ResultCache>) -> Self {
        Self { storage, cache }
    }

    /// Delete every entry with `timestamp < now - days`
    ///
    /// Accepts any `days >= 1`; stricter policy belongs to the caller.
    /// Storage errors propagate and leave the cache untouched.
    pub async fn cleanup(&self, days: u32) -> Result<CleanupReport> {
        if days == 0 {
            return Err(ValidationError::RetentionTooShort {
                requested: days,
                min: 1,
            }
            .into());
        }

        let cutoff = window_start(days as i64 * 24)?;
        let stmt = Statement::new(
            "DELETE FROM logs WHERE timestamp < ?",
            vec![SqlValue::Int(cutoff.timestamp_millis())],
        );

        let deleted_count = self.storage.execute(&stmt).await?;
        self.cache.flush_all();

        tracing::info!(
            days = days,
            cutoff = %cutoff.to_rfc3339(),
            deleted = deleted_count,
            "Cleaned up old log entries"
        );
        metrics::record_retention_deleted(deleted_count);

        Ok(CleanupReport { deleted_count })
    }
}

/// Scheduled cleanup configuration
#[derive(Debug, Clone, Copy)]
pub struct CleanupSchedule {
    /// Entries older than this many days are deleted
    pub retention_days: u32,

    /// Hour of day (UTC, 0-23) to run cleanup
    pub cleanup_hour: u32,

    /// How often to check whether it is cleanup time
    pub check_interval: Duration,
}

impl Default for CleanupSchedule {
    fn default() -> Self {
        Self {
            retention_days: 30,
            cleanup_hour: 3,
            check_interval: Duration::from_secs(3600),
        }
    }
}

/// Spawn the background retention task
///
/// Runs at most once per day, during `cleanup_hour`.
pub fn spawn_cleanup_task(
    manager: Arc<RetentionManager>,
    schedule: CleanupSchedule,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        cleanup_loop(manager, schedule).await;
    })
}

async fn cleanup_loop(manager: Arc<RetentionManager>, schedule: CleanupSchedule) {
    let mut interval = time::interval(schedule.check_interval);
    let mut last_cleanup_day: Option<u32> = None;

    loop {
        interval.tick().await;

        let now = Utc::now();
        if !is_due(now.hour(), now.ordinal(), schedule.cleanup_hour, last_cleanup_day) {
            continue;
        }

        tracing::info!(
            cleanup_hour = schedule.cleanup_hour,
            retention_days = schedule.retention_days,
            "Starting scheduled log cleanup"
        );

        match manager.cleanup(schedule.retention_days).await {
            Ok(report) => {
                tracing::info!(
                    deleted = report.deleted_count,
                    "Scheduled log cleanup completed"
                );
                last_cleanup_day = Some(now.ordinal());
            }
            Err(e) => {
                tracing::error!(error = %e, "Scheduled log cleanup failed");
            }
        }
    }
}

fn is_due(hour: u32, day: u32, cleanup_hour: u32, last_cleanup_day: Option<u32>) -> bool {
    hour == cleanup_hour && last_cleanup_day != Some(day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logstore::error::LogHubError;
    use crate::logstore::filter::LogFilter;
    use crate::logstore::ingest::LogIngester;
    use crate::logstore::model::NewLogEntry;
    use crate::logstore::query::QueryEngine;
    use crate::logstore::storage::SqliteStorage;
    use crate::logstore::test_support::{CountingStorage, FailingStorage};
    use chrono::Duration as ChronoDuration;

    fn aged(days_ago: i64, message: &str) -> NewLogEntry {
        NewLogEntry {
            timestamp: Some(Utc::now() - ChronoDuration::days(days_ago)),
            service_name: Some("retention-test".to_string()),
            message: Some(message.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_cleanup_deletes_only_old_entries() {
        let storage = Arc::new(SqliteStorage::in_memory().await.unwrap());
        LogIngester::new(storage.clone())
            .insert_many(vec![aged(40, "old"), aged(31, "older than 30"), aged(1, "recent")])
            .await
            .unwrap();

        let manager = RetentionManager::new(storage.clone(), Arc::new(ResultCache::default()));
        let report = manager.cleanup(30).await.unwrap();
        assert_eq!(report.deleted_count, 2);

        let remaining = storage
            .select_entries(&LogFilter::default().data_statement())
            .await
            .unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].message, "recent");
    }

    #[tokio::test]
    async fn test_cleanup_flushes_cache() {
        let storage = Arc::new(CountingStorage::new(SqliteStorage::in_memory().await.unwrap()));
        LogIngester::new(storage.clone())
            .insert_many(vec![aged(40, "old"), aged(1, "recent")])
            .await
            .unwrap();

        let cache = Arc::new(ResultCache::default());
        let engine = QueryEngine::new(storage.clone(), cache.clone());
        let manager = RetentionManager::new(storage.clone(), cache.clone());
        let filter = LogFilter::default();

        let before = engine.search(&filter).await.unwrap();
        assert_eq!(before.total, 2);

        manager.cleanup(30).await.unwrap();
        assert!(cache.is_empty());

        let reads = storage.reads();
        let after = engine.search(&filter).await.unwrap();
        assert!(storage.reads() > reads);
        assert_eq!(after.total, 1);
    }

    #[tokio::test]
    async fn test_cleanup_rejects_zero_days() {
        let manager = RetentionManager::new(
            Arc::new(SqliteStorage::in_memory().await.unwrap()),
            Arc::new(ResultCache::default()),
        );
        assert!(manager.cleanup(0).await.unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn test_cleanup_rejects_out_of_range_horizon() {
        let storage = Arc::new(SqliteStorage::in_memory().await.unwrap());
        LogIngester::new(storage.clone())
            .insert_many(vec![aged(40, "old")])
            .await
            .unwrap();

        let cache = Arc::new(ResultCache::default());
        cache.set_service_list(Arc::new(vec![]));
        let manager = RetentionManager::new(storage.clone(), cache.clone());

        let err = manager.cleanup(u32::MAX).await.unwrap_err();
        assert!(matches!(
            err,
            LogHubError::Validation(ValidationError::WindowTooLarge { .. })
        ));
        assert_eq!(cache.len(), 1);

        let remaining = storage
            .select_entries(&LogFilter::default().data_statement())
            .await
            .unwrap();
        assert_eq!(remaining.len(), 1);
    }

    #[tokio::test]
    async fn test_cleanup_storage_error_keeps_cache() {
        let cache = Arc::new(ResultCache::default());
        cache.set_service_list(Arc::new(vec![]));
        let manager = RetentionManager::new(Arc::new(FailingStorage), cache.clone());

        assert!(manager.cleanup(30).await.is_err());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_is_due_once_per_day() {
        assert!(is_due(3, 100, 3, None));
        assert!(!is_due(4, 100, 3, None));
        assert!(!is_due(3, 100, 3, Some(100)));
        assert!(is_due(3, 101, 3, Some(100)));
    }

    #[test]
    fn test_schedule_default() {
        let schedule = CleanupSchedule::default();
        assert_eq!(schedule.cleanup_hour, 3);
        assert_eq!(schedule.retention_days, 30);
        assert_eq!(schedule.check_interval, Duration::from_secs(3600));
    }
}
