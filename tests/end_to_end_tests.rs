//! End-to-end tests driving `LogHub` against an in-memory SQLite store

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use log_hub::logstore::storage::Row;
use log_hub::logstore::{
    HubOptions, LogEntry, LogFilter, LogHub, LogLevel, LogStorage, NewLogEntry, NormalizedEntry,
    SqliteStorage, Statement, StorageError, TimeRange,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Counts entry reads against a real store
struct CountingStorage {
    inner: SqliteStorage,
    entry_reads: AtomicUsize,
}

impl CountingStorage {
    async fn new() -> Self {
        Self {
            inner: SqliteStorage::in_memory().await.unwrap(),
            entry_reads: AtomicUsize::new(0),
        }
    }

    fn entry_reads(&self) -> usize {
        self.entry_reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LogStorage for CountingStorage {
    async fn insert_batch(&self, entries: &[NormalizedEntry]) -> Result<u64, StorageError> {
        self.inner.insert_batch(entries).await
    }

    async fn select_entries(&self, stmt: &Statement) -> Result<Vec<LogEntry>, StorageError> {
        self.entry_reads.fetch_add(1, Ordering::SeqCst);
        self.inner.select_entries(stmt).await
    }

    async fn select_rows(&self, stmt: &Statement) -> Result<Vec<Row>, StorageError> {
        self.inner.select_rows(stmt).await
    }

    async fn execute(&self, stmt: &Statement) -> Result<u64, StorageError> {
        self.inner.execute(stmt).await
    }
}

fn entry(service: &str, level: &str, message: &str, minutes_ago: i64) -> NewLogEntry {
    NewLogEntry {
        timestamp: Some(Utc::now() - ChronoDuration::minutes(minutes_ago)),
        level: Some(level.to_string()),
        service_name: Some(service.to_string()),
        message: Some(message.to_string()),
        ..Default::default()
    }
}

async fn hub_with(storage: Arc<CountingStorage>, options: HubOptions) -> LogHub {
    LogHub::new(storage, options)
}

#[tokio::test]
async fn test_auth_service_scenario() {
    let storage = Arc::new(CountingStorage::new().await);
    let hub = hub_with(storage.clone(), HubOptions::default()).await;

    let report = hub
        .ingest_batch(vec![
            entry("auth", "ERROR", "token signature invalid", 50),
            entry("auth", "INFO", "login ok", 40),
            entry("auth", "ERROR", "token signature invalid", 30),
            entry("auth", "INFO", "login ok", 20),
            entry("auth", "INFO", "logout", 10),
        ])
        .await
        .unwrap();
    assert_eq!(report.accepted, 5);
    assert_eq!(report.failed, 0);

    let filter = LogFilter {
        service: Some("auth".to_string()),
        level: Some(LogLevel::Error),
        ..Default::default()
    };
    let page = hub.search(&filter).await.unwrap();

    assert_eq!(page.total, 2);
    assert_eq!(page.total_pages, 1);
    assert_eq!(page.items.len(), 2);
    assert!(page.items.iter().all(|e| e.level == LogLevel::Error));
    // newest first
    assert!(page.items[0].timestamp > page.items[1].timestamp);

    let top = hub.top_errors(10, 24).await.unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].message, "token signature invalid");
    assert_eq!(top[0].service_name, "auth");
    assert_eq!(top[0].count, 2);
}

#[tokio::test]
async fn test_error_rate_over_last_hour() {
    let storage = Arc::new(CountingStorage::new().await);
    let hub = hub_with(storage, HubOptions::default()).await;

    let mut entries = Vec::new();
    for i in 0..3 {
        entries.push(entry("svc", "ERROR", "boom", i + 1));
    }
    for i in 0..7 {
        entries.push(entry("svc", "INFO", "fine", i + 1));
    }
    // Outside the window
    entries.push(entry("svc", "ERROR", "old", 120));
    hub.ingest_batch(entries).await.unwrap();

    let rate = hub.error_rate(Some("svc"), TimeRange::LastHour).await.unwrap();
    assert_eq!(rate.error_count, 3);
    assert_eq!(rate.total_count, 10);
    assert_eq!(rate.error_rate, 30.0);
}

#[tokio::test]
async fn test_repeated_search_is_served_from_cache() {
    let storage = Arc::new(CountingStorage::new().await);
    let hub = hub_with(storage.clone(), HubOptions::default()).await;
    hub.ingest_one(entry("billing", "WARN", "slow charge", 5)).await;

    let filter = LogFilter {
        service: Some("billing".to_string()),
        ..Default::default()
    };
    let first = hub.search(&filter).await.unwrap();
    let second = hub.search(&filter).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(storage.entry_reads(), 1);
}

#[tokio::test]
async fn test_search_cache_expires_after_ttl() {
    let storage = Arc::new(CountingStorage::new().await);
    let options = HubOptions {
        search_ttl: Duration::from_millis(50),
        ..Default::default()
    };
    let hub = hub_with(storage.clone(), options).await;
    hub.ingest_one(entry("billing", "INFO", "charged", 5)).await;

    let filter = LogFilter::default();
    hub.search(&filter).await.unwrap();
    tokio::time::sleep(Duration::from_millis(120)).await;
    hub.search(&filter).await.unwrap();

    assert_eq!(storage.entry_reads(), 2);
}

#[tokio::test]
async fn test_cleanup_flushes_cached_searches() {
    let storage = Arc::new(CountingStorage::new().await);
    let hub = hub_with(storage.clone(), HubOptions::default()).await;

    hub.ingest_batch(vec![
        entry("api", "INFO", "fresh", 5),
        entry("api", "INFO", "stale", 60 * 24 * 45),
    ])
    .await
    .unwrap();

    let filter = LogFilter::default();
    assert_eq!(hub.search(&filter).await.unwrap().total, 2);

    let report = hub.cleanup(30).await.unwrap();
    assert_eq!(report.deleted_count, 1);

    let page = hub.search(&filter).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].message, "fresh");
    assert_eq!(storage.entry_reads(), 2);
}

#[tokio::test]
async fn test_tag_filter_requires_every_tag() {
    let storage = Arc::new(CountingStorage::new().await);
    let hub = hub_with(storage, HubOptions::default()).await;

    let tagged = |message: &str, tags: &[&str]| NewLogEntry {
        message: Some(message.to_string()),
        tags: Some(tags.iter().map(|t| t.to_string()).collect()),
        ..Default::default()
    };
    hub.ingest_batch(vec![
        tagged("both", &["a", "b"]),
        tagged("only a", &["a"]),
        tagged("only b", &["b"]),
    ])
    .await
    .unwrap();

    let page = hub
        .search(&LogFilter {
            tags: vec!["a".to_string(), "b".to_string()],
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].message, "both");
}

#[tokio::test]
async fn test_ingestion_defaults_and_export() {
    let storage = Arc::new(CountingStorage::new().await);
    let hub = hub_with(storage, HubOptions::default()).await;

    hub.ingest_batch(vec![
        NewLogEntry {
            message: Some("no level given".to_string()),
            ..Default::default()
        },
        NewLogEntry {
            level: Some("warn".to_string()),
            message: Some("He said \"hi\"".to_string()),
            ..Default::default()
        },
    ])
    .await
    .unwrap();

    let page = hub
        .search(&LogFilter {
            sort: "timestamp.asc".parse().unwrap(),
            ..Default::default()
        })
        .await
        .unwrap();
    let levels: Vec<LogLevel> = page.items.iter().map(|e| e.level).collect();
    assert!(levels.contains(&LogLevel::Info));
    assert!(levels.contains(&LogLevel::Warn));
    assert!(page.items.iter().all(|e| e.service_name == "unknown"));

    let csv = hub.to_csv(&page.items);
    assert!(csv.starts_with("id,timestamp,level,service_name,message"));
    assert!(csv.contains("\"He said \"\"hi\"\"\""));
    assert!(!csv.ends_with('\n'));
    assert_eq!(hub.to_csv(&[]), "");
}

#[tokio::test]
async fn test_service_list_and_hourly_distribution() {
    let storage = Arc::new(CountingStorage::new().await);
    let hub = hub_with(storage, HubOptions::default()).await;

    hub.ingest_batch(vec![
        entry("auth", "INFO", "a", 5),
        entry("auth", "ERROR", "b", 6),
        entry("billing", "INFO", "c", 7),
        entry("ancient", "INFO", "d", 60 * 24 * 10),
    ])
    .await
    .unwrap();

    let services = hub.service_list().await.unwrap();
    let names: Vec<&str> = services.iter().map(|s| s.service_name.as_str()).collect();
    assert_eq!(names, vec!["auth", "billing"]);
    assert_eq!(services[0].log_count, 2);

    let buckets = hub.hourly_distribution(Some("auth"), 24).await.unwrap();
    let total: u64 = buckets.iter().map(|b| b.count).sum();
    assert_eq!(total, 2);
    assert!(buckets.iter().all(|b| b.hour.ends_with(":00:00")));
}
