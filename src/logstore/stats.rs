//! Derived analytics over the log store
//!
//! All views read storage directly. Only the service list is cached, under
//! its own key and TTL.

use super::cache::ResultCache;
use super::error::{LogHubError, Result, StorageError, ValidationError};
use super::filter::{LogFilter, Predicate};
use super::model::{window_start, LogLevel};
use super::storage::{LogStorage, Row, SqlValue, Statement};
use crate::metrics;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Maximum rows returned by `grouped_stats`
pub const GROUPED_STATS_LIMIT: i64 = 100;

/// Window used by the service list
pub const SERVICE_LIST_WINDOW_DAYS: i64 = 7;

/// Trailing window accepted by `error_rate`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TimeRange {
    #[default]
    LastHour,
    LastSixHours,
    LastDay,
    LastWeek,
}

impl TimeRange {
    pub fn hours(&self) -> i64 {
        match self {
            Self::LastHour => 1,
            Self::LastSixHours => 6,
            Self::LastDay => 24,
            Self::LastWeek => 168,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LastHour => "1h",
            Self::LastSixHours => "6h",
            Self::LastDay => "24h",
            Self::LastWeek => "7d",
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeRange {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "1h" => Ok(Self::LastHour),
            "6h" => Ok(Self::LastSixHours),
            "24h" => Ok(Self::LastDay),
            "7d" => Ok(Self::LastWeek),
            other => Err(ValidationError::UnknownTimeRange(other.to_string())),
        }
    }
}

impl TryFrom<String> for TimeRange {
    type Error = ValidationError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeRange> for String {
    fn from(value: TimeRange) -> Self {
        value.as_str().to_string()
    }
}

/// Count and mean response time per (level, service, day)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupedStat {
    pub level: String,
    pub service_name: String,
    /// UTC calendar day, `YYYY-MM-DD`
    pub date: String,
    pub count: u64,
    pub avg_response_time: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRate {
    pub error_count: u64,
    pub total_count: u64,
    /// Percentage rounded to two decimals
    pub error_rate: f64,
}

impl ErrorRate {
    pub fn new(error_count: u64, total_count: u64) -> Self {
        let error_rate = if total_count == 0 {
            0.0
        } else {
            round2(error_count as f64 / total_count as f64 * 100.0)
        };

        Self {
            error_count,
            total_count,
            error_rate,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// A service seen within the service-list window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSummary {
    pub service_name: String,
    pub log_count: u64,
    pub last_seen: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyBucket {
    /// UTC hour, `YYYY-MM-DD HH:00:00`
    pub hour: String,
    pub level: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopError {
    pub message: String,
    pub service_name: String,
    pub count: u64,
    pub last_occurrence: DateTime<Utc>,
}

#[derive(Deserialize)]
struct ErrorCounts {
    error_count: Option<u64>,
    total_count: u64,
}

fn decode_rows<T: DeserializeOwned>(rows: Vec<Row>) -> Result<Vec<T>> {
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(serde_json::Value::Object(row))
                .map_err(|e| LogHubError::from(StorageError::Decode(e)))
        })
        .collect()
}

fn since(hours: i64) -> Result<i64> {
    Ok(window_start(hours)?.timestamp_millis())
}

/// Read-only aggregate views
pub struct StatsAggregator {
    storage: Arc<dyn LogStorage>,
    cache: Arc<ResultCache>,
}

impl StatsAggregator {
    pub fn new(storage: Arc<dyn LogStorage>, cache: Arc<ResultCache>) -> Self {
        Self { storage, cache }
    }

    /// Counts grouped by (level, service, day) over the filtered entries
    ///
    /// Paging fields of the filter are ignored; at most 100 groups are returned.
    pub async fn grouped_stats(&self, filter: &LogFilter) -> Result<Vec<GroupedStat>> {
        filter.validate()?;

        let predicate = filter.compile();
        let sql = format!(
            "SELECT level, service_name, date(timestamp / 1000, 'unixepoch') AS date, \
             COUNT(*) AS count, AVG(response_time) AS avg_response_time \
             FROM logs{} \
             GROUP BY level, service_name, date \
             ORDER BY date DESC, count DESC \
             LIMIT ?",
            predicate.where_sql()
        );
        let mut params = predicate.into_params();
        params.push(SqlValue::Int(GROUPED_STATS_LIMIT));

        let rows = self.storage.select_rows(&Statement::new(sql, params)).await?;
        decode_rows(rows)
    }

    /// Share of ERROR entries within the trailing window
    pub async fn error_rate(&self, service: Option<&str>, range: TimeRange) -> Result<ErrorRate> {
        let mut predicate = Predicate::default();
        predicate.push("timestamp >= ?", since(range.hours())?);
        if let Some(service) = service.map(str::trim).filter(|s| !s.is_empty()) {
            predicate.push("service_name = ?", service);
        }

        let sql = format!(
            "SELECT SUM(CASE WHEN level = ? THEN 1 ELSE 0 END) AS error_count, \
             COUNT(*) AS total_count FROM logs{}",
            predicate.where_sql()
        );
        let mut params = vec![SqlValue::from(LogLevel::Error.as_str())];
        params.extend(predicate.into_params());

        let rows = self.storage.select_rows(&Statement::new(sql, params)).await?;
        let counts = decode_rows::<ErrorCounts>(rows)?
            .into_iter()
            .next()
            .unwrap_or(ErrorCounts {
                error_count: None,
                total_count: 0,
            });

        Ok(ErrorRate::new(
            counts.error_count.unwrap_or(0),
            counts.total_count,
        ))
    }

    /// Services active in the last seven days, busiest first (cached)
    pub async fn service_list(&self) -> Result<Vec<ServiceSummary>> {
        if let Some(cached) = self.cache.get_service_list() {
            metrics::record_cache_lookup("service_list", true);
            return Ok(cached.as_ref().clone());
        }
        metrics::record_cache_lookup("service_list", false);

        let sql = "SELECT service_name, COUNT(*) AS log_count, \
                   strftime('%Y-%m-%dT%H:%M:%fZ', MAX(timestamp) / 1000.0, 'unixepoch') AS last_seen \
                   FROM logs WHERE timestamp >= ? \
                   GROUP BY service_name ORDER BY log_count DESC, service_name ASC";
        let params = vec![SqlValue::Int(since(SERVICE_LIST_WINDOW_DAYS * 24)?)];

        let rows = self.storage.select_rows(&Statement::new(sql, params)).await?;
        let services: Vec<ServiceSummary> = decode_rows(rows)?;

        self.cache.set_service_list(Arc::new(services.clone()));
        Ok(services)
    }

    /// Entry counts per (hour, level) over the trailing `hours`
    pub async fn hourly_distribution(
        &self,
        service: Option<&str>,
        hours: u32,
    ) -> Result<Vec<HourlyBucket>> {
        if hours == 0 {
            return Err(ValidationError::ZeroHours.into());
        }

        let mut predicate = Predicate::default();
        predicate.push("timestamp >= ?", since(hours as i64)?);
        if let Some(service) = service.map(str::trim).filter(|s| !s.is_empty()) {
            predicate.push("service_name = ?", service);
        }

        let sql = format!(
            "SELECT strftime('%Y-%m-%d %H:00:00', timestamp / 1000, 'unixepoch') AS hour, \
             level, COUNT(*) AS count FROM logs{} \
             GROUP BY hour, level ORDER BY hour ASC, level ASC",
            predicate.where_sql()
        );

        let rows = self
            .storage
            .select_rows(&Statement::new(sql, predicate.into_params()))
            .await?;
        decode_rows(rows)
    }

    /// Most frequent ERROR messages per service over the trailing `hours`
    pub async fn top_errors(&self, limit: u32, hours: u32) -> Result<Vec<TopError>> {
        if limit == 0 {
            return Err(ValidationError::ZeroLimit.into());
        }
        if hours == 0 {
            return Err(ValidationError::ZeroHours.into());
        }

        let sql = "SELECT message, service_name, COUNT(*) AS count, \
                   strftime('%Y-%m-%dT%H:%M:%fZ', MAX(timestamp) / 1000.0, 'unixepoch') AS last_occurrence \
                   FROM logs WHERE level = ? AND timestamp >= ? \
                   GROUP BY message, service_name \
                   ORDER BY count DESC, MAX(timestamp) DESC LIMIT ?";
        let params = vec![
            SqlValue::from(LogLevel::Error.as_str()),
            SqlValue::Int(since(hours as i64)?),
            SqlValue::Int(limit as i64),
        ];

        let rows = self.storage.select_rows(&Statement::new(sql, params)).await?;
        decode_rows(rows)
    }
}
