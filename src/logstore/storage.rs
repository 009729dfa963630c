//! Storage adapter for log entries
//!
//! `LogStorage` is the seam between the engine and the relational store.
//! `SqliteStorage` implements it on top of an sqlx pool with:
//! - Automatic migrations
//! - Bulk multi-row inserts inside one transaction
//! - WAL mode for concurrent reads/writes on file databases
//! - An FTS5 index over `message` for text matching

use super::error::StorageError;
use super::model::{LogEntry, LogLevel, NormalizedEntry};
use async_trait::async_trait;
use chrono::DateTime;
use serde_json::{Map, Value};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::{Column, QueryBuilder, Row as _, Sqlite, TypeInfo, ValueRef};
use std::str::FromStr;
use std::time::Duration;

/// Columns written per row by `insert_batch`
const INSERT_COLUMNS: usize = 12;

/// Stay well below SQLite's bound-parameter limit (32766)
const MAX_ROWS_PER_STATEMENT: usize = 32_000 / INSERT_COLUMNS;

/// A bound query parameter
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Int(i64),
    Null,
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

/// Parameterized SQL statement
///
/// Values never appear in `sql`; each `?` placeholder is matched in order by
/// an entry in `params`.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

/// A generic result row keyed by column name
pub type Row = Map<String, Value>;

/// Query executor consumed by the engine
///
/// The hosting process owns the implementation (and its connection pool);
/// the engine only issues parameterized statements through it.
#[async_trait]
pub trait LogStorage: Send + Sync {
    /// Insert all rows as one bulk operation, returning the number written
    async fn insert_batch(&self, entries: &[NormalizedEntry]) -> Result<u64, StorageError>;

    /// Run a SELECT over the `logs` table returning full entries
    async fn select_entries(&self, stmt: &Statement) -> Result<Vec<LogEntry>, StorageError>;

    /// Run an aggregate SELECT returning generic rows
    async fn select_rows(&self, stmt: &Statement) -> Result<Vec<Row>, StorageError>;

    /// Run a DELETE/UPDATE, returning the number of affected rows
    async fn execute(&self, stmt: &Statement) -> Result<u64, StorageError>;
}

/// SQLite-backed log storage
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Open (or create) a database and run migrations
    ///
    /// # Example
    ///
    /// ```ignore
    /// let storage = SqliteStorage::connect("sqlite:./data/logs.db", 5).await?;
    /// ```
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StorageError> {
        let in_memory = database_url.contains(":memory:");

        let mut options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(30))
            .pragma("temp_store", "memory");

        if !in_memory {
            if let Some(dir) = options.get_filename().parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)?;
            }

            options = options
                .journal_mode(SqliteJournalMode::Wal)
                .pragma("synchronous", "NORMAL")
                .pragma("cache_size", "-64000"); // 64MB
        }

        // An in-memory database lives only as long as its connections
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections.max(1))
        };

        let pool = pool_options
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await?;

        Self::run_migrations(&pool).await?;

        Ok(Self { pool })
    }

    /// Private in-memory database, mainly for tests and one-off tooling
    pub async fn in_memory() -> Result<Self, StorageError> {
        Self::connect("sqlite::memory:", 1).await
    }

    async fn run_migrations(pool: &SqlitePool) -> Result<(), StorageError> {
        sqlx::migrate!("./migrations").run(pool).await?;

        tracing::debug!("Log store migrations completed");
        Ok(())
    }
}

fn bind_params<'q>(
    stmt: &'q Statement,
) -> sqlx::query::Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    let mut query = sqlx::query(&stmt.sql);
    for param in &stmt.params {
        query = match param {
            SqlValue::Text(value) => query.bind(value.as_str()),
            SqlValue::Int(value) => query.bind(*value),
            SqlValue::Null => query.bind(Option::<String>::None),
        };
    }
    query
}

fn entry_from_row(row: &SqliteRow) -> Result<LogEntry, StorageError> {
    let millis: i64 = row.try_get("timestamp")?;
    let timestamp =
        DateTime::from_timestamp_millis(millis).ok_or(StorageError::InvalidTimestamp(millis))?;

    let level: String = row.try_get("level")?;
    let tags = row
        .try_get::<Option<String>, _>("tags")?
        .map(|raw| serde_json::from_str::<Vec<String>>(&raw))
        .transpose()
        .map_err(StorageError::Decode)?;

    Ok(LogEntry {
        id: row.try_get("id")?,
        timestamp,
        level: LogLevel::normalize(Some(&level)),
        service_name: row.try_get("service_name")?,
        message: row.try_get("message")?,
        trace_id: row.try_get("trace_id")?,
        tags,
        user_id: row.try_get("user_id")?,
        ip_address: row.try_get("ip_address")?,
        request_method: row.try_get("request_method")?,
        request_url: row.try_get("request_url")?,
        response_time: row.try_get("response_time")?,
        stack_trace: row.try_get("stack_trace")?,
    })
}

/// Convert a row into a JSON object using each value's runtime storage class
fn json_from_row(row: &SqliteRow) -> Result<Row, StorageError> {
    let mut map = Map::with_capacity(row.columns().len());

    for column in row.columns() {
        let index = column.ordinal();
        let raw = row.try_get_raw(index)?;

        let value = if raw.is_null() {
            Value::Null
        } else {
            let storage_class = raw.type_info().name().to_string();
            match storage_class.as_str() {
                "INTEGER" => Value::from(row.try_get::<i64, _>(index)?),
                "REAL" => Value::from(row.try_get::<f64, _>(index)?),
                _ => Value::from(row.try_get::<String, _>(index)?),
            }
        };

        map.insert(column.name().to_string(), value);
    }

    Ok(map)
}

#[async_trait]
impl LogStorage for SqliteStorage {
    async fn insert_batch(&self, entries: &[NormalizedEntry]) -> Result<u64, StorageError> {
        if entries.is_empty() {
            return Ok(0);
        }

        let tags = entries
            .iter()
            .map(|entry| entry.tags.as_ref().map(serde_json::to_string).transpose())
            .collect::<Result<Vec<Option<String>>, _>>()
            .map_err(|source| StorageError::Encode {
                column: "tags",
                source,
            })?;

        let mut tx = self.pool.begin().await?;
        let mut written = 0;

        for (chunk_index, chunk) in entries.chunks(MAX_ROWS_PER_STATEMENT).enumerate() {
            let offset = chunk_index * MAX_ROWS_PER_STATEMENT;
            let chunk_tags = &tags[offset..offset + chunk.len()];

            let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
                "INSERT INTO logs (timestamp, level, service_name, message, trace_id, tags, \
                 user_id, ip_address, request_method, request_url, response_time, stack_trace) ",
            );

            builder.push_values(chunk.iter().zip(chunk_tags), |mut b, (entry, tags)| {
                b.push_bind(entry.timestamp.timestamp_millis())
                    .push_bind(entry.level.as_str())
                    .push_bind(entry.service_name.as_str())
                    .push_bind(entry.message.as_str())
                    .push_bind(entry.trace_id.as_deref())
                    .push_bind(tags.as_deref())
                    .push_bind(entry.user_id.as_deref())
                    .push_bind(entry.ip_address.as_deref())
                    .push_bind(entry.request_method.as_deref())
                    .push_bind(entry.request_url.as_deref())
                    .push_bind(entry.response_time)
                    .push_bind(entry.stack_trace.as_deref());
            });

            let result = builder.build().execute(&mut *tx).await?;
            written += result.rows_affected();
        }

        tx.commit().await?;

        Ok(written)
    }

    async fn select_entries(&self, stmt: &Statement) -> Result<Vec<LogEntry>, StorageError> {
        let rows = bind_params(stmt).fetch_all(&self.pool).await?;
        rows.iter().map(entry_from_row).collect()
    }

    async fn select_rows(&self, stmt: &Statement) -> Result<Vec<Row>, StorageError> {
        let rows = bind_params(stmt).fetch_all(&self.pool).await?;
        rows.iter().map(json_from_row).collect()
    }

    async fn execute(&self, stmt: &Statement) -> Result<u64, StorageError> {
        let result = bind_params(stmt).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
