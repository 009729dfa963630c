//! Error taxonomy for the log store
//!
//! Validation errors are raised before anything reaches storage. Storage
//! errors are surfaced on reads and retention, and swallowed on ingestion.

use thiserror::Error;

/// Malformed filter, entry batch or aggregation argument
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("batch must contain at least one log entry")]
    EmptyBatch,

    #[error("unknown log level: {0}")]
    UnknownLevel(String),

    #[error("unknown sort order: {0} (expected timestamp.asc or timestamp.desc)")]
    UnknownSort(String),

    #[error("unknown time range: {0} (expected 1h, 6h, 24h or 7d)")]
    UnknownTimeRange(String),

    #[error("limit must be at least 1")]
    ZeroLimit,

    #[error("page must be at least 1")]
    ZeroPage,

    #[error("time window must be at least 1 hour")]
    ZeroHours,

    #[error("time window of {hours} hours is out of range")]
    WindowTooLarge { hours: i64 },

    #[error("'from' must not be later than 'to'")]
    InvertedTimeRange,

    #[error("retention must keep at least {min} day(s), got {requested}")]
    RetentionTooShort { requested: u32, min: u32 },
}

/// Failure reported by the storage adapter
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("failed to encode {column}: {source}")]
    Encode {
        column: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to decode row: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("invalid timestamp in row: {0}")]
    InvalidTimestamp(i64),

    #[error("failed to prepare database directory: {0}")]
    Io(#[from] std::io::Error),
}

/// Error returned by search, stats and retention operations
#[derive(Debug, Error)]
pub enum LogHubError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl LogHubError {
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

pub type Result<T, E = LogHubError> = std::result::Result<T, E>;
