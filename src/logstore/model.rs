//! Log entry data model
//!
//! `NewLogEntry` is what callers submit, `NormalizedEntry` is what gets
//! persisted, and `LogEntry` is what reads return.

use super::error::ValidationError;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Service name recorded when the caller omits one
pub const UNKNOWN_SERVICE: &str = "unknown";

/// Log severity (ERROR/WARN/INFO/DEBUG/TRACE)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", try_from = "String")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub const ALL: [LogLevel; 5] = [
        LogLevel::Error,
        LogLevel::Warn,
        LogLevel::Info,
        LogLevel::Debug,
        LogLevel::Trace,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
            Self::Trace => "TRACE",
        }
    }

    /// Parse a level for ingestion, falling back to INFO when absent or unrecognized
    pub fn normalize(raw: Option<&str>) -> Self {
        raw.and_then(|value| value.parse().ok()).unwrap_or_default()
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ValidationError::UnknownLevel(s.to_string()))
    }
}

impl TryFrom<String> for LogLevel {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, ValidationError> {
        value.parse()
    }
}

/// A log entry as submitted by a producing service
///
/// Every field is optional; `normalize()` fills in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewLogEntry {
    pub timestamp: Option<DateTime<Utc>>,
    pub level: Option<String>,
    pub service_name: Option<String>,
    pub message: Option<String>,
    pub trace_id: Option<String>,
    pub tags: Option<Vec<String>>,
    pub user_id: Option<String>,
    pub ip_address: Option<String>,
    pub request_method: Option<String>,
    pub request_url: Option<String>,
    pub response_time: Option<i64>,
    pub stack_trace: Option<String>,
}

impl NewLogEntry {
    /// Apply field-by-field defaults against the ingestion time `now`
    pub fn normalize(self, now: DateTime<Utc>) -> NormalizedEntry {
        let service_name = self
            .service_name
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| UNKNOWN_SERVICE.to_string());

        NormalizedEntry {
            timestamp: self.timestamp.unwrap_or(now),
            level: LogLevel::normalize(self.level.as_deref()),
            service_name,
            message: self.message.unwrap_or_default(),
            trace_id: self.trace_id,
            tags: self.tags.and_then(normalize_tags),
            user_id: self.user_id,
            ip_address: self.ip_address,
            request_method: self.request_method.map(|m| m.to_ascii_uppercase()),
            request_url: self.request_url,
            response_time: self.response_time,
            stack_trace: self.stack_trace,
        }
    }
}

/// Trim, drop empties and de-duplicate (first occurrence wins)
fn normalize_tags(tags: Vec<String>) -> Option<Vec<String>> {
    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !normalized.iter().any(|t| t == tag) {
            normalized.push(tag.to_string());
        }
    }

    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

/// A fully defaulted entry ready for persistence
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub service_name: String,
    pub message: String,
    pub trace_id: Option<String>,
    pub tags: Option<Vec<String>>,
    pub user_id: Option<String>,
    pub ip_address: Option<String>,
    pub request_method: Option<String>,
    pub request_url: Option<String>,
    pub response_time: Option<i64>,
    pub stack_trace: Option<String>,
}

/// A persisted log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub service_name: String,
    pub message: String,
    pub trace_id: Option<String>,
    pub tags: Option<Vec<String>>,
    pub user_id: Option<String>,
    pub ip_address: Option<String>,
    pub request_method: Option<String>,
    pub request_url: Option<String>,
    pub response_time: Option<i64>,
    pub stack_trace: Option<String>,
}

/// Start of the trailing window of `hours` that ends now
///
/// Windows reaching before the earliest representable timestamp are rejected.
pub fn window_start(hours: i64) -> Result<DateTime<Utc>, ValidationError> {
    TimeDelta::try_hours(hours)
        .and_then(|window| Utc::now().checked_sub_signed(window))
        .ok_or(ValidationError::WindowTooLarge { hours })
}
