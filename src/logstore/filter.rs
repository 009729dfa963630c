//! Filter compiler
//!
//! Translates a `LogFilter` into an ordered list of (predicate, parameter)
//! pairs. Predicate fragments are fixed strings; caller input only ever
//! travels as bound parameters.

use super::error::ValidationError;
use super::model::LogLevel;
use super::storage::{SqlValue, Statement};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Page size used when the caller does not ask for one
pub const DEFAULT_LIMIT: u32 = 50;

/// Hard upper bound on page size; larger requests are clamped silently
pub const MAX_LIMIT: u32 = 500;

/// Column list shared by every entry-returning query
pub(crate) const ENTRY_COLUMNS: &str = "id, timestamp, level, service_name, message, trace_id, \
     tags, user_id, ip_address, request_method, request_url, response_time, stack_trace";

/// Sort direction over `timestamp`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ascending => "timestamp.asc",
            Self::Descending => "timestamp.desc",
        }
    }

    fn order_by(&self) -> &'static str {
        match self {
            Self::Ascending => " ORDER BY timestamp ASC, id ASC",
            Self::Descending => " ORDER BY timestamp DESC, id DESC",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "timestamp.asc" | "asc" => Ok(Self::Ascending),
            "timestamp.desc" | "desc" => Ok(Self::Descending),
            _ => Err(ValidationError::UnknownSort(s.to_string())),
        }
    }
}

impl TryFrom<String> for SortOrder {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SortOrder> for String {
    fn from(value: SortOrder) -> Self {
        value.as_str().to_string()
    }
}

/// Filter for log searches and grouped statistics
///
/// Every field is optional and all present fields are combined with AND.
///
/// # Example
///
/// ```ignore
/// let filter = LogFilter {
///     level: Some(LogLevel::Error),
///     service: Some("auth".to_string()),
///     tags: vec!["db".to_string(), "timeout".to_string()],
///     ..Default::default()
/// };
/// let page = engine.search(&filter).await?;
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogFilter {
    pub level: Option<LogLevel>,
    pub service: Option<String>,
    /// Free-text query matched against `message`
    pub q: Option<String>,
    pub trace_id: Option<String>,
    pub user_id: Option<String>,
    /// Inclusive lower bound on `timestamp`
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `timestamp`
    pub to: Option<DateTime<Utc>>,
    /// Entries must carry every listed tag
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub sort: SortOrder,
    pub limit: Option<u32>,
    pub page: Option<u32>,
}

impl LogFilter {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.limit == Some(0) {
            return Err(ValidationError::ZeroLimit);
        }
        if self.page == Some(0) {
            return Err(ValidationError::ZeroPage);
        }
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(ValidationError::InvertedTimeRange);
            }
        }
        Ok(())
    }

    /// Requested page size clamped to `MAX_LIMIT`
    pub fn effective_limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    /// Requested page, never below 1
    pub fn effective_page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn offset(&self) -> u64 {
        (self.effective_page() as u64 - 1) * self.effective_limit() as u64
    }

    /// Canonical cache key for this filter
    pub fn cache_key(&self) -> FilterKey {
        let mut tags: Vec<String> = self
            .tags
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        tags.sort();
        tags.dedup();

        FilterKey {
            level: self.level,
            service: non_blank(self.service.as_deref()),
            q: non_blank(self.q.as_deref()),
            trace_id: non_blank(self.trace_id.as_deref()),
            user_id: non_blank(self.user_id.as_deref()),
            from_ms: self.from.map(|t| t.timestamp_millis()),
            to_ms: self.to.map(|t| t.timestamp_millis()),
            tags,
            sort: self.sort,
            limit: self.effective_limit(),
            page: self.effective_page(),
        }
    }

    /// Compile the WHERE predicate for this filter
    pub fn compile(&self) -> Predicate {
        let mut predicate = Predicate::default();

        if let Some(level) = self.level {
            predicate.push("level = ?", level.as_str());
        }
        if let Some(service) = non_blank(self.service.as_deref()) {
            predicate.push("service_name = ?", service);
        }
        if let Some(trace_id) = non_blank(self.trace_id.as_deref()) {
            predicate.push("trace_id = ?", trace_id);
        }
        if let Some(user_id) = non_blank(self.user_id.as_deref()) {
            predicate.push("user_id = ?", user_id);
        }
        if let Some(q) = self.q.as_deref().and_then(text_match_query) {
            predicate.push(
                "id IN (SELECT rowid FROM logs_fts WHERE logs_fts MATCH ?)",
                q,
            );
        }
        if let Some(from) = self.from {
            predicate.push("timestamp >= ?", from.timestamp_millis());
        }
        if let Some(to) = self.to {
            predicate.push("timestamp <= ?", to.timestamp_millis());
        }
        for tag in self.tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
            predicate.push(
                "EXISTS (SELECT 1 FROM json_each(logs.tags) WHERE json_each.value = ?)",
                tag,
            );
        }

        predicate
    }

    /// Data query: one page of entries in the requested order
    pub fn data_statement(&self) -> Statement {
        let predicate = self.compile();
        let mut sql = format!("SELECT {} FROM logs{}", ENTRY_COLUMNS, predicate.where_sql());
        sql.push_str(self.sort.order_by());
        sql.push_str(" LIMIT ? OFFSET ?");

        let mut params = predicate.into_params();
        params.push(SqlValue::Int(self.effective_limit() as i64));
        params.push(SqlValue::Int(self.offset() as i64));

        Statement::new(sql, params)
    }

    /// Count query over the same predicate, without paging
    pub fn count_statement(&self) -> Statement {
        let predicate = self.compile();
        let sql = format!("SELECT COUNT(*) AS total FROM logs{}", predicate.where_sql());
        Statement::new(sql, predicate.into_params())
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Build an FTS5 query with natural-language semantics (any term matches)
///
/// Each whitespace-separated term is quoted so FTS5 operators in user input
/// are treated as plain text.
pub fn text_match_query(raw: &str) -> Option<String> {
    let terms: Vec<String> = raw
        .split_whitespace()
        .map(|term| format!("\"{}\"", term.replace('"', "\"\"")))
        .collect();

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" OR "))
    }
}

/// Ordered list of predicate fragments, each with exactly one bound parameter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    clauses: Vec<(&'static str, SqlValue)>,
}

impl Predicate {
    pub fn push(&mut self, clause: &'static str, value: impl Into<SqlValue>) -> &mut Self {
        self.clauses.push((clause, value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn clauses(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.clauses.iter().map(|(clause, _)| *clause)
    }

    /// ` WHERE a AND b ...`, or an empty string when nothing is filtered
    pub fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            let joined: Vec<&str> = self.clauses().collect();
            format!(" WHERE {}", joined.join(" AND "))
        }
    }

    pub fn params(&self) -> Vec<SqlValue> {
        self.clauses.iter().map(|(_, value)| value.clone()).collect()
    }

    pub fn into_params(self) -> Vec<SqlValue> {
        self.clauses.into_iter().map(|(_, value)| value).collect()
    }
}

/// Canonical, hashable form of a `LogFilter` used as the search cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilterKey {
    level: Option<LogLevel>,
    service: Option<String>,
    q: Option<String>,
    trace_id: Option<String>,
    user_id: Option<String>,
    from_ms: Option<i64>,
    to_ms: Option<i64>,
    tags: Vec<String>,
    sort: SortOrder,
    limit: u32,
    page: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter_matches_everything() {
        let predicate = LogFilter::default().compile();
        assert!(predicate.is_empty());
        assert_eq!(predicate.where_sql(), "");
    }

    #[test]
    fn test_compile_clause_order_and_params() {
        let from = Utc::now() - chrono::Duration::hours(2);
        let filter = LogFilter {
            level: Some(LogLevel::Error),
            service: Some("auth".to_string()),
            from: Some(from),
            ..Default::default()
        };

        let predicate = filter.compile();
        assert_eq!(
            predicate.where_sql(),
            " WHERE level = ? AND service_name = ? AND timestamp >= ?"
        );
        assert_eq!(
            predicate.params(),
            vec![
                SqlValue::from("ERROR"),
                SqlValue::from("auth"),
                SqlValue::Int(from.timestamp_millis()),
            ]
        );
    }

    #[test]
    fn test_tags_compile_to_one_clause_each() {
        let filter = LogFilter {
            tags: vec!["a".to_string(), "b".to_string()],
            ..Default::default()
        };

        let predicate = filter.compile();
        assert_eq!(predicate.len(), 2);
        assert!(predicate.clauses().all(|c| c.contains("json_each")));
        assert_eq!(
            predicate.params(),
            vec![SqlValue::from("a"), SqlValue::from("b")]
        );
    }

    #[test]
    fn test_text_match_query_quotes_terms() {
        assert_eq!(
            text_match_query("db timeout").as_deref(),
            Some("\"db\" OR \"timeout\"")
        );
        assert_eq!(
            text_match_query("say \"hi\"").as_deref(),
            Some("\"say\" OR \"\"\"hi\"\"\"")
        );
        assert_eq!(text_match_query("   "), None);
    }

    #[test]
    fn test_limit_clamped_and_paging() {
        let filter = LogFilter {
            limit: Some(10_000),
            page: Some(3),
            ..Default::default()
        };
        assert_eq!(filter.effective_limit(), MAX_LIMIT);
        assert_eq!(filter.offset(), 1000);

        let defaults = LogFilter::default();
        assert_eq!(defaults.effective_limit(), DEFAULT_LIMIT);
        assert_eq!(defaults.effective_page(), 1);
        assert_eq!(defaults.offset(), 0);
    }

    #[test]
    fn test_data_and_count_share_predicate() {
        let filter = LogFilter {
            user_id: Some("u-1".to_string()),
            sort: SortOrder::Ascending,
            limit: Some(20),
            page: Some(2),
            ..Default::default()
        };

        let data = filter.data_statement();
        assert!(data.sql.contains("WHERE user_id = ?"));
        assert!(data.sql.contains("ORDER BY timestamp ASC"));
        assert_eq!(
            data.params,
            vec![SqlValue::from("u-1"), SqlValue::Int(20), SqlValue::Int(20)]
        );

        let count = filter.count_statement();
        assert!(count.sql.starts_with("SELECT COUNT(*) AS total FROM logs WHERE user_id = ?"));
        assert_eq!(count.params, vec![SqlValue::from("u-1")]);
    }

    #[test]
    fn test_validate() {
        assert!(LogFilter::default().validate().is_ok());

        let zero_limit = LogFilter {
            limit: Some(0),
            ..Default::default()
        };
        assert_eq!(zero_limit.validate(), Err(ValidationError::ZeroLimit));

        let now = Utc::now();
        let inverted = LogFilter {
            from: Some(now),
            to: Some(now - chrono::Duration::seconds(1)),
            ..Default::default()
        };
        assert_eq!(inverted.validate(), Err(ValidationError::InvertedTimeRange));
    }

    #[test]
    fn test_cache_key_is_canonical() {
        let a = LogFilter {
            tags: vec!["b".to_string(), "a".to_string()],
            limit: Some(900),
            service: Some(" auth ".to_string()),
            ..Default::default()
        };
        let b = LogFilter {
            tags: vec!["a".to_string(), "b".to_string(), "a".to_string()],
            limit: Some(MAX_LIMIT),
            page: Some(1),
            service: Some("auth".to_string()),
            ..Default::default()
        };
        assert_eq!(a.cache_key(), b.cache_key());

        let c = LogFilter {
            page: Some(2),
            ..b.clone()
        };
        assert_ne!(b.cache_key(), c.cache_key());
    }

    #[test]
    fn test_filter_deserializes_sort_and_level() {
        let filter: LogFilter =
            serde_json::from_str(r#"{"level": "warn", "sort": "timestamp.asc", "tags": ["x"]}"#)
                .unwrap();
        assert_eq!(filter.level, Some(LogLevel::Warn));
        assert_eq!(filter.sort, SortOrder::Ascending);

        let bad: Result<LogFilter, _> = serde_json::from_str(r#"{"sort": "level.desc"}"#);
        assert!(bad.is_err());
    }
}
