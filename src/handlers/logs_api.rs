//! Log hub HTTP API handlers
//!
//! Thin adapter over `LogHub`: query strings are parsed into engine
//! arguments, engine results are returned as JSON. Malformed query strings
//! and bodies get the same JSON error body as engine errors. Failed reads
//! and cleanups are recorded in the log store itself via the self-logger.

use super::extract::{ApiJson, ApiQuery};
use crate::error::AppError;
use crate::logstore::{
    CleanupReport, ErrorRate, FailureContext, GroupedStat, HourlyBucket, IngestReport,
    LogFilter, LogHub, LogHubError, LogLevel, NewLogEntry, SearchPage, ServiceSummary,
    SortOrder, TimeRange, TopError, ValidationError,
};
use axum::async_trait;
use axum::extract::{FromRequestParts, OriginalUri, State};
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;

/// Header carrying the caller's correlation id
pub const TRACE_ID_HEADER: &str = "x-trace-id";

/// Shared state for the log API
#[derive(Clone)]
pub struct LogsState {
    pub hub: Arc<LogHub>,
    /// Smallest `days` accepted by the cleanup endpoint
    pub min_retention_days: u32,
    /// `days` used when the cleanup request omits it
    pub default_retention_days: u32,
}

/// Request metadata attached to self-logged failures
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: String,
    pub url: String,
    pub trace_id: String,
    pub ip_address: Option<String>,
    started: Instant,
}

impl RequestContext {
    fn into_failure(self, tag: &str) -> FailureContext {
        FailureContext {
            trace_id: Some(self.trace_id),
            tags: vec![tag.to_string()],
            user_id: None,
            ip_address: self.ip_address,
            request_method: Some(self.method),
            request_url: Some(self.url),
            response_time: Some(self.started.elapsed().as_millis() as i64),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let url = parts
            .extensions
            .get::<OriginalUri>()
            .map(|uri| uri.0.to_string())
            .unwrap_or_else(|| parts.uri.to_string());

        let trace_id = header_value(parts, TRACE_ID_HEADER)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let ip_address = header_value(parts, "x-forwarded-for")
            .and_then(|forwarded| forwarded.split(',').next().map(|ip| ip.trim().to_string()))
            .filter(|ip| !ip.is_empty());

        Ok(Self {
            method: parts.method.to_string(),
            url,
            trace_id,
            ip_address,
            started: Instant::now(),
        })
    }
}

fn header_value(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Record a failed request in the log store and map it to an HTTP error
///
/// Rejected input is answered with 400 only; storage failures are self-logged.
async fn fail(state: &LogsState, ctx: RequestContext, tag: &str, err: LogHubError) -> AppError {
    if !err.is_validation() {
        tracing::error!(
            error = %err,
            trace_id = %ctx.trace_id,
            url = %ctx.url,
            "Log hub request failed"
        );
        state.hub.log_failure(&err, ctx.into_failure(tag)).await;
    }
    err.into()
}

/// Query parameters for search, export and grouped stats
///
/// `tags` is comma-separated; blank values are treated as absent.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub level: Option<String>,
    pub service: Option<String>,
    pub q: Option<String>,
    pub trace_id: Option<String>,
    pub user_id: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub tags: Option<String>,
    pub sort: Option<String>,
    pub limit: Option<u32>,
    pub page: Option<u32>,
}

impl SearchParams {
    pub fn into_filter(self) -> Result<LogFilter, ValidationError> {
        let level = non_blank(self.level)
            .map(|level| level.parse::<LogLevel>())
            .transpose()?;
        let sort = non_blank(self.sort)
            .map(|sort| sort.parse::<SortOrder>())
            .transpose()?
            .unwrap_or_default();
        let tags = self
            .tags
            .map(|tags| {
                tags.split(',')
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let filter = LogFilter {
            level,
            service: non_blank(self.service),
            q: non_blank(self.q),
            trace_id: non_blank(self.trace_id),
            user_id: non_blank(self.user_id),
            from: self.from,
            to: self.to,
            tags,
            sort,
            limit: self.limit,
            page: self.page,
        };
        filter.validate()?;

        Ok(filter)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// POST /api/logs - Ingest a single entry
pub async fn ingest_one(
    State(state): State<LogsState>,
    ApiJson(entry): ApiJson<NewLogEntry>,
) -> (StatusCode, Json<IngestReport>) {
    let report = state.hub.ingest_one(entry).await;
    (StatusCode::CREATED, Json(report))
}

/// POST /api/logs/batch - Ingest a JSON array of entries
pub async fn ingest_batch(
    State(state): State<LogsState>,
    ApiJson(entries): ApiJson<Vec<NewLogEntry>>,
) -> Result<(StatusCode, Json<IngestReport>), AppError> {
    let report = state.hub.ingest_batch(entries).await?;
    Ok((StatusCode::CREATED, Json(report)))
}

/// GET /api/logs - Filtered, paginated search
///
/// Example: GET /api/logs?service=auth&level=ERROR&tags=db,timeout&page=2
pub async fn search(
    State(state): State<LogsState>,
    ctx: RequestContext,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> Result<Json<SearchPage>, AppError> {
    let filter = params.into_filter()?;

    match state.hub.search(&filter).await {
        Ok(page) => Ok(Json(page)),
        Err(e) => Err(fail(&state, ctx, "search", e).await),
    }
}

/// GET /api/logs/export - Search results as CSV
pub async fn export_csv(
    State(state): State<LogsState>,
    ctx: RequestContext,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> Result<Response, AppError> {
    let filter = params.into_filter()?;

    let page = match state.hub.search(&filter).await {
        Ok(page) => page,
        Err(e) => return Err(fail(&state, ctx, "export", e).await),
    };

    let csv = state.hub.to_csv(&page.items);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"logs.csv\""),
        ],
        csv,
    )
        .into_response())
}

/// GET /api/logs/stats - Counts grouped by level, service and day
pub async fn grouped_stats(
    State(state): State<LogsState>,
    ctx: RequestContext,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> Result<Json<Vec<GroupedStat>>, AppError> {
    let filter = params.into_filter()?;

    match state.hub.grouped_stats(&filter).await {
        Ok(rows) => Ok(Json(rows)),
        Err(e) => Err(fail(&state, ctx, "stats", e).await),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ErrorRateParams {
    pub service: Option<String>,
    /// One of 1h, 6h, 24h, 7d (default 1h)
    pub range: Option<String>,
}

/// GET /api/logs/stats/error-rate
pub async fn error_rate(
    State(state): State<LogsState>,
    ctx: RequestContext,
    ApiQuery(params): ApiQuery<ErrorRateParams>,
) -> Result<Json<ErrorRate>, AppError> {
    let range = non_blank(params.range)
        .map(|range| range.parse::<TimeRange>())
        .transpose()?
        .unwrap_or_default();
    let service = non_blank(params.service);

    match state.hub.error_rate(service.as_deref(), range).await {
        Ok(rate) => Ok(Json(rate)),
        Err(e) => Err(fail(&state, ctx, "stats", e).await),
    }
}

fn default_window_hours() -> u32 {
    24
}

fn default_top_errors() -> u32 {
    10
}

#[derive(Debug, Deserialize)]
pub struct HourlyParams {
    pub service: Option<String>,
    #[serde(default = "default_window_hours")]
    pub hours: u32,
}

/// GET /api/logs/stats/hourly
pub async fn hourly_distribution(
    State(state): State<LogsState>,
    ctx: RequestContext,
    ApiQuery(params): ApiQuery<HourlyParams>,
) -> Result<Json<Vec<HourlyBucket>>, AppError> {
    let service = non_blank(params.service);

    match state.hub.hourly_distribution(service.as_deref(), params.hours).await {
        Ok(rows) => Ok(Json(rows)),
        Err(e) => Err(fail(&state, ctx, "stats", e).await),
    }
}

#[derive(Debug, Deserialize)]
pub struct TopErrorsParams {
    #[serde(default = "default_top_errors")]
    pub limit: u32,
    #[serde(default = "default_window_hours")]
    pub hours: u32,
}

/// GET /api/logs/stats/top-errors
pub async fn top_errors(
    State(state): State<LogsState>,
    ctx: RequestContext,
    ApiQuery(params): ApiQuery<TopErrorsParams>,
) -> Result<Json<Vec<TopError>>, AppError> {
    match state.hub.top_errors(params.limit, params.hours).await {
        Ok(rows) => Ok(Json(rows)),
        Err(e) => Err(fail(&state, ctx, "stats", e).await),
    }
}

/// GET /api/logs/services - Services active in the last seven days
pub async fn services(
    State(state): State<LogsState>,
    ctx: RequestContext,
) -> Result<Json<Vec<ServiceSummary>>, AppError> {
    match state.hub.service_list().await {
        Ok(rows) => Ok(Json(rows)),
        Err(e) => Err(fail(&state, ctx, "stats", e).await),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CleanupParams {
    pub days: Option<u32>,
}

/// DELETE /api/logs/cleanup?days=N - Delete entries older than N days
pub async fn cleanup(
    State(state): State<LogsState>,
    ctx: RequestContext,
    ApiQuery(params): ApiQuery<CleanupParams>,
) -> Result<Json<CleanupReport>, AppError> {
    let days = params.days.unwrap_or(state.default_retention_days);
    if days < state.min_retention_days {
        return Err(ValidationError::RetentionTooShort {
            requested: days,
            min: state.min_retention_days,
        }
        .into());
    }

    match state.hub.cleanup(days).await {
        Ok(report) => Ok(Json(report)),
        Err(e) => Err(fail(&state, ctx, "cleanup", e).await),
    }
}

/// GET /health - Liveness probe
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
