//! Records the engine's own failures as log entries
//!
//! `log_failure` is meant to be called from error paths, so it never fails
//! and never panics; problems are only reported through `tracing`.

use super::ingest::LogIngester;
use super::model::{LogLevel, NewLogEntry};
use std::error::Error;
use std::sync::Arc;

/// Tag carried by every self-logged failure
pub const ERROR_TAG: &str = "error";

/// Request context attached to a self-logged failure
#[derive(Debug, Clone, Default)]
pub struct FailureContext {
    pub trace_id: Option<String>,
    pub tags: Vec<String>,
    pub user_id: Option<String>,
    pub ip_address: Option<String>,
    pub request_method: Option<String>,
    pub request_url: Option<String>,
    pub response_time: Option<i64>,
}

pub struct SelfLogger {
    ingester: Arc<LogIngester>,
    service_name: String,
}

impl SelfLogger {
    pub fn new(ingester: Arc<LogIngester>, service_name: impl Into<String>) -> Self {
        Self {
            ingester,
            service_name: service_name.into(),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Persist an ERROR entry describing `error`
    pub async fn log_failure(
        &self,
        error: &(dyn Error + Send + Sync + 'static),
        context: FailureContext,
    ) {
        let entry = self.failure_entry(error, context);
        let report = self.ingester.insert_one(entry).await;

        if report.failed > 0 {
            tracing::warn!(
                error = %error,
                "Failed to record failure in log store"
            );
        }
    }

    fn failure_entry(
        &self,
        error: &(dyn Error + Send + Sync + 'static),
        context: FailureContext,
    ) -> NewLogEntry {
        let mut tags = vec![ERROR_TAG.to_string()];
        tags.extend(context.tags.into_iter().filter(|t| t != ERROR_TAG));

        NewLogEntry {
            timestamp: None,
            level: Some(LogLevel::Error.as_str().to_string()),
            service_name: Some(self.service_name.clone()),
            message: Some(error.to_string()),
            trace_id: context.trace_id,
            tags: Some(tags),
            user_id: context.user_id,
            ip_address: context.ip_address,
            request_method: context.request_method,
            request_url: context.request_url,
            response_time: context.response_time,
            stack_trace: Some(error_chain(error)),
        }
    }
}

/// Render an error and its sources, one per line
pub fn error_chain(error: &(dyn Error + 'static)) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        rendered.push_str("\ncaused by: ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}
