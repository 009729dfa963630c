use crate::logstore::{LogHubError, StorageError, ValidationError};
use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Application error types
#[derive(Debug)]
pub enum AppError {
    /// Rejected input (bad filter, empty batch, retention window too short)
    BadRequest(String),
    /// Log store failure
    StorageError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            Self::StorageError(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::StorageError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({
            "error": {
                "message": error_message,
                "type": error_type_name(&self),
            }
        }));

        (status, body).into_response()
    }
}

fn error_type_name(error: &AppError) -> &'static str {
    match error {
        AppError::BadRequest(_) => "invalid_request",
        AppError::StorageError(_) => "storage_error",
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        Self::StorageError(err.to_string())
    }
}

impl From<LogHubError> for AppError {
    fn from(err: LogHubError) -> Self {
        match err {
            LogHubError::Validation(e) => e.into(),
            LogHubError::Storage(e) => e.into(),
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = AppError::BadRequest("limit must be at least 1".to_string());
        assert_eq!(error.to_string(), "Bad request: limit must be at least 1");
    }

    #[test]
    fn test_error_type_name() {
        assert_eq!(error_type_name(&AppError::BadRequest("test".to_string())), "invalid_request");
        assert_eq!(error_type_name(&AppError::StorageError("test".to_string())), "storage_error");
    }

    #[test]
    fn test_from_log_hub_error() {
        let validation: AppError = LogHubError::from(ValidationError::EmptyBatch).into();
        assert!(matches!(validation, AppError::BadRequest(_)));

        let storage: AppError =
            LogHubError::from(StorageError::Database(sqlx::Error::PoolClosed)).into();
        assert!(matches!(storage, AppError::StorageError(_)));
    }

    #[test]
    fn test_from_json_rejection() {
        let error: AppError = JsonRejection::from(
            axum::extract::rejection::MissingJsonContentType::default(),
        )
        .into();
        assert!(matches!(error, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_error_response() {
        let response = AppError::BadRequest("Invalid level".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = AppError::StorageError("database is locked".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
