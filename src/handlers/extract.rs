//! Extractors whose rejections use the API's JSON error body

use crate::error::AppError;
use axum::extract::{FromRequest, FromRequestParts};

/// `Query` that rejects malformed query strings with `AppError::BadRequest`
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// `Json` that rejects malformed bodies with `AppError::BadRequest`
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);
