//! API Error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use attend_core::{AttendanceError, StoreError};

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Attendance error: {0}")]
    Attendance(#[from] AttendanceError),
}

/// Error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

fn store_status(e: &StoreError) -> (StatusCode, &'static str) {
    match e {
        StoreError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        StoreError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
        StoreError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        StoreError::Serialization(_) | StoreError::Storage(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR")
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            ApiError::Store(e) => {
                let (status, code) = store_status(e);
                (status, code, e.to_string())
            }
            ApiError::Attendance(AttendanceError::Store(e)) => {
                let (status, code) = store_status(e);
                (status, code, e.to_string())
            }
            ApiError::Attendance(e) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "ATTENDANCE_ERROR", e.to_string())
            }
        };

        if status.is_server_error() {
            tracing::error!(code = code, error = %message, "Request failed");
        }

        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;
