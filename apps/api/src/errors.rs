use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::intake::error::IngestError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Conversion error: {0}")]
    Conversion(String),

    #[error("Analysis error: {0}")]
    Analysis(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        let message = err.status_message().to_string();
        match err {
            IngestError::Validation(detail) => AppError::Validation(detail),
            IngestError::Storage(reason) => {
                tracing::error!("Submission storage failure: {reason}");
                AppError::Storage(message)
            }
            IngestError::Conversion(detail) => {
                tracing::error!("Submission conversion failure: {detail}");
                AppError::Conversion(message)
            }
            IngestError::Analysis(failure) => {
                tracing::error!("Submission analysis failure: {failure}");
                AppError::Analysis(message)
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Storage(msg) => (StatusCode::BAD_GATEWAY, "STORAGE_ERROR", msg.clone()),
            AppError::Conversion(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "CONVERSION_ERROR",
                msg.clone(),
            ),
            AppError::Analysis(msg) => (StatusCode::BAD_GATEWAY, "ANALYSIS_ERROR", msg.clone()),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
