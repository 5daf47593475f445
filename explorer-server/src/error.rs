//! Error handling

use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use serde_json::json;

use crate::export::ExportError;
use crate::ingest::IngestError;
use crate::models::UnknownCollection;
use crate::store::StoreError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    // Request errors
    CollectionNotFound(String),
    MalformedRecord(String),
    ValidationError(String),
    NotFound(String),

    // Store errors
    StoreUnavailable(String),
    DatabaseError(String),

    // Generic errors
    InternalError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::CollectionNotFound(_) => (StatusCode::BAD_REQUEST, "Invalid collection".to_string()),
            AppError::MalformedRecord(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::StoreUnavailable(msg) => {
                tracing::error!("Store unavailable: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, "Record store unavailable".to_string())
            }
            AppError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error occurred".to_string())
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => AppError::StoreUnavailable(msg),
            StoreError::Query(msg) => AppError::DatabaseError(msg),
            StoreError::EmptyBatch(collection) => {
                AppError::ValidationError(format!("{} upload contains no records", collection))
            }
        }
    }
}

impl From<UnknownCollection> for AppError {
    fn from(err: UnknownCollection) -> Self {
        AppError::CollectionNotFound(err.0)
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::UnsupportedFormat(_) | IngestError::UnknownFileType(_) => {
                AppError::ValidationError(err.to_string())
            }
            other => AppError::MalformedRecord(other.to_string()),
        }
    }
}

impl From<ExportError> for AppError {
    fn from(err: ExportError) -> Self {
        AppError::InternalError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}
