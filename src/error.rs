use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;
use thiserror::Error;

use crate::identity::SessionToken;

/// Reasons a persisted client record fails to decode.
#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("expected {expected} histogram buckets, found {found}")]
    BucketCount { expected: usize, found: usize },

    #[error("invalid histogram count {0:?}")]
    Count(String),

    #[error("invalid last-draw timestamp {0:?}")]
    Timestamp(String),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Request carried no usable session cookie")]
    MissingSession,

    #[error("No record for client {0}")]
    ClientNotFound(SessionToken),

    #[error("Record for client {token} is corrupt: {source}")]
    CorruptRecord {
        token: SessionToken,
        #[source]
        source: RecordError,
    },

    #[error("Invalid storage key {0:?}")]
    InvalidKey(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Redis(e) => {
                tracing::error!("Redis error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "An internal database error occurred".to_string())
            }
            AppError::Io(e) => {
                tracing::error!("I/O error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "An internal storage error occurred".to_string())
            }
            AppError::Task(e) => {
                tracing::error!("Storage task failed: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "An internal storage error occurred".to_string())
            }
            AppError::MissingSession | AppError::ClientNotFound(_) => {
                (StatusCode::NOT_FOUND, "No history for this client".to_string())
            }
            AppError::CorruptRecord { token, source } => {
                tracing::warn!(token = %token, error = %source, "Corrupt client record requested");
                (StatusCode::INTERNAL_SERVER_ERROR, "Client record is unreadable".to_string())
            }
            AppError::InvalidKey(key) => {
                tracing::error!(key = %key, "Refusing unsafe storage key");
                (StatusCode::INTERNAL_SERVER_ERROR, "An internal storage error occurred".to_string())
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
