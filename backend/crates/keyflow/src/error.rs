//! Key-System Error Types
//!
//! This module provides key-flow-specific error variants that integrate
//! with the unified `kernel::error::AppError` system.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

/// Key-flow-specific result type alias
pub type KeyflowResult<T> = Result<T, KeyflowError>;

/// Key-flow-specific error variants
///
/// These are domain-specific errors that map to appropriate HTTP status codes
/// and can be converted to `AppError` for unified error handling.
#[derive(Debug, Error)]
pub enum KeyflowError {
    /// Required request fields are absent
    #[error("Missing {0}")]
    MissingField(&'static str),

    /// Checkpoint referenced by a callback or completion report does not exist
    #[error("Checkpoint not found")]
    CheckpointNotFound,

    /// Provider name outside the closed set
    #[error("Unknown provider")]
    UnknownProvider(String),

    /// Route provider does not match the checkpoint's stored provider
    #[error("Provider mismatch")]
    ProviderMismatch,

    /// Redirect callback carried no completion token
    #[error("Verification failed")]
    VerificationFailed,

    /// POST callback body missing checkpoint_id or session_token
    #[error("Invalid callback data")]
    InvalidCallback,

    /// Script has no checkpoints configured, so it is not completable
    #[error("No checkpoints configured for this script")]
    NoCheckpoints,

    /// Session has not completed every checkpoint of the script
    #[error("Not all checkpoints completed")]
    IncompleteFlow { completed: usize, total: usize },

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl KeyflowError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            KeyflowError::MissingField(_)
            | KeyflowError::UnknownProvider(_)
            | KeyflowError::ProviderMismatch
            | KeyflowError::InvalidCallback
            | KeyflowError::NoCheckpoints => StatusCode::BAD_REQUEST,
            KeyflowError::CheckpointNotFound => StatusCode::NOT_FOUND,
            KeyflowError::VerificationFailed | KeyflowError::IncompleteFlow { .. } => {
                StatusCode::FORBIDDEN
            }
            KeyflowError::Database(_) | KeyflowError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            KeyflowError::MissingField(_)
            | KeyflowError::UnknownProvider(_)
            | KeyflowError::ProviderMismatch
            | KeyflowError::InvalidCallback
            | KeyflowError::NoCheckpoints => ErrorKind::BadRequest,
            KeyflowError::CheckpointNotFound => ErrorKind::NotFound,
            KeyflowError::VerificationFailed | KeyflowError::IncompleteFlow { .. } => {
                ErrorKind::Forbidden
            }
            KeyflowError::Database(_) | KeyflowError::Internal(_) => ErrorKind::InternalServerError,
        }
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            KeyflowError::Database(e) => {
                tracing::error!(error = %e, "Key-flow database error");
            }
            KeyflowError::Internal(msg) => {
                tracing::error!(message = %msg, "Key-flow internal error");
            }
            KeyflowError::ProviderMismatch => {
                tracing::warn!("Callback provider mismatch");
            }
            KeyflowError::UnknownProvider(name) => {
                tracing::warn!(provider = %name, "Callback from unknown provider");
            }
            KeyflowError::VerificationFailed => {
                tracing::warn!("Callback verification failed");
            }
            _ => {
                tracing::debug!(error = %self, "Key-flow error");
            }
        }
    }
}

impl From<KeyflowError> for AppError {
    fn from(err: KeyflowError) -> Self {
        let kind = err.kind();
        let message = err.to_string();
        AppError::new(kind, message)
    }
}

impl IntoResponse for KeyflowError {
    fn into_response(self) -> Response {
        self.log();
        let status = self.status_code();
        // JSON error bodies; internal detail is never leaked
        let body = match &self {
            KeyflowError::IncompleteFlow { completed, total } => serde_json::json!({
                "error": self.to_string(),
                "completed": completed,
                "total": total,
            }),
            KeyflowError::Database(_) | KeyflowError::Internal(_) => serde_json::json!({
                "error": "Internal server error",
            }),
            _ => serde_json::json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<crate::domain::value_objects::UnknownProviderError> for KeyflowError {
    fn from(err: crate::domain::value_objects::UnknownProviderError) -> Self {
        KeyflowError::UnknownProvider(err.0)
    }
}
