/// Error types for Post Service
///
/// Every failure a saga can produce maps to exactly one variant, and every
/// variant maps to exactly one HTTP status.
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde::Serialize;
use thiserror::Error;

/// Result type for post-service operations
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or malformed required field
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Entity absent, or a reference that does not match
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller is not the owning/authoring user
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Duplicate relationship (e.g. second repost of the same post)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Missing or invalid caller credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Media store rejected or failed an upload
    #[error("Upload error: {0}")]
    UploadError(String),

    /// Repository operation failed
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Anything else
    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    status: u16,
}

impl AppError {
    /// Human-readable message shown to API clients.
    pub fn message(&self) -> &str {
        match self {
            AppError::ValidationError(msg)
            | AppError::NotFound(msg)
            | AppError::Forbidden(msg)
            | AppError::Conflict(msg)
            | AppError::Unauthorized(msg) => msg,
            AppError::UploadError(_) => "Error while uploading media",
            AppError::DatabaseError(_) | AppError::Internal(_) => "Internal server error",
        }
    }

    /// Underlying failure detail, only for kinds that wrap another failure.
    fn detail(&self) -> Option<String> {
        match self {
            AppError::UploadError(msg) | AppError::DatabaseError(msg) | AppError::Internal(msg) => {
                Some(msg.clone())
            }
            _ => None,
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::UploadError(_) => StatusCode::BAD_GATEWAY,
            AppError::DatabaseError(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        HttpResponse::build(status).json(ErrorBody {
            message: self.message(),
            error: self.detail(),
            status: status.as_u16(),
        })
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::UploadError(err.to_string())
    }
}
