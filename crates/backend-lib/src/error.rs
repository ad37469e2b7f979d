// crates/backend-lib/src/error.rs

//! Central error type + Axum integration.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Application error types with error codes and context
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate key: {field} already registered")]
    DuplicateKey { field: &'static str },

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Provider authentication failed: {0}")]
    ProviderAuthFailed(String),

    #[error("Password hashing failed: {0}")]
    HashingFailed(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Invalid session")]
    InvalidSession,

    #[error("Authentication rate limit exceeded")]
    AuthRateLimited,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidCredentials | AppError::InvalidSession => StatusCode::UNAUTHORIZED,
            AppError::ProviderAuthFailed(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DuplicateKey { .. } => StatusCode::CONFLICT,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::AuthRateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::InvalidCredentials => "AUTH_001",
            AppError::InvalidSession => "AUTH_002",
            AppError::AuthRateLimited => "AUTH_003",
            AppError::ProviderAuthFailed(_) => "AUTH_004",
            AppError::HashingFailed(_) => "AUTH_005",
            AppError::NotFound(_) => "NF_001",
            AppError::DuplicateKey { .. } => "DUP_001",
            AppError::StorageUnavailable(_) => "STORE_001",
            AppError::Io(_) => "IO_001",
            AppError::Json(_) => "JSON_001",
            AppError::InvalidInput(_) => "VAL_001",
            AppError::Internal(_) => "INT_001",
        }
    }

    /// Get a sanitized message suitable for production use
    pub fn sanitized_message(&self) -> String {
        match self {
            // Unknown account and wrong password must be indistinguishable
            AppError::InvalidCredentials | AppError::NotFound(_) => {
                "Authentication failed".to_string()
            },
            AppError::InvalidSession => "Authentication required".to_string(),
            AppError::ProviderAuthFailed(_) => "Authentication failed".to_string(),
            AppError::AuthRateLimited => {
                "Too many authentication attempts, please try again later".to_string()
            },
            AppError::DuplicateKey { .. } => "Account already exists".to_string(),
            AppError::StorageUnavailable(_) => "Service temporarily unavailable".to_string(),
            AppError::InvalidInput(_) => "Invalid input provided".to_string(),
            AppError::HashingFailed(_)
            | AppError::Io(_)
            | AppError::Json(_)
            | AppError::Internal(_) => "An internal server error occurred".to_string(),
        }
    }

    /// Whether this failure belongs to the caller (bad input, bad credentials)
    /// rather than to the service
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();

        if self.is_client_error() {
            tracing::debug!(code = error_code, error = %self, "request rejected");
        } else {
            tracing::error!(code = error_code, error = %self, "request failed");
        }

        // Use detailed messages in development, sanitized in production
        let message = if cfg!(debug_assertions) {
            self.to_string()
        } else {
            self.sanitized_message()
        };

        let body = serde_json::json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        });

        (status, axum::Json(body)).into_response()
    }
}
