//! Error types for CardForge services
//!
//! Provides a comprehensive error handling system with:
//! - Distinct error types for different failure modes
//! - HTTP status code mapping
//! - Structured error responses
//! - Error codes for client handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    MissingField,
    InvalidFormat,
    InvalidGrade,

    // Authentication errors (2xxx)
    Unauthorized,

    // Authorization errors (3xxx)
    Forbidden,

    // Resource errors (4xxx)
    NotFound,
    UploadNotFound,
    JobNotFound,
    DeckNotFound,
    CardNotFound,
    SuggestionNotFound,

    // Rate limiting (6xxx)
    RateLimited,

    // Database errors (7xxx)
    DatabaseError,
    ConnectionError,

    // Document / generation errors (8xxx)
    EmptyDocument,
    DocumentError,
    MalformedOutput,
    ModelError,
    ModelTimeout,
    StorageError,
    WorkerUnreachable,
    WorkerError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Validation (1xxx)
            ErrorCode::ValidationError => 1001,
            ErrorCode::MissingField => 1002,
            ErrorCode::InvalidFormat => 1003,
            ErrorCode::InvalidGrade => 1004,

            // Auth (2xxx)
            ErrorCode::Unauthorized => 2001,

            // Authz (3xxx)
            ErrorCode::Forbidden => 3001,

            // Resources (4xxx)
            ErrorCode::NotFound => 4001,
            ErrorCode::UploadNotFound => 4002,
            ErrorCode::JobNotFound => 4003,
            ErrorCode::DeckNotFound => 4004,
            ErrorCode::CardNotFound => 4005,
            ErrorCode::SuggestionNotFound => 4006,

            // Rate limits (6xxx)
            ErrorCode::RateLimited => 6001,

            // Database (7xxx)
            ErrorCode::DatabaseError => 7001,
            ErrorCode::ConnectionError => 7002,

            // Document / generation (8xxx)
            ErrorCode::EmptyDocument => 8001,
            ErrorCode::DocumentError => 8002,
            ErrorCode::MalformedOutput => 8003,
            ErrorCode::ModelError => 8004,
            ErrorCode::ModelTimeout => 8005,
            ErrorCode::StorageError => 8006,
            ErrorCode::WorkerUnreachable => 8007,
            ErrorCode::WorkerError => 8008,

            // Internal (9xxx)
            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Required field missing: {field}")]
    MissingField { field: String },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    #[error("Invalid review grade: {grade} (expected 1-4)")]
    InvalidGrade { grade: i64 },

    // Authentication errors
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    // Authorization errors
    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    // Resource errors
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound { resource_type: String, id: String },

    #[error("Upload not found: {id}")]
    UploadNotFound { id: String },

    #[error("Generation job not found for upload: {id}")]
    JobNotFound { id: String },

    #[error("Deck not found: {id}")]
    DeckNotFound { id: String },

    #[error("Card not found: {id}")]
    CardNotFound { id: String },

    #[error("Suggestion not found: {id}")]
    SuggestionNotFound { id: String },

    // Rate limiting
    #[error("Rate limit exceeded: {limit} requests per second")]
    RateLimited { limit: u32 },

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    // Document / generation errors
    #[error("No text could be extracted from the document: {message}")]
    EmptyDocument { message: String },

    #[error("Document error: {message}")]
    Document { message: String },

    #[error("Model returned output that is not valid JSON: {message}")]
    MalformedOutput { message: String },

    #[error("Model backend error: {message}")]
    Model { message: String },

    #[error("Model backend timed out after {timeout_ms}ms")]
    ModelTimeout { timeout_ms: u64 },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Cannot reach worker at {endpoint}: {message}")]
    WorkerUnreachable { endpoint: String, message: String },

    #[error("Worker error {status}: {body}")]
    Worker { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::MissingField { .. } => ErrorCode::MissingField,
            AppError::InvalidFormat { .. } => ErrorCode::InvalidFormat,
            AppError::InvalidGrade { .. } => ErrorCode::InvalidGrade,
            AppError::Unauthorized { .. } => ErrorCode::Unauthorized,
            AppError::Forbidden { .. } => ErrorCode::Forbidden,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::UploadNotFound { .. } => ErrorCode::UploadNotFound,
            AppError::JobNotFound { .. } => ErrorCode::JobNotFound,
            AppError::DeckNotFound { .. } => ErrorCode::DeckNotFound,
            AppError::CardNotFound { .. } => ErrorCode::CardNotFound,
            AppError::SuggestionNotFound { .. } => ErrorCode::SuggestionNotFound,
            AppError::RateLimited { .. } => ErrorCode::RateLimited,
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::DatabaseConnection { .. } => ErrorCode::ConnectionError,
            AppError::EmptyDocument { .. } => ErrorCode::EmptyDocument,
            AppError::Document { .. } => ErrorCode::DocumentError,
            AppError::MalformedOutput { .. } => ErrorCode::MalformedOutput,
            AppError::Model { .. } => ErrorCode::ModelError,
            AppError::ModelTimeout { .. } => ErrorCode::ModelTimeout,
            AppError::Storage { .. } => ErrorCode::StorageError,
            AppError::WorkerUnreachable { .. } => ErrorCode::WorkerUnreachable,
            AppError::Worker { .. } => ErrorCode::WorkerError,
            AppError::HttpClient(_) => ErrorCode::ModelError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. }
            | AppError::MissingField { .. }
            | AppError::InvalidFormat { .. }
            | AppError::InvalidGrade { .. } => StatusCode::BAD_REQUEST,

            // 401 Unauthorized
            AppError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,

            // 403 Forbidden
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,

            // 404 Not Found
            AppError::NotFound { .. }
            | AppError::UploadNotFound { .. }
            | AppError::JobNotFound { .. }
            | AppError::DeckNotFound { .. }
            | AppError::CardNotFound { .. }
            | AppError::SuggestionNotFound { .. } => StatusCode::NOT_FOUND,

            // 422 Unprocessable Entity
            AppError::EmptyDocument { .. } | AppError::Document { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }

            // 429 Too Many Requests
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,

            // 500 Internal Server Error
            AppError::Database(_)
            | AppError::DatabaseConnection { .. }
            | AppError::Internal { .. }
            | AppError::Configuration { .. }
            | AppError::Serialization(_)
            | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // 502 Bad Gateway
            AppError::MalformedOutput { .. }
            | AppError::Model { .. }
            | AppError::ModelTimeout { .. }
            | AppError::Storage { .. }
            | AppError::WorkerUnreachable { .. }
            | AppError::Worker { .. }
            | AppError::HttpClient(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        // Log based on severity
        if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message,
                details: None,
                request_id: None, // Should be filled by middleware
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::UploadNotFound { id: "test".into() };
        assert_eq!(err.code(), ErrorCode::UploadNotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_forbidden_maps_to_403() {
        let err = AppError::Forbidden {
            message: "bad callback secret".into(),
        };
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert!(err.is_client_error());
    }

    #[test]
    fn test_worker_unreachable_is_bad_gateway() {
        let err = AppError::WorkerUnreachable {
            endpoint: "http://worker:9000".into(),
            message: "connection refused".into(),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.code(), ErrorCode::WorkerUnreachable);
        assert!(err.to_string().contains("http://worker:9000"));
    }

    #[test]
    fn test_malformed_output_is_typed() {
        let err = AppError::MalformedOutput {
            message: "expected value at line 1".into(),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.code(), ErrorCode::MalformedOutput);
    }

    #[test]
    fn test_server_error() {
        let err = AppError::Internal {
            message: "Something went wrong".into(),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.is_server_error());
    }
}
