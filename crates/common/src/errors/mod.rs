//! Error types for PaperLens services
//!
//! Provides a comprehensive error handling system with:
//! - Distinct error types for each upstream collaborator (embedder, store, reranker)
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
    InvalidFormat,

    // Resource errors (4xxx)
    NotFound,
    DocumentNotFound,

    // Rate limiting (6xxx)
    RateLimited,

    // Database errors (7xxx)
    ConnectionError,

    // External service errors (8xxx)
    UpstreamError,
    EmbeddingError,
    RetrievalError,
    RerankError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,

    // Service unavailable
    ServiceUnavailable,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::ValidationError => 1001,
            ErrorCode::InvalidFormat => 1003,

            ErrorCode::NotFound => 4001,
            ErrorCode::DocumentNotFound => 4002,

            ErrorCode::RateLimited => 6001,

            ErrorCode::ConnectionError => 7002,

            ErrorCode::UpstreamError => 8001,
            ErrorCode::EmbeddingError => 8002,
            ErrorCode::RetrievalError => 8007,
            ErrorCode::RerankError => 8008,

            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,

            ErrorCode::ServiceUnavailable => 9999,
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

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    // Resource errors
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound { resource_type: String, id: String },

    #[error("Document not found: {id}")]
    DocumentNotFound { id: String },

    // Rate limiting
    #[error("Rate limit exceeded: {limit} requests per second")]
    RateLimited { limit: u32 },

    // Database errors
    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    // Upstream collaborator errors
    #[error("Embedding service error: {message}")]
    EmbeddingError { message: String },

    #[error("Retrieval error: {message}")]
    RetrievalError { message: String },

    #[error("Rerank error: {message}")]
    RerankError { message: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Service unavailable: {message}")]
    ServiceUnavailable { message: String },

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::InvalidFormat { .. } => ErrorCode::InvalidFormat,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::DocumentNotFound { .. } => ErrorCode::DocumentNotFound,
            AppError::RateLimited { .. } => ErrorCode::RateLimited,
            AppError::DatabaseConnection { .. } => ErrorCode::ConnectionError,
            AppError::EmbeddingError { .. } => ErrorCode::EmbeddingError,
            AppError::RetrievalError { .. } => ErrorCode::RetrievalError,
            AppError::RerankError { .. } => ErrorCode::RerankError,
            AppError::HttpClient(_) => ErrorCode::UpstreamError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::ServiceUnavailable { .. } => ErrorCode::ServiceUnavailable,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. } | AppError::InvalidFormat { .. } => {
                StatusCode::BAD_REQUEST
            }

            // 404 Not Found
            AppError::NotFound { .. } | AppError::DocumentNotFound { .. } => {
                StatusCode::NOT_FOUND
            }

            // 429 Too Many Requests
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,

            // 500 Internal Server Error
            AppError::DatabaseConnection { .. }
            | AppError::Internal { .. }
            | AppError::Configuration { .. }
            | AppError::Serialization(_)
            | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // 502 Bad Gateway
            AppError::EmbeddingError { .. }
            | AppError::RetrievalError { .. }
            | AppError::RerankError { .. }
            | AppError::HttpClient(_) => StatusCode::BAD_GATEWAY,

            // 503 Service Unavailable
            AppError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
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

    /// Re-tag a failure raised while embedding.
    ///
    /// Errors that already belong to the embedding taxonomy pass through untouched.
    pub fn into_embedding_error(self) -> Self {
        match self {
            err @ AppError::EmbeddingError { .. } => err,
            other => AppError::EmbeddingError {
                message: other.to_string(),
            },
        }
    }

    /// Re-tag a failure raised by the document store.
    ///
    /// `DocumentNotFound` is kept as is so it still surfaces as a 404.
    pub fn into_retrieval_error(self) -> Self {
        match self {
            err @ (AppError::RetrievalError { .. } | AppError::DocumentNotFound { .. }) => err,
            other => AppError::RetrievalError {
                message: other.to_string(),
            },
        }
    }

    /// Re-tag a failure raised by the reranker.
    pub fn into_rerank_error(self) -> Self {
        match self {
            err @ AppError::RerankError { .. } => err,
            other => AppError::RerankError {
                message: other.to_string(),
            },
        }
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

        let details = match &self {
            AppError::Validation {
                field: Some(field), ..
            } => Some(serde_json::json!({ "field": field })),
            _ => None,
        };

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message,
                details,
                request_id: None, // Filled by the request-id layer header, not the body
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

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal {
            message: format!("worker task failed: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::DocumentNotFound { id: "oai:arXiv.org:2408.00001".into() };
        assert_eq!(err.code(), ErrorCode::DocumentNotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert!(err.is_client_error());
    }

    #[test]
    fn test_upstream_errors_are_server_errors() {
        let errors = [
            AppError::EmbeddingError { message: "model offline".into() },
            AppError::RetrievalError { message: "store offline".into() },
            AppError::RerankError { message: "ranker offline".into() },
        ];
        for err in errors {
            assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
            assert!(err.is_server_error());
        }
    }

    #[test]
    fn test_validation_error() {
        let err = AppError::Validation {
            message: "Invalid date".into(),
            field: Some("filter_start_date".into()),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!err.is_server_error());
        assert!(err.is_client_error());
    }

    #[test]
    fn test_retag_does_not_double_wrap() {
        let err = AppError::EmbeddingError { message: "boom".into() }.into_embedding_error();
        assert_eq!(err.to_string(), "Embedding service error: boom");

        let err = AppError::Internal { message: "boom".into() }.into_retrieval_error();
        assert_eq!(err.code(), ErrorCode::RetrievalError);
        assert!(err.to_string().contains("Internal server error: boom"));
    }

    #[test]
    fn test_not_found_survives_retrieval_retag() {
        let err = AppError::DocumentNotFound { id: "x".into() }.into_retrieval_error();
        assert_eq!(err.code(), ErrorCode::DocumentNotFound);
    }

    #[test]
    fn test_rerank_retag() {
        let err = AppError::Serialization(serde_json::from_str::<u32>("nope").unwrap_err())
            .into_rerank_error();
        assert_eq!(err.code(), ErrorCode::RerankError);
    }
}
