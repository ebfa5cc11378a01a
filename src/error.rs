//! Domain-specific error types for startup-evaluator

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::profile::ValidationError;

/// Main error type for the evaluation service
#[derive(Error, Debug)]
pub enum EvaluatorError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Generation error: {message}")]
    Generation { message: String },

    #[error("Timeout error: {operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("I/O error: {message}")]
    Io { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl EvaluatorError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            EvaluatorError::Validation(_) | EvaluatorError::InvalidRequest { .. } => {
                StatusCode::BAD_REQUEST
            }
            EvaluatorError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            EvaluatorError::Validation(_) => "Validation error",
            EvaluatorError::InvalidRequest { .. } => "Invalid request",
            EvaluatorError::Generation { .. } => "Generation error",
            EvaluatorError::Timeout { .. } => "Operation timeout",
            EvaluatorError::Config { .. } => "Configuration error",
            EvaluatorError::Serialization { .. } => "Serialization error",
            EvaluatorError::Io { .. } => "I/O error",
            EvaluatorError::Internal { .. } => "Internal error",
        }
    }

    fn details(&self) -> String {
        match self {
            EvaluatorError::Validation(e) => e.to_string(),
            EvaluatorError::InvalidRequest { message }
            | EvaluatorError::Generation { message }
            | EvaluatorError::Config { message }
            | EvaluatorError::Serialization { message }
            | EvaluatorError::Io { message }
            | EvaluatorError::Internal { message } => message.clone(),
            EvaluatorError::Timeout {
                operation,
                timeout_ms,
            } => format!("{operation} timed out after {timeout_ms}ms"),
        }
    }
}

impl From<anyhow::Error> for EvaluatorError {
    fn from(err: anyhow::Error) -> Self {
        EvaluatorError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for EvaluatorError {
    fn from(err: serde_json::Error) -> Self {
        EvaluatorError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for EvaluatorError {
    fn from(err: std::io::Error) -> Self {
        EvaluatorError::Io {
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for EvaluatorError {
    fn from(err: toml::de::Error) -> Self {
        EvaluatorError::Config {
            message: err.to_string(),
        }
    }
}

/// Convert EvaluatorError to an HTTP error response
impl IntoResponse for EvaluatorError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let details = self.details();
        let body = json!({
            "error": {
                "code": status.as_u16(),
                "message": format!("{}: {}", self.label(), details),
                "details": details,
            }
        });
        (status, axum::Json(body)).into_response()
    }
}

/// Result type alias for evaluator operations
pub type Result<T> = std::result::Result<T, EvaluatorError>;
