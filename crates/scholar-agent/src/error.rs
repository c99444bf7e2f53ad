//! Error types for the scholar pipeline

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Scholar pipeline errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A task with this id is already registered
    #[error("Task already exists: {0}")]
    DuplicateTask(String),

    /// Task not found
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    /// Paper not found
    #[error("Paper not found: {0}")]
    PaperNotFound(String),

    /// Invalid request payload
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A pipeline stage failed
    #[error("Stage '{stage}' failed: {message}")]
    StageExecution { stage: String, message: String },

    /// Text extraction error
    #[error("Failed to extract text from '{filename}': {message}")]
    Extraction { filename: String, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML config parse error
    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a stage execution error
    pub fn stage(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StageExecution {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Create an extraction error
    pub fn extraction(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Extraction {
            filename: filename.into(),
            message: message.into(),
        }
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_panic() {
            Error::Internal(format!("Background task panicked: {}", err))
        } else {
            Error::Internal(format!("Background task cancelled: {}", err))
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            Error::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error", msg.clone()),
            Error::DuplicateTask(id) => (
                StatusCode::CONFLICT,
                "duplicate_task",
                format!("Task already exists: {}", id),
            ),
            Error::TaskNotFound(id) => (
                StatusCode::NOT_FOUND,
                "not_found",
                format!("Task not found: {}", id),
            ),
            Error::PaperNotFound(id) => (
                StatusCode::NOT_FOUND,
                "not_found",
                format!("Paper not found: {}", id),
            ),
            Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            Error::StageExecution { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "stage_error",
                self.to_string(),
            ),
            Error::Extraction { .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "extraction_error",
                self.to_string(),
            ),
            Error::Io(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "io_error",
                err.to_string(),
            ),
            Error::Json(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "json_error",
                err.to_string(),
            ),
            Error::Toml(err) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error", err.to_string()),
            Error::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg.clone())
            }
        };

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_404() {
        let response = Error::TaskNotFound("abc".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = Error::PaperNotFound("p1".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_stage_error_message() {
        let err = Error::stage("parsing", "broken xref table");
        assert_eq!(err.to_string(), "Stage 'parsing' failed: broken xref table");
    }

    #[test]
    fn test_corrupt_catalogue_is_server_error() {
        let parse_err = serde_json::from_str::<Vec<String>>("[not json").unwrap_err();
        let response = Error::from(parse_err).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = Error::BadRequest("Unknown content kind".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
