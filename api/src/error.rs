use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use toolbelt_core::error::{self, ApiError};
use toolbelt_core::store::StoreError;

use crate::config::ConfigError;

/// Internal error type that converts to HTTP responses
#[derive(Debug)]
pub enum AppError {
    /// Malformed `/mcp` body (400). Rendered as a bare `{"error": "..."}`.
    Protocol(&'static str),
    /// Validation error (400)
    Validation {
        message: String,
        field: Option<String>,
        received: Option<serde_json::Value>,
    },
    /// Resource not found (404)
    NotFound { resource: String },
    /// Storage backend error (500)
    Store(StoreError),
    /// Config persistence error (500)
    Config(ConfigError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let request_id = uuid::Uuid::now_v7().to_string();

        let (status, api_error) = match self {
            AppError::Protocol(message) => {
                return (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response();
            }
            AppError::Validation {
                message,
                field,
                received,
            } => (
                StatusCode::BAD_REQUEST,
                ApiError {
                    error: error::codes::VALIDATION_FAILED.to_string(),
                    message,
                    field,
                    received,
                    request_id,
                },
            ),
            AppError::NotFound { resource } => (
                StatusCode::NOT_FOUND,
                ApiError {
                    error: error::codes::NOT_FOUND.to_string(),
                    message: format!("{resource} not found"),
                    field: None,
                    received: None,
                    request_id,
                },
            ),
            AppError::Store(err) => {
                tracing::error!(error = %err, request_id = %request_id, "store error");
                internal_error(request_id)
            }
            AppError::Config(err) => {
                tracing::error!(error = %err, request_id = %request_id, "config error");
                internal_error(request_id)
            }
        };

        (status, Json(api_error)).into_response()
    }
}

fn internal_error(request_id: String) -> (StatusCode, ApiError) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        ApiError {
            error: error::codes::INTERNAL_ERROR.to_string(),
            message: "An internal error occurred".to_string(),
            field: None,
            received: None,
            request_id,
        },
    )
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Store(err)
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}
