use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message returned for any internal failure; details only go to the log.
pub const INFERENCE_ERROR_MESSAGE: &str = "An error occurred while processing your query";

/// JSON body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error kind (`ValidationError` or `InferenceError`).
    pub error: String,
    /// Human-readable detail.
    pub message: String,
    /// Unix time in seconds.
    pub timestamp: f64,
}

/// Errors surfaced by the HTTP layer.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request body was malformed or out of range.
    #[error("{0}")]
    Validation(String),

    /// The pipeline failed; the cause is logged, not returned.
    #[error("Inference failed: {0}")]
    Inference(#[from] ragserve_core::RagError),
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match &self {
            ApiError::Validation(message) => ErrorResponse {
                error: "ValidationError".to_string(),
                message: message.clone(),
                timestamp: crate::server::unix_timestamp(),
            },
            ApiError::Inference(_) => ErrorResponse {
                error: "InferenceError".to_string(),
                message: INFERENCE_ERROR_MESSAGE.to_string(),
                timestamp: crate::server::unix_timestamp(),
            },
        };
        (self.status(), Json(body)).into_response()
    }
}
