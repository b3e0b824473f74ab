//! Error types for the image pipeline
//!
//! Provides unified error handling using thiserror. Components only classify
//! failures; the HTTP layer turns the classification into a status code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Image Error Enum ==
/// Unified error type for storage, processing and caching.
#[derive(Error, Debug)]
pub enum ImageError {
    /// Empty or oversized input, invalid dimensions/quality/format, invalid path
    #[error("Validation error: {0}")]
    Validation(String),

    /// Absolute path or traversal attempt
    #[error("Security error: {0}")]
    Security(String),

    /// Decode or encode failure
    #[error("Processing error: {0}")]
    Processing(String),

    /// Filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing cache entry or file
    #[error("Not found: {0}")]
    NotFound(String),
}

impl ImageError {
    /// Returns true when the failure was caused by the caller's input.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ImageError::Validation(_) | ImageError::Security(_) | ImageError::NotFound(_)
        )
    }
}

impl From<image::ImageError> for ImageError {
    fn from(err: image::ImageError) -> Self {
        ImageError::Processing(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for ImageError {
    fn into_response(self) -> Response {
        let status = match &self {
            ImageError::Validation(_) | ImageError::Security(_) => StatusCode::BAD_REQUEST,
            ImageError::NotFound(_) => StatusCode::NOT_FOUND,
            ImageError::Processing(_) | ImageError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the image pipeline.
pub type Result<T> = std::result::Result<T, ImageError>;
