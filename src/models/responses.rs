//! Response DTOs for the image API
//!
//! JSON bodies for the non-image endpoints. Uploads, statistics and storage
//! info serialize their domain types directly.

use serde::Serialize;

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Whether the rendition cache is enabled
    pub cache_enabled: bool,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy(cache_enabled: bool) -> Self {
        Self {
            status: "healthy".to_string(),
            cache_enabled,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Response body for DELETE /images/:file_name
#[derive(Debug, Clone, Serialize)]
pub struct DeleteImageResponse {
    pub message: String,
    pub file_name: String,
    /// Cached renditions dropped along with the original
    pub invalidated: usize,
}

impl DeleteImageResponse {
    pub fn new(file_name: impl Into<String>, invalidated: usize) -> Self {
        let file_name = file_name.into();
        Self {
            message: format!("Image '{}' deleted successfully", file_name),
            file_name,
            invalidated,
        }
    }
}

/// Response body for DELETE /cache/images/:image_id
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    pub image_id: String,
    pub removed: usize,
}

impl InvalidateResponse {
    pub fn new(image_id: impl Into<String>, removed: usize) -> Self {
        Self {
            image_id: image_id.into(),
            removed,
        }
    }
}

/// Response body for DELETE /cache
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    pub message: String,
}

impl ClearResponse {
    pub fn cleared() -> Self {
        Self {
            message: "Cache cleared".to_string(),
        }
    }
}
