//! API Handlers
//!
//! HTTP request handlers for each image server endpoint. Handlers stay thin:
//! they extract parameters, call the service and shape the response.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};

use crate::cache::{CachedImage, ImageCacheStats, PopularImage};
use crate::config::Config;
use crate::error::{ImageError, Result};
use crate::models::{
    ClearResponse, CleanupQuery, DeleteImageResponse, HealthResponse, InvalidateResponse,
    PopularQuery, ThumbnailQuery, VariantQuery,
};
use crate::service::{ImageService, UploadedImage};
use crate::storage::{StorageInfo, TempCleanupReport};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ImageService>,
    /// Fallback age for POST /storage/cleanup-temp
    pub temp_max_age: Duration,
}

impl AppState {
    /// Creates a new AppState around an existing service.
    pub fn new(service: Arc<ImageService>, temp_max_age: Duration) -> Self {
        Self {
            service,
            temp_max_age,
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Fails when the storage root cannot be created.
    pub fn from_config(config: &Config) -> Result<Self> {
        let service = ImageService::from_config(config)?;
        Ok(Self::new(Arc::new(service), config.temp_max_age))
    }
}

fn image_response(image: CachedImage) -> Response {
    ([(header::CONTENT_TYPE, image.content_type)], image.data).into_response()
}

/// Handler for PUT /images/:file_name
///
/// Body is the raw image bytes.
pub async fn upload_handler(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
    body: Bytes,
) -> Result<Json<UploadedImage>> {
    let uploaded = state.service.upload(body.to_vec(), &file_name).await?;
    Ok(Json(uploaded))
}

/// Handler for GET /images/:file_name/thumbnail
pub async fn thumbnail_handler(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
    Query(query): Query<ThumbnailQuery>,
) -> Result<Response> {
    let image = state.service.thumbnail(&file_name, query.size).await?;
    Ok(image_response(image))
}

/// Handler for GET /images/:file_name/variant
pub async fn variant_handler(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
    Query(query): Query<VariantQuery>,
) -> Result<Response> {
    if let Some(error_msg) = query.validate() {
        return Err(ImageError::Validation(error_msg));
    }

    let image = state.service.variant(&file_name, query.into()).await?;
    Ok(image_response(image))
}

/// Handler for DELETE /images/:file_name
///
/// Deletes the original and invalidates its cached renditions.
pub async fn delete_image_handler(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
) -> Result<Json<DeleteImageResponse>> {
    let invalidated = state.service.delete(&file_name).await?;
    Ok(Json(DeleteImageResponse::new(file_name, invalidated)))
}

/// Handler for GET /cache/stats
pub async fn cache_stats_handler(State(state): State<AppState>) -> Json<ImageCacheStats> {
    Json(state.service.cache().stats())
}

/// Handler for GET /cache/popular
pub async fn popular_handler(
    State(state): State<AppState>,
    Query(query): Query<PopularQuery>,
) -> Json<Vec<PopularImage>> {
    Json(state.service.cache().popular_images(query.limit))
}

/// Handler for DELETE /cache
pub async fn clear_cache_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    state.service.cache().clear();
    Json(ClearResponse::cleared())
}

/// Handler for DELETE /cache/images/:image_id
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Path(image_id): Path<String>,
) -> Json<InvalidateResponse> {
    let removed = state.service.cache().invalidate_image(&image_id);
    Json(InvalidateResponse::new(image_id, removed))
}

/// Handler for GET /storage/info
pub async fn storage_info_handler(State(state): State<AppState>) -> Result<Json<StorageInfo>> {
    Ok(Json(state.service.storage_info().await?))
}

/// Handler for POST /storage/cleanup-temp
pub async fn cleanup_temp_handler(
    State(state): State<AppState>,
    Query(query): Query<CleanupQuery>,
) -> Result<Json<TempCleanupReport>> {
    let older_than = query.older_than(state.temp_max_age);
    Ok(Json(state.service.cleanup_temp(older_than).await?))
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.service.cache().is_enabled()))
}
