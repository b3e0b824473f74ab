//! API Routes
//!
//! Configures the Axum router with all image server endpoints.

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    cache_stats_handler, cleanup_temp_handler, clear_cache_handler, delete_image_handler,
    health_handler, invalidate_handler, popular_handler, storage_info_handler, thumbnail_handler,
    upload_handler, variant_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Middleware
/// - Body limit: one byte over the storage maximum, so an oversized upload
///   still reaches validation and gets a 400 instead of a bare 413
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = usize::try_from(state.service.storage().max_file_size())
        .unwrap_or(usize::MAX)
        .saturating_add(1);

    Router::new()
        .route("/images/:file_name", put(upload_handler).delete(delete_image_handler))
        .route("/images/:file_name/thumbnail", get(thumbnail_handler))
        .route("/images/:file_name/variant", get(variant_handler))
        .route("/cache", delete(clear_cache_handler))
        .route("/cache/stats", get(cache_stats_handler))
        .route("/cache/popular", get(popular_handler))
        .route("/cache/images/:image_id", delete(invalidate_handler))
        .route("/storage/info", get(storage_info_handler))
        .route("/storage/cleanup-temp", post(cleanup_temp_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, StorageConfig};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tempfile::TempDir;
    use tower::util::ServiceExt;

    fn create_test_app() -> (TempDir, Router) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            storage: StorageConfig {
                base_path: dir.path().to_path_buf(),
                ..StorageConfig::default()
            },
            ..Config::default()
        };
        let state = AppState::from_config(&config).unwrap();
        (dir, create_router(state))
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (_dir, app) = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_cache_stats_endpoint() {
        let (_dir, app) = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/cache/stats")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_upload_rejects_garbage() {
        let (_dir, app) = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/images/notes.jpg")
                    .body(Body::from("definitely not an image"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_thumbnail_not_found() {
        let (_dir, app) = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/images/nonexistent.jpg/thumbnail")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
