//! API Module
//!
//! HTTP handlers and routing for the image server REST API.
//!
//! # Endpoints
//! - `PUT /images/:file_name` - Upload an original (raw body)
//! - `DELETE /images/:file_name` - Delete an original and its renditions
//! - `GET /images/:file_name/thumbnail?size=N` - Serve a thumbnail
//! - `GET /images/:file_name/variant?width=&height=&quality=&format=` - Serve a variant
//! - `GET /cache/stats` - Cache statistics
//! - `GET /cache/popular?limit=N` - Most accessed renditions
//! - `DELETE /cache` - Clear the cache
//! - `DELETE /cache/images/:image_id` - Invalidate one image's renditions
//! - `GET /storage/info` - Storage diagnostics
//! - `POST /storage/cleanup-temp?older_than_secs=N` - Sweep temp files
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
