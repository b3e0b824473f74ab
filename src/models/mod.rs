//! Request and Response models for the image API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! deserializing query strings and serializing JSON response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{CleanupQuery, PopularQuery, ThumbnailQuery, VariantQuery};
pub use responses::{ClearResponse, DeleteImageResponse, HealthResponse, InvalidateResponse};
