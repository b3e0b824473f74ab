//! Listing Images - image asset pipeline for property listings
//!
//! Stores uploaded originals on disk, renders thumbnails and variants on
//! demand, and keeps the rendered bytes in a bounded LRU cache with TTL.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod processing;
pub mod service;
pub mod storage;
pub mod tasks;

pub use api::{create_router, AppState};
pub use cache::{ImageCache, LruCache};
pub use config::Config;
pub use error::{ImageError, Result};
pub use processing::ImageProcessor;
pub use service::ImageService;
pub use storage::ImageStorage;
pub use tasks::{spawn_cache_sweeper, spawn_temp_cleanup};
