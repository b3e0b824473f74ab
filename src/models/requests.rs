//! Query DTOs for the image API
//!
//! Defines the query strings accepted by the rendition and maintenance
//! endpoints. Missing parameters fall back to server-side defaults.

use std::time::Duration;

use serde::Deserialize;

use crate::cache::VariantSpec;

/// Default number of rows returned by GET /cache/popular
pub const DEFAULT_POPULAR_LIMIT: usize = 10;

/// Query for GET /images/:file_name/thumbnail
///
/// `size` of 0 (or absent) selects the first configured thumbnail size.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThumbnailQuery {
    #[serde(default)]
    pub size: u32,
}

/// Query for GET /images/:file_name/variant
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VariantQuery {
    pub width: u32,
    pub height: u32,
    /// 0 means the processor's default quality
    #[serde(default)]
    pub quality: u8,
    /// Empty means jpg
    #[serde(default)]
    pub format: String,
}

impl VariantQuery {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.width == 0 || self.height == 0 {
            return Some("width and height must be positive".to_string());
        }
        if self.quality > 100 {
            return Some("quality must be between 1 and 100".to_string());
        }
        None
    }
}

impl From<VariantQuery> for VariantSpec {
    fn from(q: VariantQuery) -> Self {
        VariantSpec {
            width: q.width,
            height: q.height,
            quality: q.quality,
            format: q.format,
        }
    }
}

/// Query for GET /cache/popular
#[derive(Debug, Clone, Deserialize)]
pub struct PopularQuery {
    #[serde(default = "default_popular_limit")]
    pub limit: usize,
}

fn default_popular_limit() -> usize {
    DEFAULT_POPULAR_LIMIT
}

impl Default for PopularQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_POPULAR_LIMIT,
        }
    }
}

/// Query for POST /storage/cleanup-temp
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CleanupQuery {
    /// Age threshold in seconds; the configured maximum age when absent
    #[serde(default)]
    pub older_than_secs: Option<u64>,
}

impl CleanupQuery {
    pub fn older_than(&self, fallback: Duration) -> Duration {
        self.older_than_secs
            .map(Duration::from_secs)
            .unwrap_or(fallback)
    }
}
