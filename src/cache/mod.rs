//! Cache Module
//!
//! In-memory caching of derived images with TTL expiration and LRU eviction
//! bounded by both entry count and total byte size.

mod entry;
mod image_cache;
mod lru;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::CacheEntry;
pub use image_cache::{
    thumbnail_key, variant_key, CachedImage, ImageCache, ImageCacheStats, PopularImage,
    VariantSpec,
};
pub use lru::LruList;
pub use stats::{hit_rate_percent, CacheStats, CacheStatsSnapshot, HitCounter};
pub use store::{EntryInfo, LruCache};
