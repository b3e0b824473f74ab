//! Image Cache Module
//!
//! Domain wrapper over the LRU core: deterministic thumbnail and variant
//! keys, per-image invalidation and per-category hit/miss statistics.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::cache::{hit_rate_percent, HitCounter, LruCache};
use crate::config::ImageCacheConfig;

// == Key Schemes ==
/// Cache key of a square thumbnail: `{image_id}_thumbnail_{size}`.
pub fn thumbnail_key(image_id: &str, size: u32) -> String {
    format!("{image_id}_thumbnail_{size}")
}

/// Cache key of a variant: `{image_id}_variant_{w}x{h}_q{quality}_{format}`.
pub fn variant_key(image_id: &str, width: u32, height: u32, quality: u8, format: &str) -> String {
    format!("{image_id}_variant_{width}x{height}_q{quality}_{format}")
}

/// Requested rendition of an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantSpec {
    pub width: u32,
    pub height: u32,
    pub quality: u8,
    pub format: String,
}

impl VariantSpec {
    pub fn key_for(&self, image_id: &str) -> String {
        variant_key(image_id, self.width, self.height, self.quality, &self.format)
    }
}

/// Cached payload plus the content type it should be served with.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedImage {
    pub data: Bytes,
    pub content_type: String,
}

/// Cache statistics. All zero when caching is disabled.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImageCacheStats {
    pub entries: usize,
    pub total_size: u64,
    pub max_size_bytes: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub thumbnail_hits: u64,
    pub thumbnail_misses: u64,
    pub thumbnail_hit_rate: f64,
    pub variant_hits: u64,
    pub variant_misses: u64,
    pub variant_hit_rate: f64,
    /// Combined rate over thumbnails and variants
    pub hit_rate: f64,
}

/// One row of the popularity report.
#[derive(Debug, Clone, Serialize)]
pub struct PopularImage {
    pub key: String,
    pub access_count: u64,
    pub size: u64,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    /// Seconds until the entry expires
    pub expires_in_secs: u64,
}

// == Image Cache ==
/// In-memory cache of derived image bytes.
///
/// With `enabled = false` no LRU is allocated: writes are dropped, reads
/// miss and statistics stay zero, so callers can use one code path either way.
#[derive(Debug)]
pub struct ImageCache {
    lru: Option<LruCache<String, CachedImage>>,
    config: ImageCacheConfig,
    thumbnails: HitCounter,
    variants: HitCounter,
}

impl ImageCache {
    pub fn new(config: ImageCacheConfig) -> Self {
        let lru = config
            .enabled
            .then(|| LruCache::new(config.capacity, config.max_size_bytes, config.ttl));

        if lru.is_some() {
            info!(
                capacity = config.capacity,
                max_size_bytes = config.max_size_bytes,
                ttl_secs = config.ttl.as_secs(),
                "image cache enabled"
            );
        } else {
            info!("image cache disabled");
        }

        Self {
            lru,
            config,
            thumbnails: HitCounter::new(),
            variants: HitCounter::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.lru.is_some()
    }

    pub fn config(&self) -> &ImageCacheConfig {
        &self.config
    }

    // == Plain Get/Set ==
    /// Stores bytes under a caller-supplied key. Empty payloads are ignored.
    pub fn set(&self, key: &str, data: impl Into<Bytes>, content_type: &str) {
        let Some(lru) = &self.lru else {
            return;
        };
        let data = data.into();
        if data.is_empty() {
            debug!(key, "refusing to cache empty payload");
            return;
        }

        let size = data.len() as u64;
        lru.put(
            key.to_string(),
            CachedImage {
                data,
                content_type: content_type.to_string(),
            },
            size,
        );
    }

    pub fn get(&self, key: &str) -> Option<CachedImage> {
        self.lru.as_ref()?.get(&key.to_string())
    }

    // == Thumbnails ==
    pub fn set_thumbnail(&self, image_id: &str, size: u32, data: impl Into<Bytes>, content_type: &str) {
        self.set(&thumbnail_key(image_id, size), data, content_type);
    }

    pub fn get_thumbnail(&self, image_id: &str, size: u32) -> Option<CachedImage> {
        self.lru.as_ref()?;
        let hit = self.get(&thumbnail_key(image_id, size));
        record(&self.thumbnails, hit.is_some());
        hit
    }

    // == Variants ==
    pub fn set_variant(
        &self,
        image_id: &str,
        spec: &VariantSpec,
        data: impl Into<Bytes>,
        content_type: &str,
    ) {
        self.set(&spec.key_for(image_id), data, content_type);
    }

    pub fn get_variant(&self, image_id: &str, spec: &VariantSpec) -> Option<CachedImage> {
        self.lru.as_ref()?;
        let hit = self.get(&spec.key_for(image_id));
        record(&self.variants, hit.is_some());
        hit
    }

    // == Removal ==
    pub fn delete(&self, key: &str) -> bool {
        self.lru
            .as_ref()
            .is_some_and(|lru| lru.delete(&key.to_string()))
    }

    /// Removes every thumbnail and variant derived from `image_id`.
    ///
    /// Returns the number of entries removed.
    pub fn invalidate_image(&self, image_id: &str) -> usize {
        let Some(lru) = &self.lru else {
            return 0;
        };
        let thumb_prefix = format!("{image_id}_thumbnail_");
        let variant_prefix = format!("{image_id}_variant_");

        let removed =
            lru.remove_where(|k| k.starts_with(&thumb_prefix) || k.starts_with(&variant_prefix));
        if removed > 0 {
            info!(image_id, removed, "invalidated cached renditions");
        }
        removed
    }

    /// Drops all entries and resets every counter.
    pub fn clear(&self) {
        if let Some(lru) = &self.lru {
            lru.clear();
        }
        self.thumbnails.reset();
        self.variants.reset();
    }

    /// Sweeps expired entries; used by the background sweeper.
    pub fn purge_expired(&self) -> usize {
        self.lru.as_ref().map_or(0, LruCache::purge_expired)
    }

    // == Reporting ==
    pub fn stats(&self) -> ImageCacheStats {
        let Some(lru) = &self.lru else {
            return ImageCacheStats::default();
        };
        let core = lru.stats();
        let hits = self.thumbnails.hits() + self.variants.hits();
        let misses = self.thumbnails.misses() + self.variants.misses();

        ImageCacheStats {
            entries: core.entries,
            total_size: core.total_size,
            max_size_bytes: lru.max_size_bytes(),
            evictions: core.evictions,
            expirations: core.expirations,
            thumbnail_hits: self.thumbnails.hits(),
            thumbnail_misses: self.thumbnails.misses(),
            thumbnail_hit_rate: self.thumbnails.hit_rate(),
            variant_hits: self.variants.hits(),
            variant_misses: self.variants.misses(),
            variant_hit_rate: self.variants.hit_rate(),
            hit_rate: hit_rate_percent(hits, misses),
        }
    }

    /// Top `limit` keys by cumulative access count.
    pub fn popular_images(&self, limit: usize) -> Vec<PopularImage> {
        let Some(lru) = &self.lru else {
            return Vec::new();
        };
        let mut entries = lru.entries();
        entries.sort_by(|a, b| b.access_count.cmp(&a.access_count));
        entries
            .into_iter()
            .take(limit)
            .map(|e| PopularImage {
                key: e.key,
                access_count: e.access_count,
                size: e.size,
                created_at: e.created_at,
                last_accessed_at: e.last_accessed_at,
                expires_in_secs: e.ttl_remaining.as_secs(),
            })
            .collect()
    }
}

fn record(counter: &HitCounter, hit: bool) {
    if hit {
        counter.record_hit();
    } else {
        counter.record_miss();
    }
}
